use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use foodgram::{
    config::Config,
    db::{self, Role},
};

/// Maintenance commands run against the configured database.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load ingredients from `name,measurement_unit` CSV rows, or from a
    /// `.json` array of `{"name", "measurement_unit"}` objects. Existing
    /// (name, unit) pairs are skipped.
    ImportIngredients { path: PathBuf },
    /// Grant the admin role to the user with this email.
    Promote { email: String },
}

#[derive(Debug, Deserialize)]
struct IngredientRow {
    name: String,
    measurement_unit: String,
}

/// Parses ingredient rows, choosing the format from the file extension.
/// CSV files carry no header row.
fn parse_rows(path: &Path, raw: &str) -> anyhow::Result<Vec<IngredientRow>> {
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

    if is_json {
        return Ok(serde_json::from_str(raw)?);
    }

    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes())
        .deserialize()
        .collect::<Result<_, _>>()
        .map_err(Into::into)
}

async fn import_ingredients(pool: &SqlitePool, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let rows = parse_rows(path, &raw).with_context(|| format!("parsing {}", path.display()))?;

    let mut created = 0;
    for row in &rows {
        let (_, inserted) = db::get_or_create_ingredient(pool, &row.name, &row.measurement_unit)
            .await
            .with_context(|| format!("importing {} ({})", row.name, row.measurement_unit))?;
        if inserted {
            created += 1;
        }
    }

    info!(total = rows.len(), created, "imported ingredients");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load()?;

    let pool = db::connect(&config.database_url)
        .await
        .context("connecting to the database")?;
    db::prepare_db(&pool).await.context("preparing the schema")?;

    match args.command {
        Command::ImportIngredients { path } => import_ingredients(&pool, &path).await?,
        Command::Promote { email } => {
            db::set_role_by_email(&pool, &email, Role::Admin)
                .await
                .with_context(|| format!("promoting {email}"))?;
            info!(%email, "granted admin role");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headerless_csv_rows() {
        let rows = parse_rows(
            Path::new("data/ingredients.csv"),
            "абрикосовое варенье,г\nsalt, g\n\"flour, wheat\",kg\n",
        )
        .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "абрикосовое варенье");
        assert_eq!(rows[1].measurement_unit, "g");
        assert_eq!(rows[2].name, "flour, wheat");
    }

    #[test]
    fn reads_json_by_extension() {
        let rows = parse_rows(
            Path::new("ingredients.JSON"),
            r#"[{"name": "Salt", "measurement_unit": "g"}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].name, "Salt");
    }

    #[test]
    fn rejects_short_csv_rows() {
        assert!(parse_rows(Path::new("ingredients.csv"), "salt\n").is_err());
    }
}
