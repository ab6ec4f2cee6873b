mod user;
pub use user::*;
mod tag;
pub use tag::*;
mod ingredient;
pub use ingredient::*;
mod recipe;
pub use recipe::*;
mod follow;
pub use follow::*;
mod recipe_list;
pub use recipe_list::*;

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, QueryBuilder, Sqlite, SqlitePool,
};

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new().connect_with(options).await
}

/// A single-connection in-memory database with the schema applied.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    prepare_db(&pool).await?;
    Ok(pool)
}

pub async fn prepare_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(include_str!("sql/schema.sql")).await?;
    Ok(())
}

/// Returns the ids from `ids` that have no row in `table`.
pub(crate) async fn missing_ids(
    pool: &SqlitePool,
    table: &'static str,
    ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {table} WHERE id IN "));
    push_id_list(&mut query, ids);

    let found = query.build_query_scalar::<i64>().fetch_all(pool).await?;
    Ok(ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect())
}

/// Appends `(?, ?, ...)` for an `IN` clause.
pub(crate) fn push_id_list(query: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    query.push("(");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}
