use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "foodgram-development-secret";

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub media_root: PathBuf,
    /// Requests per second accepted by the router; `0` disables limiting.
    pub rate_limit_per_sec: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            info!("No .env file loaded: {err}");
        }

        Ok(Self {
            addr: try_load("FOODGRAM_ADDR", "0.0.0.0:8000"),
            database_url: try_load("DATABASE_URL", "sqlite://foodgram.db"),
            jwt_secret: jwt_secret()?,
            media_root: try_load("MEDIA_ROOT", "media"),
            rate_limit_per_sec: try_load("RATE_LIMIT_PER_SEC", "50"),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value: {e}, using default: {default}");
        default
            .parse()
            .unwrap_or_else(|_| panic!("default for {key} must parse"))
    })
}

fn jwt_secret() -> anyhow::Result<String> {
    match var("JWT_SECRET") {
        Some(secret) => Ok(secret),
        None if cfg!(debug_assertions) => {
            warn!("JWT_SECRET not set, using the development secret");
            Ok(DEV_JWT_SECRET.to_string())
        }
        None => anyhow::bail!("JWT_SECRET must be set"),
    }
}
