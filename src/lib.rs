//! Backend of a recipe-sharing service: recipes with tags and ingredients,
//! subscriptions between users, favorites and a shopping cart that exports
//! an aggregated shopping list.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod pagination;
pub mod routes;
pub mod shopping_list;
pub mod utils;

use std::{path::PathBuf, sync::Arc};

use axum::extract::FromRef;
use jsonwebtoken::{DecodingKey, EncodingKey};
use sqlx::SqlitePool;

/// Directory uploaded images are written to and served from.
#[derive(Debug, Clone)]
pub struct MediaRoot(pub Arc<PathBuf>);

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    media_root: MediaRoot,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt_secret: &str, media_root: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            media_root: MediaRoot(Arc::new(media_root.into())),
        }
    }

    pub fn media_root(&self) -> &std::path::Path {
        &self.media_root.0
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> SqlitePool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for EncodingKey {
    fn from_ref(app_state: &AppState) -> EncodingKey {
        app_state.encoding_key.clone()
    }
}

impl FromRef<AppState> for DecodingKey {
    fn from_ref(app_state: &AppState) -> DecodingKey {
        app_state.decoding_key.clone()
    }
}

impl FromRef<AppState> for MediaRoot {
    fn from_ref(app_state: &AppState) -> MediaRoot {
        app_state.media_root.clone()
    }
}
