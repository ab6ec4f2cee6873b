use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    BoxError, Json, Router,
};
use serde_json::json;
use std::time::Duration;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::{api, utils::image::MEDIA_URL, AppState};

/// Builds the application router. A `rate_limit_per_sec` of zero disables
/// request throttling.
pub fn generate_routes(state: AppState, rate_limit_per_sec: u64) -> Router {
    let media = ServeDir::new(state.media_root());

    let router = Router::new()
        // ==== AUTH ==== //
        .route("/api/auth/token/login", post(api::auth::login))
        .route("/api/auth/token/logout", post(api::auth::logout))
        // ==== USERS ==== //
        .route(
            "/api/users",
            get(api::user::list_users).post(api::user::registration),
        )
        .route("/api/users/me", get(api::user::get_current_user))
        .route("/api/users/set_password", post(api::user::set_password))
        .route(
            "/api/users/subscriptions",
            get(api::user::get_subscriptions),
        )
        .route("/api/users/:id", get(api::user::get_profile))
        .route(
            "/api/users/:id/subscribe",
            post(api::user::subscribe).delete(api::user::unsubscribe),
        )
        // ==== TAGS ==== //
        .route(
            "/api/tags",
            get(api::tags::get_tags).post(api::tags::create_tag),
        )
        .route(
            "/api/tags/:id",
            get(api::tags::get_tag)
                .put(api::tags::update_tag)
                .patch(api::tags::update_tag)
                .delete(api::tags::delete_tag),
        )
        // ==== INGREDIENTS ==== //
        .route(
            "/api/ingredients",
            get(api::ingredients::get_ingredients).post(api::ingredients::create_ingredient),
        )
        .route(
            "/api/ingredients/:id",
            get(api::ingredients::get_ingredient)
                .put(api::ingredients::update_ingredient)
                .patch(api::ingredients::update_ingredient)
                .delete(api::ingredients::delete_ingredient),
        )
        // ==== RECIPES ==== //
        .route(
            "/api/recipes",
            get(api::recipes::get_recipes).post(api::recipes::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart",
            get(api::recipes::download_shopping_cart),
        )
        .route(
            "/api/recipes/:id",
            get(api::recipes::get_recipe)
                .put(api::recipes::update_recipe)
                .patch(api::recipes::update_recipe)
                .delete(api::recipes::delete_recipe),
        )
        .route(
            "/api/recipes/:id/favorite",
            post(api::recipes::favorite_recipe).delete(api::recipes::unfavorite_recipe),
        )
        .route(
            "/api/recipes/:id/shopping_cart",
            post(api::recipes::add_to_cart).delete(api::recipes::remove_from_cart),
        )
        // ==== MEDIA ==== //
        .nest_service(MEDIA_URL, media)
        .fallback(handler_404)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    if rate_limit_per_sec == 0 {
        return router;
    }

    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(|err: BoxError| async move {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Unhandled error: {}", err),
                )
            }))
            .layer(BufferLayer::new(1024))
            .layer(RateLimitLayer::new(
                rate_limit_per_sec,
                Duration::from_secs(1),
            )),
    )
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Not Found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn unknown_path_is_404() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        let media = tempfile::tempdir().unwrap();
        let app = generate_routes(AppState::new(pool, "secret", media.path()), 0);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/nowhere")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rate_limited_router_still_serves() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        let media = tempfile::tempdir().unwrap();
        let app = generate_routes(AppState::new(pool, "secret", media.path()), 10);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tags")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
