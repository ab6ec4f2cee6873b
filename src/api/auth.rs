use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    api::JsonBody,
    db::find_user_by_email,
    error::{AppError, AppResult},
    utils::{auth::AuthUser, hasher, jwt},
};

#[derive(Debug, Deserialize, Validate)]
pub struct Login {
    #[validate(
        email(message = "invalid email address"),
        length(min = 1, message = "email can't be blank")
    )]
    email: String,
    #[validate(length(min = 1, message = "password can't be blank"))]
    password: String,
}

// POST /api/auth/token/login
pub async fn login(
    State(pool): State<SqlitePool>,
    State(key): State<EncodingKey>,
    JsonBody(login): JsonBody<Login>,
) -> AppResult<impl IntoResponse> {
    login.validate()?;

    let Some(user) = find_user_by_email(&pool, &login.email).await? else {
        return Err(AppError::bad_request(
            "Unable to log in with provided credentials",
        ));
    };

    if !hasher::verify_password(&user.hash, &login.password)? {
        tracing::info!(user_id = user.id, "rejected login");
        return Err(AppError::bad_request(
            "Unable to log in with provided credentials",
        ));
    }

    let token = jwt::generate_jwt(user.id, &key)?;
    Ok(Json(json!({ "auth_token": token })))
}

// POST /api/auth/token/logout
pub async fn logout(AuthUser(_user): AuthUser) -> StatusCode {
    StatusCode::NO_CONTENT
}
