use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::utils::image::ImageError;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum DBError {
    #[error("A user with that email or username already exists")]
    AlreadyRegistered,

    #[error("You are already subscribed to this author")]
    AlreadySubscribed,

    #[error("You can't subscribe to yourself")]
    SelfSubscription,

    #[error("Recipe is already in favorites")]
    AlreadyFavorited,

    #[error("Recipe is already in the shopping cart")]
    AlreadyInCart,

    #[error("A tag with that name, color or slug already exists")]
    TagTaken,

    #[error("You are not subscribed to this author")]
    NotSubscribed,

    #[error("Recipe is not in favorites")]
    NotFavorited,

    #[error("Recipe is not in the shopping cart")]
    NotInCart,

    #[error("Not Found")]
    NotFound,
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Any error: {0:?}")]
    Anyhow(#[from] anyhow::Error),

    #[error("{0}")]
    DBError(#[from] DBError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Image(#[from] ImageError),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Authentication credentials were not provided")]
    Unauthorized,

    #[error("SQL failed: {0:?}")]
    Sqlx(#[from] sqlx::Error),

    #[error("JWT error: {0:?}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{}", .0.body_text())]
    Json(#[from] JsonRejection),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::Image(_)
            | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::Sqlx(_) | AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DBError(db_error) => match db_error {
                DBError::NotFound
                | DBError::NotSubscribed
                | DBError::NotFavorited
                | DBError::NotInCart => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }
}

/// Maps a unique-constraint violation onto `conflict`, leaving every other
/// database error untouched.
pub fn on_unique_violation(err: sqlx::Error, conflict: DBError) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => conflict.into(),
        _ => err.into(),
    }
}

fn validation_body(errors: &ValidationErrors) -> Value {
    let mut body = Map::new();

    for (field, kind) in errors.errors() {
        let value = match kind {
            ValidationErrorsKind::Field(errors) => Value::Array(
                errors
                    .iter()
                    .map(|error| {
                        let message = error
                            .message
                            .as_ref()
                            .map(|message| message.to_string())
                            .unwrap_or_else(|| format!("invalid value ({})", error.code));
                        Value::String(message)
                    })
                    .collect(),
            ),
            ValidationErrorsKind::Struct(errors) => validation_body(errors),
            ValidationErrorsKind::List(items) => {
                let mut list = Map::new();
                for (index, errors) in items {
                    list.insert(index.to_string(), validation_body(errors));
                }
                Value::Object(list)
            }
        };
        body.insert(field.to_string(), value);
    }

    Value::Object(body)
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }

        let body = match &self {
            AppError::Validation(errors) => validation_body(errors),
            _ if status.is_server_error() => json!({
                "detail": status.canonical_reason().unwrap_or("Internal Server Error"),
            }),
            _ => json!({ "detail": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn absent_edges_are_not_found() {
        assert_eq!(
            AppError::from(DBError::NotFavorited).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(DBError::NotSubscribed).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn duplicate_edges_are_bad_requests() {
        assert_eq!(
            AppError::from(DBError::AlreadyInCart).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(DBError::SelfSubscription).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn validation_body_lists_messages_per_field() {
        let mut errors = ValidationErrors::new();
        let mut error = ValidationError::new("range");
        error.message = Some("cooking time must be at least 1 minute".into());
        errors.add("cooking_time", error);

        let body = validation_body(&errors);
        assert_eq!(
            body,
            json!({ "cooking_time": ["cooking time must be at least 1 minute"] })
        );
    }
}
