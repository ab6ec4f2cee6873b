use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    api::JsonBody,
    db::{self, NewTag, TagId},
    error::AppResult,
    utils::{
        auth::AdminUser,
        validators::{validate_color, validate_slug},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct TagData {
    #[validate(length(min = 1, max = 200, message = "name must be 1 to 200 characters"))]
    name: String,
    #[validate(custom = "validate_color")]
    color: String,
    #[validate(
        length(min = 1, max = 200, message = "slug must be 1 to 200 characters"),
        custom = "validate_slug"
    )]
    slug: String,
}

impl From<TagData> for NewTag {
    fn from(tag: TagData) -> Self {
        NewTag {
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

// GET /api/tags
pub async fn get_tags(State(pool): State<SqlitePool>) -> AppResult<impl IntoResponse> {
    let tags = db::list_tags(&pool).await?;
    Ok(Json(tags))
}

// GET /api/tags/:id
pub async fn get_tag(
    State(pool): State<SqlitePool>,
    Path(tag_id): Path<TagId>,
) -> AppResult<impl IntoResponse> {
    let tag = db::get_tag(&pool, tag_id).await?;
    Ok(Json(tag))
}

// POST /api/tags
pub async fn create_tag(
    State(pool): State<SqlitePool>,
    AdminUser(_admin): AdminUser,
    JsonBody(tag): JsonBody<TagData>,
) -> AppResult<impl IntoResponse> {
    tag.validate()?;

    let tag = db::create_tag(&pool, &tag.into()).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

// PUT/PATCH /api/tags/:id
pub async fn update_tag(
    State(pool): State<SqlitePool>,
    AdminUser(_admin): AdminUser,
    Path(tag_id): Path<TagId>,
    JsonBody(tag): JsonBody<TagData>,
) -> AppResult<impl IntoResponse> {
    tag.validate()?;

    let tag = db::update_tag(&pool, tag_id, &tag.into()).await?;
    Ok(Json(tag))
}

// DELETE /api/tags/:id
pub async fn delete_tag(
    State(pool): State<SqlitePool>,
    AdminUser(admin): AdminUser,
    Path(tag_id): Path<TagId>,
) -> AppResult<impl IntoResponse> {
    db::delete_tag(&pool, tag_id).await?;
    tracing::info!(tag_id, admin_id = admin.id, "deleted tag");
    Ok(StatusCode::NO_CONTENT)
}
