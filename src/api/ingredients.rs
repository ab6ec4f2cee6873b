use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    api::JsonBody,
    db::{self, IngredientId},
    error::AppResult,
    filters::IngredientFilter,
    utils::auth::AdminUser,
};

#[derive(Debug, Deserialize, Validate)]
pub struct IngredientData {
    #[validate(length(min = 1, max = 200, message = "name must be 1 to 200 characters"))]
    name: String,
    #[validate(length(min = 1, max = 200, message = "unit must be 1 to 200 characters"))]
    measurement_unit: String,
}

// GET /api/ingredients?name=
pub async fn get_ingredients(
    State(pool): State<SqlitePool>,
    Query(filter): Query<IngredientFilter>,
) -> AppResult<impl IntoResponse> {
    let ingredients = db::list_ingredients(&pool, &filter).await?;
    Ok(Json(ingredients))
}

// GET /api/ingredients/:id
pub async fn get_ingredient(
    State(pool): State<SqlitePool>,
    Path(id): Path<IngredientId>,
) -> AppResult<impl IntoResponse> {
    let ingredient = db::get_ingredient(&pool, id).await?;
    Ok(Json(ingredient))
}

// POST /api/ingredients
pub async fn create_ingredient(
    State(pool): State<SqlitePool>,
    AdminUser(_admin): AdminUser,
    JsonBody(ingredient): JsonBody<IngredientData>,
) -> AppResult<impl IntoResponse> {
    ingredient.validate()?;

    let ingredient =
        db::create_ingredient(&pool, &ingredient.name, &ingredient.measurement_unit).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

// PUT/PATCH /api/ingredients/:id
pub async fn update_ingredient(
    State(pool): State<SqlitePool>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<IngredientId>,
    JsonBody(ingredient): JsonBody<IngredientData>,
) -> AppResult<impl IntoResponse> {
    ingredient.validate()?;

    let ingredient =
        db::update_ingredient(&pool, id, &ingredient.name, &ingredient.measurement_unit).await?;
    Ok(Json(ingredient))
}

// DELETE /api/ingredients/:id
pub async fn delete_ingredient(
    State(pool): State<SqlitePool>,
    AdminUser(admin): AdminUser,
    Path(id): Path<IngredientId>,
) -> AppResult<impl IntoResponse> {
    db::delete_ingredient(&pool, id).await?;
    tracing::info!(ingredient_id = id, admin_id = admin.id, "deleted ingredient");
    Ok(StatusCode::NO_CONTENT)
}
