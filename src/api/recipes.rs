use std::{collections::HashSet, path::Path as FsPath};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Query as MultiQuery;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::{Validate, ValidationError};

use crate::{
    api::JsonBody,
    db::{self, IngredientId, RecipeData, RecipeId, RecipeList, TagId},
    error::{AppError, AppResult},
    filters::RecipeFilter,
    pagination::{PageParams, Paginated},
    shopping_list,
    utils::{
        auth::{AuthUser, MaybeUser},
        image, permissions,
    },
    MediaRoot,
};

/// Upper bound shared by ingredient amounts and cooking time.
const MAX_QUANTITY: i64 = i32::MAX as i64;

#[derive(Debug, Deserialize, Serialize)]
pub struct IngredientAmount {
    id: IngredientId,
    amount: i64,
}

/// Write projection: tags and ingredients are flat id references.
#[derive(Debug, Deserialize, Validate)]
pub struct RecipeWrite {
    #[validate(
        length(min = 1, message = "at least one ingredient is required"),
        custom = "validate_ingredients"
    )]
    ingredients: Vec<IngredientAmount>,

    #[validate(
        length(min = 1, message = "at least one tag is required"),
        custom = "validate_tags"
    )]
    tags: Vec<TagId>,

    #[serde(default)]
    image: Option<String>,

    #[validate(length(min = 1, max = 200, message = "name must be 1 to 200 characters"))]
    name: String,

    #[validate(length(min = 1, message = "text can't be blank"))]
    text: String,

    #[validate(range(
        min = 1,
        max = 2147483647,
        message = "cooking time must be between 1 and 2147483647 minutes"
    ))]
    cooking_time: i64,
}

fn validation_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if !(1..=MAX_QUANTITY).contains(&ingredient.amount) {
            return Err(validation_error(
                "amount",
                format!(
                    "amount of ingredient {} must be between 1 and {MAX_QUANTITY}",
                    ingredient.id
                ),
            ));
        }
        if !seen.insert(ingredient.id) {
            return Err(validation_error(
                "duplicate",
                format!("ingredient {} is listed more than once", ingredient.id),
            ));
        }
    }
    Ok(())
}

fn validate_tags(tags: &[TagId]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    match tags.iter().find(|tag| !seen.insert(**tag)) {
        Some(tag) => Err(validation_error(
            "duplicate",
            format!("tag {tag} is listed more than once"),
        )),
        None => Ok(()),
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates the payload, checks every reference and stores the image.
/// Nothing is written before all checks pass.
async fn prepare(pool: &SqlitePool, media_root: &FsPath, recipe: RecipeWrite) -> AppResult<RecipeData> {
    recipe.validate()?;

    let decoded = match recipe.image.as_deref().filter(|data| !data.is_empty()) {
        Some(data) => Some(image::decode_data_uri(data)?),
        None => None,
    };

    let missing = db::missing_ids(pool, "tags", &recipe.tags).await?;
    if !missing.is_empty() {
        return Err(AppError::bad_request(format!(
            "unknown tag id(s): {}",
            join_ids(&missing)
        )));
    }

    let ingredient_ids: Vec<IngredientId> = recipe.ingredients.iter().map(|i| i.id).collect();
    let missing = db::missing_ids(pool, "ingredients", &ingredient_ids).await?;
    if !missing.is_empty() {
        return Err(AppError::bad_request(format!(
            "unknown ingredient id(s): {}",
            join_ids(&missing)
        )));
    }

    let image = match decoded {
        Some(decoded) => Some(image::store(media_root, decoded).await?),
        None => None,
    };

    Ok(RecipeData {
        name: recipe.name,
        text: recipe.text,
        image,
        cooking_time: recipe.cooking_time,
        tags: recipe.tags,
        ingredients: recipe
            .ingredients
            .into_iter()
            .map(|ingredient| (ingredient.id, ingredient.amount))
            .collect(),
    })
}

// GET /api/recipes
pub async fn get_recipes(
    State(pool): State<SqlitePool>,
    viewer: MaybeUser,
    Query(page): Query<PageParams>,
    MultiQuery(filter): MultiQuery<RecipeFilter>,
) -> AppResult<impl IntoResponse> {
    let (count, results) = db::list_recipes(&pool, &filter, viewer.id(), page).await?;
    Ok(Json(Paginated { count, results }))
}

// GET /api/recipes/:id
pub async fn get_recipe(
    State(pool): State<SqlitePool>,
    viewer: MaybeUser,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    let recipe = db::retrieve_recipe(&pool, recipe_id, viewer.id()).await?;
    Ok(Json(recipe))
}

// POST /api/recipes
pub async fn create_recipe(
    State(pool): State<SqlitePool>,
    State(MediaRoot(media_root)): State<MediaRoot>,
    AuthUser(user): AuthUser,
    JsonBody(recipe): JsonBody<RecipeWrite>,
) -> AppResult<impl IntoResponse> {
    let data = prepare(&pool, &media_root, recipe).await?;

    let recipe_id = match db::create_recipe(&pool, user.id, &data).await {
        Ok(recipe_id) => recipe_id,
        Err(err) => {
            if let Some(path) = &data.image {
                image::remove(&media_root, path).await;
            }
            return Err(err);
        }
    };

    let recipe = db::retrieve_recipe(&pool, recipe_id, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

// PUT/PATCH /api/recipes/:id
pub async fn update_recipe(
    State(pool): State<SqlitePool>,
    State(MediaRoot(media_root)): State<MediaRoot>,
    AuthUser(user): AuthUser,
    Path(recipe_id): Path<RecipeId>,
    JsonBody(recipe): JsonBody<RecipeWrite>,
) -> AppResult<impl IntoResponse> {
    let existing = db::get_recipe_short(&pool, recipe_id).await?;
    permissions::owner_or_admin(&user, existing.author_id)?;

    let data = prepare(&pool, &media_root, recipe).await?;

    match db::update_recipe(&pool, recipe_id, &data).await {
        Ok(Some(replaced)) => image::remove(&media_root, &replaced).await,
        Ok(None) => {}
        Err(err) => {
            if let Some(path) = &data.image {
                image::remove(&media_root, path).await;
            }
            return Err(err);
        }
    }

    let recipe = db::retrieve_recipe(&pool, recipe_id, Some(user.id)).await?;
    Ok(Json(recipe))
}

// DELETE /api/recipes/:id
pub async fn delete_recipe(
    State(pool): State<SqlitePool>,
    State(MediaRoot(media_root)): State<MediaRoot>,
    AuthUser(user): AuthUser,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    let existing = db::get_recipe_short(&pool, recipe_id).await?;
    permissions::owner_or_admin(&user, existing.author_id)?;

    if let Some(path) = db::delete_recipe(&pool, recipe_id).await? {
        image::remove(&media_root, &path).await;
    }

    tracing::info!(recipe_id, user_id = user.id, "deleted recipe");
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/recipes/:id/favorite
pub async fn favorite_recipe(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    let recipe = db::add_to_list(&pool, RecipeList::Favorites, user.id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

// DELETE /api/recipes/:id/favorite
pub async fn unfavorite_recipe(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    db::remove_from_list(&pool, RecipeList::Favorites, user.id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/recipes/:id/shopping_cart
pub async fn add_to_cart(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    let recipe = db::add_to_list(&pool, RecipeList::ShoppingCart, user.id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

// DELETE /api/recipes/:id/shopping_cart
pub async fn remove_from_cart(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    db::remove_from_list(&pool, RecipeList::ShoppingCart, user.id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/recipes/download_shopping_cart
pub async fn download_shopping_cart(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
) -> AppResult<impl IntoResponse> {
    let lines = db::cart_lines(&pool, user.id).await?;
    let document = shopping_list::render(lines);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", shopping_list::FILENAME),
            ),
        ],
        document,
    ))
}
