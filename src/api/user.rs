use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    api::JsonBody,
    db::{
        count_recipes_by_authors, create_user, follow, get_user_profile, list_subscriptions,
        list_user_profiles, recipes_by_authors, set_password_hash, unfollow, NewUser, RecipeShort,
        UserId, UserProfile,
    },
    error::{AppError, AppResult},
    pagination::{PageParams, Paginated},
    utils::{
        auth::{AuthUser, MaybeUser},
        hasher,
        validators::validate_username,
    },
};

// ================================================= REGISTRATION ================================================= //

#[derive(Debug, Deserialize, Validate)]
pub struct Registration {
    #[validate(
        length(min = 1, message = "email can't be blank"),
        length(max = 254, message = "too long email address"),
        email(message = "invalid email address")
    )]
    email: String,

    #[validate(
        length(min = 1, message = "user name can't be blank"),
        length(max = 150, message = "too long user name"),
        custom = "validate_username"
    )]
    username: String,

    #[validate(length(min = 1, max = 150, message = "first name must be 1 to 150 characters"))]
    first_name: String,

    #[validate(length(min = 1, max = 150, message = "last name must be 1 to 150 characters"))]
    last_name: String,

    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters long"))]
    password: String,
}

// POST /api/users
pub async fn registration(
    State(pool): State<SqlitePool>,
    JsonBody(user): JsonBody<Registration>,
) -> AppResult<impl IntoResponse> {
    user.validate()?;

    let hash = hasher::hash_password(&user.password)?;
    let user = create_user(
        &pool,
        &NewUser {
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            hash,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.profile())))
}

// ================================================= PROFILES ================================================= //

// GET /api/users
pub async fn list_users(
    State(pool): State<SqlitePool>,
    viewer: MaybeUser,
    Query(page): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let (count, results) = list_user_profiles(&pool, viewer.id(), page).await?;
    Ok(Json(Paginated { count, results }))
}

// GET /api/users/:id
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    viewer: MaybeUser,
    Path(user_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    let profile = get_user_profile(&pool, user_id, viewer.id()).await?;
    Ok(Json(profile))
}

// GET /api/users/me
pub async fn get_current_user(AuthUser(user): AuthUser) -> AppResult<impl IntoResponse> {
    Ok(Json(user.profile()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetPassword {
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters long"))]
    new_password: String,
    current_password: String,
}

// POST /api/users/set_password
pub async fn set_password(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<SetPassword>,
) -> AppResult<impl IntoResponse> {
    request.validate()?;

    if !hasher::verify_password(&user.hash, &request.current_password)? {
        return Err(AppError::bad_request("current password is incorrect"));
    }

    let hash = hasher::hash_password(&request.new_password)?;
    set_password_hash(&pool, user.id, &hash).await?;

    tracing::info!(user_id = user.id, "changed password");
    Ok(StatusCode::NO_CONTENT)
}

// ================================================= SUBSCRIPTIONS ================================================= //

/// A followed author together with their newest recipes.
#[derive(Debug, Serialize)]
pub struct Subscription {
    #[serde(flatten)]
    profile: UserProfile,
    recipes: Vec<RecipeShort>,
    recipes_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimit {
    recipes_limit: Option<usize>,
}

async fn with_recipes(
    pool: &SqlitePool,
    authors: Vec<UserProfile>,
    limit: Option<usize>,
) -> AppResult<Vec<Subscription>> {
    let ids: Vec<UserId> = authors.iter().map(|author| author.id).collect();
    let mut recipes = recipes_by_authors(pool, &ids, limit).await?;
    let counts = count_recipes_by_authors(pool, &ids).await?;

    Ok(authors
        .into_iter()
        .map(|profile| Subscription {
            recipes: recipes.remove(&profile.id).unwrap_or_default(),
            recipes_count: counts.get(&profile.id).copied().unwrap_or(0),
            profile,
        })
        .collect())
}

// GET /api/users/subscriptions
pub async fn get_subscriptions(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageParams>,
    Query(RecipesLimit { recipes_limit }): Query<RecipesLimit>,
) -> AppResult<impl IntoResponse> {
    let (count, authors) = list_subscriptions(&pool, user.id, page).await?;
    let results = with_recipes(&pool, authors, recipes_limit).await?;
    Ok(Json(Paginated { count, results }))
}

// POST /api/users/:id/subscribe
pub async fn subscribe(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(author_id): Path<UserId>,
    Query(RecipesLimit { recipes_limit }): Query<RecipesLimit>,
) -> AppResult<impl IntoResponse> {
    let author = follow(&pool, user.id, author_id).await?;
    let subscription = with_recipes(&pool, vec![author], recipes_limit)
        .await?
        .pop()
        .ok_or_else(|| AppError::Anyhow(anyhow::anyhow!("subscription vanished")))?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

// DELETE /api/users/:id/subscribe
pub async fn unsubscribe(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(author_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    unfollow(&pool, user.id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
