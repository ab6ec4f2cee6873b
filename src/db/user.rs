use jsonwebtoken::DecodingKey;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::{
    error::{on_unique_violation, AppError, AppResult, DBError},
    pagination::PageParams,
    utils::jwt,
};

pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// The authenticated user, including the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserAuth {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub hash: String,
    pub role: Role,
}

impl UserAuth {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_subscribed: false,
        }
    }
}

/// Public user representation, `is_subscribed` is relative to the viewer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub hash: String,
}

const PROFILE_COLUMNS: &str = "
    users.email,
    users.id,
    users.username,
    users.first_name,
    users.last_name,
    EXISTS (
        SELECT 1
        FROM follows
        WHERE follows.user_id = ?
            AND follows.following_id = users.id
    ) AS is_subscribed";

pub async fn auth_user(pool: &SqlitePool, token: &str, key: &DecodingKey) -> AppResult<UserAuth> {
    let user_id = jwt::verify_token(token, key)?;

    match get_user(pool, user_id).await {
        Err(AppError::DBError(DBError::NotFound)) => Err(AppError::Unauthorized),
        other => other,
    }
}

pub async fn get_user(pool: &SqlitePool, user_id: UserId) -> AppResult<UserAuth> {
    let user = sqlx::query_as::<_, UserAuth>(
        "SELECT id, email, username, first_name, last_name, hash, role FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    user.ok_or(AppError::DBError(DBError::NotFound))
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<UserAuth>> {
    let user = sqlx::query_as::<_, UserAuth>(
        "SELECT id, email, username, first_name, last_name, hash, role FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> AppResult<UserAuth> {
    let id = sqlx::query(
        "
        INSERT INTO users (email, username, first_name, last_name, hash)
        VALUES (?, ?, ?, ?, ?)
        ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.hash)
    .execute(pool)
    .await
    .map_err(|err| on_unique_violation(err, DBError::AlreadyRegistered))?
    .last_insert_rowid();

    tracing::info!(user_id = id, username = %user.username, "registered user");
    get_user(pool, id).await
}

pub async fn get_user_profile(
    pool: &SqlitePool,
    user_id: UserId,
    viewer: Option<UserId>,
) -> AppResult<UserProfile> {
    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users WHERE users.id = ?"
    ))
    .bind(viewer)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    profile.ok_or(AppError::DBError(DBError::NotFound))
}

pub async fn list_user_profiles(
    pool: &SqlitePool,
    viewer: Option<UserId>,
    page: PageParams,
) -> AppResult<(i64, Vec<UserProfile>)> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let profiles = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users ORDER BY users.id LIMIT ? OFFSET ?"
    ))
    .bind(viewer)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((count, profiles))
}

pub async fn set_password_hash(pool: &SqlitePool, user_id: UserId, hash: &str) -> AppResult<()> {
    sqlx::query("UPDATE users SET hash = ? WHERE id = ?")
        .bind(hash)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_role_by_email(pool: &SqlitePool, email: &str, role: Role) -> AppResult<()> {
    let updated = sqlx::query("UPDATE users SET role = ? WHERE email = ?")
        .bind(role)
        .bind(email)
        .execute(pool)
        .await?
        .rows_affected();

    match updated {
        0 => Err(DBError::NotFound.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            first_name: "Test".into(),
            last_name: "User".into(),
            hash: "not-a-real-hash".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let pool = connect_in_memory().await.unwrap();
        create_user(&pool, &new_user("anna")).await.unwrap();

        let err = create_user(&pool, &new_user("anna")).await.unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::AlreadyRegistered)));
    }

    #[tokio::test]
    async fn promotes_user_to_admin() {
        let pool = connect_in_memory().await.unwrap();
        let user = create_user(&pool, &new_user("anna")).await.unwrap();
        assert!(!user.is_admin());

        set_role_by_email(&pool, "anna@example.com", Role::Admin)
            .await
            .unwrap();
        assert!(get_user(&pool, user.id).await.unwrap().is_admin());

        let err = set_role_by_email(&pool, "nobody@example.com", Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::NotFound)));
    }
}
