use sqlx::SqlitePool;

use crate::{
    error::{on_unique_violation, AppResult, DBError},
    pagination::PageParams,
};

use super::{get_user_profile, UserId, UserProfile};

/// Subscribes `user_id` to `following_id`. The existence check only makes
/// the common error friendlier; the unique constraint settles races.
pub async fn follow(pool: &SqlitePool, user_id: UserId, following_id: UserId) -> AppResult<UserProfile> {
    if user_id == following_id {
        return Err(DBError::SelfSubscription.into());
    }

    let author = get_user_profile(pool, following_id, Some(user_id)).await?;
    if author.is_subscribed {
        return Err(DBError::AlreadySubscribed.into());
    }

    sqlx::query("INSERT INTO follows (user_id, following_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(following_id)
        .execute(pool)
        .await
        .map_err(|err| on_unique_violation(err, DBError::AlreadySubscribed))?;

    tracing::debug!(user_id, following_id, "subscribed");
    Ok(UserProfile {
        is_subscribed: true,
        ..author
    })
}

pub async fn unfollow(pool: &SqlitePool, user_id: UserId, following_id: UserId) -> AppResult<()> {
    get_user_profile(pool, following_id, Some(user_id)).await?;

    let deleted = sqlx::query("DELETE FROM follows WHERE user_id = ? AND following_id = ?")
        .bind(user_id)
        .bind(following_id)
        .execute(pool)
        .await?
        .rows_affected();

    match deleted {
        0 => Err(DBError::NotSubscribed.into()),
        _ => Ok(()),
    }
}

/// Authors `user_id` follows, most recent subscription first.
pub async fn list_subscriptions(
    pool: &SqlitePool,
    user_id: UserId,
    page: PageParams,
) -> AppResult<(i64, Vec<UserProfile>)> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let authors = sqlx::query_as::<_, UserProfile>(
        "
        SELECT
            users.email,
            users.id,
            users.username,
            users.first_name,
            users.last_name,
            TRUE AS is_subscribed
        FROM follows
        INNER JOIN users ON users.id = follows.following_id
        WHERE follows.user_id = ?
        ORDER BY follows.id DESC
        LIMIT ? OFFSET ?
        ",
    )
    .bind(user_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((count, authors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{connect_in_memory, create_user, NewUser},
        error::AppError,
    };

    async fn user(pool: &SqlitePool, name: &str) -> UserId {
        create_user(
            pool,
            &NewUser {
                email: format!("{name}@example.com"),
                username: name.into(),
                first_name: name.into(),
                last_name: name.into(),
                hash: "hash".into(),
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn follow_toggle_rules() {
        let pool = connect_in_memory().await.unwrap();
        let anna = user(&pool, "anna").await;
        let boris = user(&pool, "boris").await;

        let err = follow(&pool, anna, anna).await.unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::SelfSubscription)));

        let profile = follow(&pool, anna, boris).await.unwrap();
        assert!(profile.is_subscribed);
        let seen = get_user_profile(&pool, boris, Some(anna)).await.unwrap();
        assert!(seen.is_subscribed);

        let err = follow(&pool, anna, boris).await.unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::AlreadySubscribed)));

        unfollow(&pool, anna, boris).await.unwrap();
        let err = unfollow(&pool, anna, boris).await.unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::NotSubscribed)));
    }

    #[tokio::test]
    async fn storage_rejects_duplicate_edges() {
        let pool = connect_in_memory().await.unwrap();
        let anna = user(&pool, "anna").await;
        let boris = user(&pool, "boris").await;

        let insert = "INSERT INTO follows (user_id, following_id) VALUES (?, ?)";
        sqlx::query(insert).bind(anna).bind(boris).execute(&pool).await.unwrap();
        assert!(sqlx::query(insert).bind(anna).bind(boris).execute(&pool).await.is_err());
        assert!(sqlx::query(insert).bind(anna).bind(anna).execute(&pool).await.is_err());
    }

    #[tokio::test]
    async fn lists_followed_authors() {
        let pool = connect_in_memory().await.unwrap();
        let anna = user(&pool, "anna").await;
        let boris = user(&pool, "boris").await;
        let clara = user(&pool, "clara").await;
        follow(&pool, anna, boris).await.unwrap();
        follow(&pool, anna, clara).await.unwrap();

        let (count, authors) = list_subscriptions(&pool, anna, PageParams::default())
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(authors[0].id, clara);
        assert!(authors.iter().all(|author| author.is_subscribed));
    }
}
