use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::error::{on_unique_violation, AppError, AppResult, DBError};

use super::{push_id_list, RecipeId};

pub type TagId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(FromRow)]
struct RecipeTagRow {
    recipe_id: RecipeId,
    #[sqlx(flatten)]
    tag: Tag,
}

pub async fn list_tags(pool: &SqlitePool) -> AppResult<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(tags)
}

pub async fn get_tag(pool: &SqlitePool, tag_id: TagId) -> AppResult<Tag> {
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags WHERE id = ?")
        .bind(tag_id)
        .fetch_optional(pool)
        .await?;

    tag.ok_or(AppError::DBError(DBError::NotFound))
}

pub async fn create_tag(pool: &SqlitePool, tag: &NewTag) -> AppResult<Tag> {
    let id = sqlx::query("INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)")
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .execute(pool)
        .await
        .map_err(|err| on_unique_violation(err, DBError::TagTaken))?
        .last_insert_rowid();

    get_tag(pool, id).await
}

pub async fn update_tag(pool: &SqlitePool, tag_id: TagId, tag: &NewTag) -> AppResult<Tag> {
    let updated = sqlx::query("UPDATE tags SET name = ?, color = ?, slug = ? WHERE id = ?")
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .bind(tag_id)
        .execute(pool)
        .await
        .map_err(|err| on_unique_violation(err, DBError::TagTaken))?
        .rows_affected();

    if updated == 0 {
        return Err(DBError::NotFound.into());
    }
    get_tag(pool, tag_id).await
}

pub async fn delete_tag(pool: &SqlitePool, tag_id: TagId) -> AppResult<()> {
    let deleted = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(tag_id)
        .execute(pool)
        .await?
        .rows_affected();

    match deleted {
        0 => Err(DBError::NotFound.into()),
        _ => Ok(()),
    }
}

/// Tags of every recipe in `recipe_ids`, in the order they were attached.
pub(crate) async fn tags_for_recipes(
    pool: &SqlitePool,
    recipe_ids: &[RecipeId],
) -> Result<HashMap<RecipeId, Vec<Tag>>, sqlx::Error> {
    let mut by_recipe: HashMap<RecipeId, Vec<Tag>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(by_recipe);
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "
        SELECT tag_recipe.recipe_id, tags.id, tags.name, tags.color, tags.slug
        FROM tag_recipe
        INNER JOIN tags ON tags.id = tag_recipe.tag_id
        WHERE tag_recipe.recipe_id IN ",
    );
    push_id_list(&mut query, recipe_ids);
    query.push(" ORDER BY tag_recipe.id");

    let rows = query
        .build_query_as::<RecipeTagRow>()
        .fetch_all(pool)
        .await?;
    for row in rows {
        by_recipe.entry(row.recipe_id).or_default().push(row.tag);
    }

    Ok(by_recipe)
}

/// Replaces the recipe's tag set wholesale.
pub(crate) async fn set_recipe_tags(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
    tags: &[TagId],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM tag_recipe WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if tags.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO tag_recipe (recipe_id, tag_id) ");
    query.push_values(tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    query.build().execute(&mut *conn).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn breakfast() -> NewTag {
        NewTag {
            name: "Breakfast".into(),
            color: "#E26C2D".into(),
            slug: "breakfast".into(),
        }
    }

    #[tokio::test]
    async fn tag_fields_are_unique() {
        let pool = connect_in_memory().await.unwrap();
        create_tag(&pool, &breakfast()).await.unwrap();

        let mut same_slug = breakfast();
        same_slug.name = "Morning".into();
        same_slug.color = "#000000".into();

        let err = create_tag(&pool, &same_slug).await.unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::TagTaken)));
    }

    #[tokio::test]
    async fn updates_and_deletes_tag() {
        let pool = connect_in_memory().await.unwrap();
        let tag = create_tag(&pool, &breakfast()).await.unwrap();

        let mut renamed = breakfast();
        renamed.name = "Brunch".into();
        let updated = update_tag(&pool, tag.id, &renamed).await.unwrap();
        assert_eq!(updated.name, "Brunch");

        delete_tag(&pool, tag.id).await.unwrap();
        assert!(matches!(
            get_tag(&pool, tag.id).await.unwrap_err(),
            AppError::DBError(DBError::NotFound)
        ));
    }
}
