use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, AppResult, DBError},
    filters::RecipeFilter,
    pagination::PageParams,
    utils::image,
};

use super::{
    ingredients_for_recipes, push_id_list, set_recipe_tags, sync_recipe_ingredients,
    tags_for_recipes, IngredientId, RecipeIngredient, Tag, TagId, UserId, UserProfile,
};

pub type RecipeId = i64;

/// Read projection of a recipe.
#[derive(Debug, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i64,
}

/// Compact form used by favorites, cart and subscription listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeShort {
    pub id: RecipeId,
    pub name: String,
    #[serde(serialize_with = "serialize_image")]
    pub image: Option<String>,
    pub cooking_time: i64,
    #[serde(skip)]
    pub author_id: UserId,
}

fn serialize_image<S: serde::Serializer>(
    value: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(path) => serializer.serialize_str(&image::url(path)),
        None => serializer.serialize_none(),
    }
}

/// Validated write payload. `image` is a path relative to the media root.
#[derive(Debug, Clone)]
pub struct RecipeData {
    pub name: String,
    pub text: String,
    pub image: Option<String>,
    pub cooking_time: i64,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<(IngredientId, i64)>,
}

#[derive(FromRow)]
struct RecipeRow {
    id: RecipeId,
    name: String,
    text: String,
    image: Option<String>,
    cooking_time: i64,
    author_id: UserId,
    author_email: String,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    author_is_subscribed: bool,
    is_favorited: bool,
    is_in_shopping_cart: bool,
}

fn select_recipes(viewer: Option<UserId>) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(
        "
        SELECT
            r.id,
            r.name,
            r.text,
            r.image,
            r.cooking_time,
            users.id AS author_id,
            users.email AS author_email,
            users.username AS author_username,
            users.first_name AS author_first_name,
            users.last_name AS author_last_name,
            EXISTS (
                SELECT 1 FROM follows
                WHERE follows.following_id = users.id AND follows.user_id = ",
    );
    query.push_bind(viewer).push(
        "
            ) AS author_is_subscribed,
            EXISTS (
                SELECT 1 FROM favorites
                WHERE favorites.recipe_id = r.id AND favorites.user_id = ",
    );
    query.push_bind(viewer).push(
        "
            ) AS is_favorited,
            EXISTS (
                SELECT 1 FROM shopping_cart
                WHERE shopping_cart.recipe_id = r.id AND shopping_cart.user_id = ",
    );
    query.push_bind(viewer).push(
        "
            ) AS is_in_shopping_cart
        FROM recipes r
        INNER JOIN users ON users.id = r.author_id
        WHERE 1 = 1",
    );
    query
}

/// Attaches tags and ingredients with one batched query each.
async fn assemble(pool: &SqlitePool, rows: Vec<RecipeRow>) -> AppResult<Vec<Recipe>> {
    let ids: Vec<RecipeId> = rows.iter().map(|row| row.id).collect();
    let mut tags = tags_for_recipes(pool, &ids).await?;
    let mut ingredients = ingredients_for_recipes(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| Recipe {
            id: row.id,
            tags: tags.remove(&row.id).unwrap_or_default(),
            author: UserProfile {
                email: row.author_email,
                id: row.author_id,
                username: row.author_username,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
                is_subscribed: row.author_is_subscribed,
            },
            ingredients: ingredients.remove(&row.id).unwrap_or_default(),
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
            name: row.name,
            image: row.image.as_deref().map(image::url),
            text: row.text,
            cooking_time: row.cooking_time,
        })
        .collect())
}

pub async fn retrieve_recipe(
    pool: &SqlitePool,
    recipe_id: RecipeId,
    viewer: Option<UserId>,
) -> AppResult<Recipe> {
    let mut query = select_recipes(viewer);
    query.push(" AND r.id = ").push_bind(recipe_id);

    let row = query
        .build_query_as::<RecipeRow>()
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::DBError(DBError::NotFound))?;

    let mut recipes = assemble(pool, vec![row]).await?;
    recipes.pop().ok_or(AppError::DBError(DBError::NotFound))
}

pub async fn list_recipes(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    viewer: Option<UserId>,
    page: PageParams,
) -> AppResult<(i64, Vec<Recipe>)> {
    let mut count_query =
        QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r WHERE 1 = 1");
    filter.apply(&mut count_query, viewer);
    let count: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut query = select_recipes(viewer);
    filter.apply(&mut query, viewer);
    query
        .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = query.build_query_as::<RecipeRow>().fetch_all(pool).await?;
    Ok((count, assemble(pool, rows).await?))
}

pub async fn get_recipe_short(pool: &SqlitePool, recipe_id: RecipeId) -> AppResult<RecipeShort> {
    let recipe = sqlx::query_as::<_, RecipeShort>(
        "SELECT id, name, image, cooking_time, author_id FROM recipes WHERE id = ?",
    )
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;

    recipe.ok_or(AppError::DBError(DBError::NotFound))
}

/// Newest recipes of each author, at most `limit` per author when given.
pub async fn recipes_by_authors(
    pool: &SqlitePool,
    author_ids: &[UserId],
    limit: Option<usize>,
) -> AppResult<HashMap<UserId, Vec<RecipeShort>>> {
    let mut by_author: HashMap<UserId, Vec<RecipeShort>> = HashMap::new();
    if author_ids.is_empty() {
        return Ok(by_author);
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, name, image, cooking_time, author_id FROM recipes WHERE author_id IN ",
    );
    push_id_list(&mut query, author_ids);
    query.push(" ORDER BY created_at DESC, id DESC");

    let rows = query
        .build_query_as::<RecipeShort>()
        .fetch_all(pool)
        .await?;
    for row in rows {
        let recipes = by_author.entry(row.author_id).or_default();
        if limit.map_or(true, |limit| recipes.len() < limit) {
            recipes.push(row);
        }
    }

    Ok(by_author)
}

pub async fn count_recipes_by_authors(
    pool: &SqlitePool,
    author_ids: &[UserId],
) -> AppResult<HashMap<UserId, i64>> {
    if author_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT author_id, COUNT(*) FROM recipes WHERE author_id IN ");
    push_id_list(&mut query, author_ids);
    query.push(" GROUP BY author_id");

    let rows: Vec<(UserId, i64)> = query.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

/// Inserts the recipe with its tag and ingredient rows in one transaction.
pub async fn create_recipe(
    pool: &SqlitePool,
    author_id: UserId,
    data: &RecipeData,
) -> AppResult<RecipeId> {
    let mut tx = pool.begin().await?;

    let recipe_id = sqlx::query(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES (?, ?, ?, ?, ?)
        ",
    )
    .bind(author_id)
    .bind(&data.name)
    .bind(&data.text)
    .bind(&data.image)
    .bind(data.cooking_time)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    set_recipe_tags(&mut tx, recipe_id, &data.tags).await?;
    sync_recipe_ingredients(&mut tx, recipe_id, &data.ingredients).await?;

    tx.commit().await?;

    tracing::info!(recipe_id, author_id, "created recipe");
    Ok(recipe_id)
}

/// Rewrites the recipe and its join rows in one transaction. The image is
/// kept when `data.image` is `None`; otherwise the replaced image path is
/// returned so the caller can remove the file.
pub async fn update_recipe(
    pool: &SqlitePool,
    recipe_id: RecipeId,
    data: &RecipeData,
) -> AppResult<Option<String>> {
    let mut tx = pool.begin().await?;

    let previous_image: Option<Option<String>> =
        sqlx::query_scalar("SELECT image FROM recipes WHERE id = ?")
            .bind(recipe_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(previous_image) = previous_image else {
        return Err(DBError::NotFound.into());
    };

    sqlx::query(
        "
        UPDATE recipes
        SET name = ?, text = ?, cooking_time = ?, image = COALESCE(?, image)
        WHERE id = ?
        ",
    )
    .bind(&data.name)
    .bind(&data.text)
    .bind(data.cooking_time)
    .bind(&data.image)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await?;

    set_recipe_tags(&mut tx, recipe_id, &data.tags).await?;
    sync_recipe_ingredients(&mut tx, recipe_id, &data.ingredients).await?;

    tx.commit().await?;

    tracing::info!(recipe_id, "updated recipe");
    Ok(previous_image.filter(|_| data.image.is_some()))
}

/// Deletes the recipe, returning its image path if it had one.
pub async fn delete_recipe(pool: &SqlitePool, recipe_id: RecipeId) -> AppResult<Option<String>> {
    let image: Option<Option<String>> =
        sqlx::query_scalar("DELETE FROM recipes WHERE id = ? RETURNING image")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

    image.ok_or(AppError::DBError(DBError::NotFound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        connect_in_memory, create_ingredient, create_tag, create_user, NewTag, NewUser,
    };

    struct Fixture {
        pool: SqlitePool,
        author: UserId,
        tags: Vec<TagId>,
        ingredients: Vec<IngredientId>,
    }

    async fn fixture() -> Fixture {
        let pool = connect_in_memory().await.unwrap();
        let author = create_user(
            &pool,
            &NewUser {
                email: "chef@example.com".into(),
                username: "chef".into(),
                first_name: "Chef".into(),
                last_name: "Cook".into(),
                hash: "hash".into(),
            },
        )
        .await
        .unwrap()
        .id;

        let mut tags = Vec::new();
        for (name, color) in [("lunch", "#000001"), ("dinner", "#000002")] {
            let tag = NewTag {
                name: name.into(),
                color: color.into(),
                slug: name.into(),
            };
            tags.push(create_tag(&pool, &tag).await.unwrap().id);
        }

        let mut ingredients = Vec::new();
        for name in ["Salt", "Pepper", "Rice"] {
            ingredients.push(create_ingredient(&pool, name, "g").await.unwrap().id);
        }

        Fixture {
            pool,
            author,
            tags,
            ingredients,
        }
    }

    fn data(tags: Vec<TagId>, ingredients: Vec<(IngredientId, i64)>) -> RecipeData {
        RecipeData {
            name: "Porridge".into(),
            text: "Boil it".into(),
            image: None,
            cooking_time: 10,
            tags,
            ingredients,
        }
    }

    #[tokio::test]
    async fn create_then_retrieve_projects_tags_and_ingredients() {
        let f = fixture().await;
        let id = create_recipe(
            &f.pool,
            f.author,
            &data(vec![f.tags[1]], vec![(f.ingredients[0], 5)]),
        )
        .await
        .unwrap();

        let recipe = retrieve_recipe(&f.pool, id, Some(f.author)).await.unwrap();
        assert_eq!(recipe.tags.len(), 1);
        assert_eq!(recipe.tags[0].slug, "dinner");
        assert_eq!(recipe.ingredients[0].name, "Salt");
        assert_eq!(recipe.ingredients[0].amount, 5);
        assert_eq!(recipe.author.username, "chef");
        assert!(!recipe.is_favorited);
    }

    #[tokio::test]
    async fn failed_create_leaves_no_rows() {
        let f = fixture().await;
        let err = create_recipe(
            &f.pool,
            f.author,
            &data(vec![f.tags[0]], vec![(9_999, 1)]),
        )
        .await;
        assert!(err.is_err());

        let recipes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
            .fetch_one(&f.pool)
            .await
            .unwrap();
        let tag_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tag_recipe")
            .fetch_one(&f.pool)
            .await
            .unwrap();
        assert_eq!((recipes, tag_rows), (0, 0));
    }

    #[tokio::test]
    async fn update_replaces_ingredient_set() {
        let f = fixture().await;
        let (salt, pepper, rice) = (f.ingredients[0], f.ingredients[1], f.ingredients[2]);
        let id = create_recipe(
            &f.pool,
            f.author,
            &data(f.tags.clone(), vec![(salt, 5), (pepper, 1)]),
        )
        .await
        .unwrap();

        update_recipe(
            &f.pool,
            id,
            &data(vec![f.tags[0]], vec![(pepper, 2), (rice, 100)]),
        )
        .await
        .unwrap();

        let recipe = retrieve_recipe(&f.pool, id, None).await.unwrap();
        let mut ingredients: Vec<(IngredientId, i64)> = recipe
            .ingredients
            .iter()
            .map(|ingredient| (ingredient.id, ingredient.amount))
            .collect();
        ingredients.sort();
        assert_eq!(ingredients, vec![(pepper, 2), (rice, 100)]);
        assert_eq!(recipe.tags.len(), 1);

        let rows: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ingredient_recipe WHERE recipe_id = ?")
                .bind(id)
                .fetch_one(&f.pool)
                .await
                .unwrap();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn update_of_missing_recipe_is_not_found() {
        let f = fixture().await;
        let err = update_recipe(&f.pool, 42, &data(vec![], vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::NotFound)));
    }

    #[tokio::test]
    async fn limits_recipes_per_author() {
        let f = fixture().await;
        for _ in 0..3 {
            create_recipe(&f.pool, f.author, &data(vec![], vec![]))
                .await
                .unwrap();
        }

        let recipes = recipes_by_authors(&f.pool, &[f.author], Some(2))
            .await
            .unwrap();
        assert_eq!(recipes[&f.author].len(), 2);

        let counts = count_recipes_by_authors(&f.pool, &[f.author]).await.unwrap();
        assert_eq!(counts[&f.author], 3);
    }
}
