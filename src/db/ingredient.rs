use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, AppResult, DBError},
    filters::IngredientFilter,
};

use super::{push_id_list, RecipeId};

pub type IngredientId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

/// An ingredient as it appears inside a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RecipeIngredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(FromRow)]
struct RecipeIngredientRow {
    recipe_id: RecipeId,
    #[sqlx(flatten)]
    ingredient: RecipeIngredient,
}

pub async fn list_ingredients(
    pool: &SqlitePool,
    filter: &IngredientFilter,
) -> AppResult<Vec<Ingredient>> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, name, measurement_unit FROM ingredients WHERE 1 = 1",
    );
    filter.apply(&mut query);
    query.push(" ORDER BY name, id");

    let ingredients = query
        .build_query_as::<Ingredient>()
        .fetch_all(pool)
        .await?;
    Ok(ingredients)
}

pub async fn get_ingredient(pool: &SqlitePool, id: IngredientId) -> AppResult<Ingredient> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    ingredient.ok_or(AppError::DBError(DBError::NotFound))
}

pub async fn create_ingredient(
    pool: &SqlitePool,
    name: &str,
    measurement_unit: &str,
) -> AppResult<Ingredient> {
    let id = sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
        .bind(name)
        .bind(measurement_unit)
        .execute(pool)
        .await?
        .last_insert_rowid();

    get_ingredient(pool, id).await
}

/// Returns the existing (name, unit) ingredient or inserts it; the flag is
/// `true` when a row was created.
pub async fn get_or_create_ingredient(
    pool: &SqlitePool,
    name: &str,
    measurement_unit: &str,
) -> AppResult<(Ingredient, bool)> {
    let existing = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients
        WHERE name = ? AND measurement_unit = ?
        ORDER BY id LIMIT 1",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await?;

    match existing {
        Some(ingredient) => Ok((ingredient, false)),
        None => Ok((create_ingredient(pool, name, measurement_unit).await?, true)),
    }
}

pub async fn update_ingredient(
    pool: &SqlitePool,
    id: IngredientId,
    name: &str,
    measurement_unit: &str,
) -> AppResult<Ingredient> {
    let updated = sqlx::query("UPDATE ingredients SET name = ?, measurement_unit = ? WHERE id = ?")
        .bind(name)
        .bind(measurement_unit)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(DBError::NotFound.into());
    }
    get_ingredient(pool, id).await
}

pub async fn delete_ingredient(pool: &SqlitePool, id: IngredientId) -> AppResult<()> {
    let deleted = sqlx::query("DELETE FROM ingredients WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    match deleted {
        0 => Err(DBError::NotFound.into()),
        _ => Ok(()),
    }
}

pub(crate) async fn ingredients_for_recipes(
    pool: &SqlitePool,
    recipe_ids: &[RecipeId],
) -> Result<HashMap<RecipeId, Vec<RecipeIngredient>>, sqlx::Error> {
    let mut by_recipe: HashMap<RecipeId, Vec<RecipeIngredient>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(by_recipe);
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "
        SELECT
            ingredient_recipe.recipe_id,
            ingredients.id,
            ingredients.name,
            ingredients.measurement_unit,
            ingredient_recipe.amount
        FROM ingredient_recipe
        INNER JOIN ingredients ON ingredients.id = ingredient_recipe.ingredient_id
        WHERE ingredient_recipe.recipe_id IN ",
    );
    push_id_list(&mut query, recipe_ids);
    query.push(" ORDER BY ingredient_recipe.id");

    let rows = query
        .build_query_as::<RecipeIngredientRow>()
        .fetch_all(pool)
        .await?;
    for row in rows {
        by_recipe
            .entry(row.recipe_id)
            .or_default()
            .push(row.ingredient);
    }

    Ok(by_recipe)
}

/// Makes the recipe's ingredient rows match `ingredients` exactly: rows for
/// ingredients not listed are deleted, listed ones are updated in place or
/// inserted.
pub(crate) async fn sync_recipe_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
    ingredients: &[(IngredientId, i64)],
) -> Result<(), sqlx::Error> {
    let ids: Vec<IngredientId> = ingredients.iter().map(|(id, _)| *id).collect();

    let mut stale = QueryBuilder::<Sqlite>::new("DELETE FROM ingredient_recipe WHERE recipe_id = ");
    stale.push_bind(recipe_id);
    if !ids.is_empty() {
        stale.push(" AND ingredient_id NOT IN ");
        push_id_list(&mut stale, &ids);
    }
    stale.build().execute(&mut *conn).await?;

    for (ingredient_id, amount) in ingredients {
        let updated = sqlx::query(
            "UPDATE ingredient_recipe SET amount = ? WHERE recipe_id = ? AND ingredient_id = ?",
        )
        .bind(amount)
        .bind(recipe_id)
        .bind(ingredient_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                "INSERT INTO ingredient_recipe (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)",
            )
            .bind(recipe_id)
            .bind(ingredient_id)
            .bind(amount)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}
