use sqlx::{FromRow, SqlitePool};

use crate::{
    error::{on_unique_violation, AppResult, DBError},
    shopping_list::CartLine,
};

use super::{get_recipe_short, RecipeId, RecipeShort, UserId};

/// Per-user recipe collections, each an edge table keyed by (user, recipe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn duplicate(self) -> DBError {
        match self {
            RecipeList::Favorites => DBError::AlreadyFavorited,
            RecipeList::ShoppingCart => DBError::AlreadyInCart,
        }
    }

    fn missing(self) -> DBError {
        match self {
            RecipeList::Favorites => DBError::NotFavorited,
            RecipeList::ShoppingCart => DBError::NotInCart,
        }
    }
}

pub async fn add_to_list(
    pool: &SqlitePool,
    list: RecipeList,
    user_id: UserId,
    recipe_id: RecipeId,
) -> AppResult<RecipeShort> {
    let recipe = get_recipe_short(pool, recipe_id).await?;
    let table = list.table();

    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE user_id = ? AND recipe_id = ?)"
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await?;
    if exists {
        return Err(list.duplicate().into());
    }

    sqlx::query(&format!(
        "INSERT INTO {table} (user_id, recipe_id) VALUES (?, ?)"
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(|err| on_unique_violation(err, list.duplicate()))?;

    tracing::debug!(user_id, recipe_id, table, "added recipe to list");
    Ok(recipe)
}

pub async fn remove_from_list(
    pool: &SqlitePool,
    list: RecipeList,
    user_id: UserId,
    recipe_id: RecipeId,
) -> AppResult<()> {
    get_recipe_short(pool, recipe_id).await?;
    let table = list.table();

    let deleted = sqlx::query(&format!(
        "DELETE FROM {table} WHERE user_id = ? AND recipe_id = ?"
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?
    .rows_affected();

    match deleted {
        0 => Err(list.missing().into()),
        _ => Ok(()),
    }
}

#[derive(FromRow)]
struct CartRow {
    name: String,
    measurement_unit: String,
    amount: i64,
}

/// Every ingredient row of every recipe in the user's cart, in row order.
pub async fn cart_lines(pool: &SqlitePool, user_id: UserId) -> AppResult<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartRow>(
        "
        SELECT ingredients.name, ingredients.measurement_unit, ingredient_recipe.amount
        FROM ingredient_recipe
        INNER JOIN ingredients ON ingredients.id = ingredient_recipe.ingredient_id
        INNER JOIN shopping_cart ON shopping_cart.recipe_id = ingredient_recipe.recipe_id
        WHERE shopping_cart.user_id = ?
        ORDER BY ingredient_recipe.id
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| CartLine {
            name: row.name,
            measurement_unit: row.measurement_unit,
            amount: row.amount,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{connect_in_memory, create_ingredient, create_recipe, create_user, NewUser, RecipeData},
        error::AppError,
    };

    async fn setup() -> (SqlitePool, UserId, RecipeId) {
        let pool = connect_in_memory().await.unwrap();
        let user = create_user(
            &pool,
            &NewUser {
                email: "anna@example.com".into(),
                username: "anna".into(),
                first_name: "Anna".into(),
                last_name: "K".into(),
                hash: "hash".into(),
            },
        )
        .await
        .unwrap()
        .id;
        let salt = create_ingredient(&pool, "Salt", "g").await.unwrap().id;
        let recipe = create_recipe(
            &pool,
            user,
            &RecipeData {
                name: "Soup".into(),
                text: "Cook".into(),
                image: None,
                cooking_time: 30,
                tags: vec![],
                ingredients: vec![(salt, 5)],
            },
        )
        .await
        .unwrap();
        (pool, user, recipe)
    }

    #[tokio::test]
    async fn favorite_toggle_rules() {
        let (pool, user, recipe) = setup().await;

        let short = add_to_list(&pool, RecipeList::Favorites, user, recipe)
            .await
            .unwrap();
        assert_eq!(short.name, "Soup");

        let err = add_to_list(&pool, RecipeList::Favorites, user, recipe)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::AlreadyFavorited)));

        remove_from_list(&pool, RecipeList::Favorites, user, recipe)
            .await
            .unwrap();
        let err = remove_from_list(&pool, RecipeList::Favorites, user, recipe)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::NotFavorited)));
    }

    #[tokio::test]
    async fn lists_are_independent() {
        let (pool, user, recipe) = setup().await;
        add_to_list(&pool, RecipeList::Favorites, user, recipe)
            .await
            .unwrap();

        let err = remove_from_list(&pool, RecipeList::ShoppingCart, user, recipe)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::NotInCart)));
    }

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let (pool, user, _) = setup().await;
        let err = add_to_list(&pool, RecipeList::ShoppingCart, user, 404)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::NotFound)));
    }

    #[tokio::test]
    async fn cart_lines_follow_cart_contents() {
        let (pool, user, recipe) = setup().await;
        assert!(cart_lines(&pool, user).await.unwrap().is_empty());

        add_to_list(&pool, RecipeList::ShoppingCart, user, recipe)
            .await
            .unwrap();
        let lines = cart_lines(&pool, user).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount, 5);
    }
}
