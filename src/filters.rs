//! Query-string filters for ingredient and recipe listings. Each filter
//! appends ` AND ...` predicates to a query that already has a `WHERE`.

use serde::{de, Deserialize, Deserializer};
use sqlx::{QueryBuilder, Sqlite};

use crate::db::UserId;

#[derive(Debug, Default, Deserialize)]
pub struct IngredientFilter {
    pub name: Option<String>,
}

impl IngredientFilter {
    pub fn apply(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            query
                .push(" AND substr(name, 1, length(")
                .push_bind(name.to_string())
                .push(")) = ")
                .push_bind(name.to_string());
        }
    }
}

/// Filters over `recipes AS r`.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_favorited: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    pub fn apply(&self, query: &mut QueryBuilder<'_, Sqlite>, viewer: Option<UserId>) {
        if let Some(author) = self.author {
            query.push(" AND r.author_id = ").push_bind(author);
        }

        if !self.tags.is_empty() {
            query.push(
                " AND EXISTS (
                    SELECT 1 FROM tag_recipe
                    INNER JOIN tags ON tags.id = tag_recipe.tag_id
                    WHERE tag_recipe.recipe_id = r.id AND tags.slug IN (",
            );
            let mut slugs = query.separated(", ");
            for slug in &self.tags {
                slugs.push_bind(slug.clone());
            }
            slugs.push_unseparated("))");
        }

        if self.is_favorited == Some(true) {
            push_edge_filter(query, "favorites", viewer);
        }
        if self.is_in_shopping_cart == Some(true) {
            push_edge_filter(query, "shopping_cart", viewer);
        }
    }
}

fn push_edge_filter(query: &mut QueryBuilder<'_, Sqlite>, table: &'static str, viewer: Option<UserId>) {
    match viewer {
        Some(user_id) => {
            query
                .push(format!(
                    " AND EXISTS (SELECT 1 FROM {table} WHERE {table}.recipe_id = r.id AND {table}.user_id = "
                ))
                .push_bind(user_id)
                .push(")");
        }
        // Anonymous viewers have no edges.
        None => {
            query.push(" AND 0 = 1");
        }
    }
}

fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("") => Ok(None),
        Some("1" | "true") => Ok(Some(true)),
        Some("0" | "false") => Ok(Some(false)),
        Some(other) => Err(de::Error::custom(format!(
            "expected one of 1, 0, true, false; got `{other}`"
        ))),
    }
}
