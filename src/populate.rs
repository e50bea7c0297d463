use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::model::{
    Collection, CollectionSummary, EntityId, Ingredient, PopulatedCollection, PopulatedInstruction,
    PopulatedRecipe, Recipe,
};
use crate::store::EntityStore;

/// Expand a recipe's ingredients, instruction references and collections.
pub async fn populate_recipe(store: &dyn EntityStore, recipe: Recipe) -> Result<PopulatedRecipe> {
    let collections = store.list_collections().await?;
    expand_recipe(store, recipe, &collections).await
}

async fn expand_recipe(
    store: &dyn EntityStore,
    recipe: Recipe,
    collections: &[Collection],
) -> Result<PopulatedRecipe> {
    let ingredients = store.list_ingredients(recipe.id).await?;
    let by_id: HashMap<EntityId, &Ingredient> = ingredients
        .iter()
        .map(|ingredient| (ingredient.id, ingredient))
        .collect();

    let instructions = recipe
        .instructions
        .iter()
        .map(|instruction| PopulatedInstruction {
            step: instruction.step.clone(),
            ingredients_used: instruction
                .ingredients_used
                .iter()
                .filter_map(|id| by_id.get(id).map(|ingredient| (*ingredient).clone()))
                .collect(),
        })
        .collect();

    let memberships = collections
        .iter()
        .filter(|collection| collection.recipes.contains(&recipe.id))
        .map(CollectionSummary::from)
        .collect();

    Ok(PopulatedRecipe {
        id: recipe.id,
        fields: recipe.fields,
        instructions,
        ingredients,
        collections: memberships,
        created_at: recipe.created_at,
        updated_at: recipe.updated_at,
    })
}

/// Expand a collection's member recipes, each fully populated.
pub async fn populate_collection(
    store: &dyn EntityStore,
    collection: Collection,
) -> Result<PopulatedCollection> {
    let collections = store.list_collections().await?;
    populate_with(store, collection, &collections).await
}

async fn populate_with(
    store: &dyn EntityStore,
    collection: Collection,
    all: &[Collection],
) -> Result<PopulatedCollection> {
    let mut recipes = Vec::with_capacity(collection.recipes.len());
    for id in &collection.recipes {
        if let Some(recipe) = store.find_recipe(*id).await? {
            recipes.push(expand_recipe(store, recipe, all).await?);
        }
    }

    Ok(PopulatedCollection {
        id: collection.id,
        fields: collection.fields,
        recipes,
        created_at: collection.created_at,
        updated_at: collection.updated_at,
    })
}

/// Every collection sorted by `order`, then id, with recipes populated.
pub async fn populate_all_collections(store: &dyn EntityStore) -> Result<Vec<PopulatedCollection>> {
    let mut collections = store.list_collections().await?;
    collections.sort_by_key(|collection| (collection.fields.order, collection.id));

    let mut populated = Vec::with_capacity(collections.len());
    for collection in collections.iter().cloned() {
        populated.push(populate_with(store, collection, &collections).await?);
    }
    Ok(populated)
}

/// Full dump of the catalog, as written by `recipe-catalog export`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogExport {
    pub exported_at: DateTime<Utc>,
    pub collections: Vec<PopulatedCollection>,
    /// Every recipe, including those outside any collection
    pub recipes: Vec<PopulatedRecipe>,
}

pub async fn export_catalog(store: &dyn EntityStore) -> Result<CatalogExport> {
    let collections = populate_all_collections(store).await?;

    let all_collections = store.list_collections().await?;
    let mut recipes = Vec::new();
    for recipe in store.list_recipes().await? {
        recipes.push(expand_recipe(store, recipe, &all_collections).await?);
    }

    Ok(CatalogExport {
        exported_at: Utc::now(),
        collections,
        recipes,
    })
}
