use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{CatalogError, Result};
use crate::model::{
    Collection, CollectionFields, EntityId, Ingredient, IngredientFields, Instruction, Recipe,
    RecipeFields,
};
use crate::store::EntityStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    next_recipe_id: EntityId,
    next_ingredient_id: EntityId,
    next_collection_id: EntityId,
    recipes: BTreeMap<EntityId, Recipe>,
    ingredients: BTreeMap<EntityId, Ingredient>,
    collections: BTreeMap<EntityId, Collection>,
}

impl StoreState {
    fn recipe_mut(&mut self, id: EntityId) -> Result<&mut Recipe> {
        self.recipes.get_mut(&id).ok_or(CatalogError::NotFound {
            entity: "recipe",
            id,
        })
    }

    /// Keep only ids of recipes that exist, once each, in first-seen order.
    fn existing_recipes(&self, ids: Vec<EntityId>) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| self.recipes.contains_key(id) && seen.insert(*id))
            .collect()
    }
}

/// In-memory entity store, optionally mirrored to a JSON snapshot file.
///
/// With a snapshot path the whole state is rewritten after every mutation,
/// so a later process (another migration run, the server) sees the same
/// records and ids.
pub struct MemoryStore {
    state: Mutex<StoreState>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Store that lives only as long as the process.
    pub fn new() -> Self {
        MemoryStore {
            state: Mutex::new(StoreState::default()),
            snapshot: None,
        }
    }

    /// Load the snapshot at `path`, starting empty if it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state: StoreState = serde_json::from_slice(&bytes)?;
                info!(
                    "Loaded {} recipes, {} collections from {}",
                    state.recipes.len(),
                    state.collections.len(),
                    path.display()
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", path.display());
                StoreState::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(MemoryStore {
            state: Mutex::new(state),
            snapshot: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Wrote snapshot {}", path.display());
        Ok(())
    }

    /// Apply `change` to a copy of the state and keep it only once the
    /// snapshot has been written, so memory never runs ahead of disk.
    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut StoreState) -> Result<T> + Send,
        T: Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let output = change(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(output)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_recipe(&self, id: EntityId) -> Result<Option<Recipe>> {
        Ok(self.state.lock().await.recipes.get(&id).cloned())
    }

    async fn find_recipe_by_recipe_id(&self, recipe_id: &str) -> Result<Option<Recipe>> {
        let state = self.state.lock().await;
        Ok(state
            .recipes
            .values()
            .find(|recipe| recipe.fields.recipe_id == recipe_id)
            .cloned())
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>> {
        Ok(self.state.lock().await.recipes.values().cloned().collect())
    }

    async fn create_recipe(&self, fields: RecipeFields) -> Result<Recipe> {
        self.mutate(|state| {
            state.next_recipe_id += 1;
            let now = Utc::now();
            let recipe = Recipe {
                id: state.next_recipe_id,
                fields,
                instructions: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            state.recipes.insert(recipe.id, recipe.clone());
            Ok(recipe)
        })
        .await
    }

    async fn update_recipe(&self, id: EntityId, fields: RecipeFields) -> Result<Recipe> {
        self.mutate(|state| {
            let recipe = state.recipe_mut(id)?;
            recipe.fields = fields;
            recipe.updated_at = Utc::now();
            Ok(recipe.clone())
        })
        .await
    }

    async fn set_instructions(&self, id: EntityId, instructions: Vec<Instruction>) -> Result<Recipe> {
        self.mutate(|state| {
            let recipe = state.recipe_mut(id)?;
            if recipe.instructions != instructions {
                recipe.instructions = instructions;
                recipe.updated_at = Utc::now();
            }
            Ok(recipe.clone())
        })
        .await
    }

    async fn delete_recipe(&self, id: EntityId) -> Result<bool> {
        if !self.state.lock().await.recipes.contains_key(&id) {
            return Ok(false);
        }
        self.mutate(|state| {
            if state.recipes.remove(&id).is_none() {
                return Ok(false);
            }
            state.ingredients.retain(|_, ingredient| ingredient.recipe != id);
            for collection in state.collections.values_mut() {
                collection.recipes.retain(|member| *member != id);
            }
            Ok(true)
        })
        .await
    }

    async fn list_ingredients(&self, recipe: EntityId) -> Result<Vec<Ingredient>> {
        let state = self.state.lock().await;
        Ok(state
            .ingredients
            .values()
            .filter(|ingredient| ingredient.recipe == recipe)
            .cloned()
            .collect())
    }

    async fn create_ingredient(
        &self,
        recipe: EntityId,
        fields: IngredientFields,
    ) -> Result<Ingredient> {
        self.mutate(|state| {
            if !state.recipes.contains_key(&recipe) {
                return Err(CatalogError::NotFound {
                    entity: "recipe",
                    id: recipe,
                });
            }
            state.next_ingredient_id += 1;
            let ingredient = Ingredient {
                id: state.next_ingredient_id,
                recipe,
                fields,
            };
            state.ingredients.insert(ingredient.id, ingredient.clone());
            Ok(ingredient)
        })
        .await
    }

    async fn update_ingredient(&self, id: EntityId, fields: IngredientFields) -> Result<Ingredient> {
        self.mutate(|state| {
            let ingredient = state
                .ingredients
                .get_mut(&id)
                .ok_or(CatalogError::NotFound {
                    entity: "ingredient",
                    id,
                })?;
            ingredient.fields = fields;
            Ok(ingredient.clone())
        })
        .await
    }

    async fn delete_ingredient(&self, id: EntityId) -> Result<bool> {
        if !self.state.lock().await.ingredients.contains_key(&id) {
            return Ok(false);
        }
        self.mutate(|state| {
            let Some(removed) = state.ingredients.remove(&id) else {
                return Ok(false);
            };
            // Instructions must never point at an ingredient that is gone
            if let Some(recipe) = state.recipes.get_mut(&removed.recipe) {
                for instruction in &mut recipe.instructions {
                    instruction.ingredients_used.retain(|used| *used != id);
                }
            }
            Ok(true)
        })
        .await
    }

    async fn find_collection(&self, id: EntityId) -> Result<Option<Collection>> {
        Ok(self.state.lock().await.collections.get(&id).cloned())
    }

    async fn find_collection_by_title(&self, title: &str) -> Result<Option<Collection>> {
        let state = self.state.lock().await;
        Ok(state
            .collections
            .values()
            .find(|collection| collection.fields.title == title)
            .cloned())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        Ok(self.state.lock().await.collections.values().cloned().collect())
    }

    async fn create_collection(
        &self,
        fields: CollectionFields,
        recipes: Vec<EntityId>,
    ) -> Result<Collection> {
        self.mutate(|state| {
            let recipes = state.existing_recipes(recipes);
            state.next_collection_id += 1;
            let now = Utc::now();
            let collection = Collection {
                id: state.next_collection_id,
                fields,
                recipes,
                created_at: now,
                updated_at: now,
            };
            state.collections.insert(collection.id, collection.clone());
            Ok(collection)
        })
        .await
    }

    async fn update_collection(
        &self,
        id: EntityId,
        fields: CollectionFields,
        recipes: Vec<EntityId>,
    ) -> Result<Collection> {
        self.mutate(|state| {
            let recipes = state.existing_recipes(recipes);
            let collection = state
                .collections
                .get_mut(&id)
                .ok_or(CatalogError::NotFound {
                    entity: "collection",
                    id,
                })?;
            collection.fields = fields;
            collection.recipes = recipes;
            collection.updated_at = Utc::now();
            Ok(collection.clone())
        })
        .await
    }

    async fn delete_collection(&self, id: EntityId) -> Result<bool> {
        if !self.state.lock().await.collections.contains_key(&id) {
            return Ok(false);
        }
        self.mutate(|state| Ok(state.collections.remove(&id).is_some()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{collection_fields, recipe_fields};

    #[tokio::test]
    async fn test_create_and_find_recipe() {
        let store = MemoryStore::new();
        let created = store.create_recipe(recipe_fields("r1", "Soup")).await.unwrap();
        assert_eq!(created.id, 1);

        let found = store.find_recipe_by_recipe_id("r1").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(store.find_recipe_by_recipe_id("r2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ingredient_requires_recipe() {
        let store = MemoryStore::new();
        let result = store
            .create_ingredient(42, IngredientFields::named("Salt", ""))
            .await;
        assert!(matches!(
            result,
            Err(CatalogError::NotFound { entity: "recipe", id: 42 })
        ));
    }

    #[tokio::test]
    async fn test_delete_recipe_cascades() {
        let store = MemoryStore::new();
        let soup = store.create_recipe(recipe_fields("soup", "Soup")).await.unwrap();
        let stew = store.create_recipe(recipe_fields("stew", "Stew")).await.unwrap();
        store
            .create_ingredient(soup.id, IngredientFields::named("Leek", "1"))
            .await
            .unwrap();
        let collection = store
            .create_collection(collection_fields("Winter"), vec![soup.id, stew.id])
            .await
            .unwrap();

        assert!(store.delete_recipe(soup.id).await.unwrap());
        assert!(!store.delete_recipe(soup.id).await.unwrap());

        assert!(store.list_ingredients(soup.id).await.unwrap().is_empty());
        let collection = store.find_collection(collection.id).await.unwrap().unwrap();
        assert_eq!(collection.recipes, vec![stew.id]);
    }

    #[tokio::test]
    async fn test_delete_ingredient_unlinks_instructions() {
        let store = MemoryStore::new();
        let recipe = store.create_recipe(recipe_fields("r1", "Toast")).await.unwrap();
        let bread = store
            .create_ingredient(recipe.id, IngredientFields::named("Bread", "2 slices"))
            .await
            .unwrap();
        store
            .set_instructions(
                recipe.id,
                vec![Instruction {
                    step: "Toast the bread".to_string(),
                    ingredients_used: vec![bread.id],
                }],
            )
            .await
            .unwrap();

        store.delete_ingredient(bread.id).await.unwrap();

        let recipe = store.find_recipe(recipe.id).await.unwrap().unwrap();
        assert!(recipe.instructions[0].ingredients_used.is_empty());
    }

    #[tokio::test]
    async fn test_collection_drops_unknown_recipes() {
        let store = MemoryStore::new();
        let recipe = store.create_recipe(recipe_fields("r1", "Toast")).await.unwrap();
        let collection = store
            .create_collection(collection_fields("Breakfast"), vec![99, recipe.id])
            .await
            .unwrap();
        assert_eq!(collection.recipes, vec![recipe.id]);
    }

    #[tokio::test]
    async fn test_collection_members_are_unique() {
        let store = MemoryStore::new();
        let toast = store.create_recipe(recipe_fields("r1", "Toast")).await.unwrap();
        let jam = store.create_recipe(recipe_fields("r2", "Jam")).await.unwrap();
        let collection = store
            .create_collection(collection_fields("Breakfast"), vec![toast.id, jam.id, toast.id])
            .await
            .unwrap();
        assert_eq!(collection.recipes, vec![toast.id, jam.id]);

        let updated = store
            .update_collection(collection.id, collection_fields("Breakfast"), vec![jam.id, jam.id])
            .await
            .unwrap();
        assert_eq!(updated.recipes, vec![jam.id]);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = MemoryStore::open(&path).await.unwrap();
        let kept = store.create_recipe(recipe_fields("r1", "Toast")).await.unwrap();

        // A directory where the temp file goes makes every write fail
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();

        assert!(store.create_recipe(recipe_fields("r2", "Jam")).await.is_err());
        assert!(store
            .create_ingredient(kept.id, IngredientFields::named("Bread", "1"))
            .await
            .is_err());
        assert!(store.delete_recipe(kept.id).await.is_err());

        let recipes = store.list_recipes().await.unwrap();
        assert_eq!(recipes, vec![kept.clone()]);
        assert!(store.list_ingredients(kept.id).await.unwrap().is_empty());
        assert!(store.find_recipe_by_recipe_id("r2").await.unwrap().is_none());

        // Ids are not burned by the failed create
        std::fs::remove_dir(path.with_extension("json.tmp")).unwrap();
        let next = store.create_recipe(recipe_fields("r2", "Jam")).await.unwrap();
        assert_eq!(next.id, kept.id + 1);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("catalog.json");

        {
            let store = MemoryStore::open(&path).await.unwrap();
            let recipe = store.create_recipe(recipe_fields("r1", "Toast")).await.unwrap();
            store
                .create_ingredient(recipe.id, IngredientFields::named("Bread", "2 slices"))
                .await
                .unwrap();
        }

        let reopened = MemoryStore::open(&path).await.unwrap();
        let recipe = reopened.find_recipe_by_recipe_id("r1").await.unwrap().unwrap();
        assert_eq!(recipe.fields.name, "Toast");
        assert_eq!(reopened.list_ingredients(recipe.id).await.unwrap().len(), 1);

        // Ids keep counting from the snapshot
        let next = reopened.create_recipe(recipe_fields("r2", "Jam")).await.unwrap();
        assert_eq!(next.id, 2);
    }
}
