mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Collection, CollectionFields, EntityId, Ingredient, IngredientFields, Instruction, Recipe,
    RecipeFields,
};

/// Persistence seam for recipes, their ingredients and collections.
///
/// Every operation takes the store explicitly; nothing reaches for a global
/// handle. Mutations on ids that do not exist fail with
/// [`CatalogError::NotFound`](crate::CatalogError::NotFound).
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_recipe(&self, id: EntityId) -> Result<Option<Recipe>>;

    /// Look a recipe up by its natural key.
    async fn find_recipe_by_recipe_id(&self, recipe_id: &str) -> Result<Option<Recipe>>;

    /// All recipes in id order.
    async fn list_recipes(&self) -> Result<Vec<Recipe>>;

    async fn create_recipe(&self, fields: RecipeFields) -> Result<Recipe>;

    async fn update_recipe(&self, id: EntityId, fields: RecipeFields) -> Result<Recipe>;

    /// Replace the embedded instruction list.
    async fn set_instructions(&self, id: EntityId, instructions: Vec<Instruction>) -> Result<Recipe>;

    /// Delete a recipe, its ingredients and its collection memberships.
    /// Returns `false` when the recipe did not exist.
    async fn delete_recipe(&self, id: EntityId) -> Result<bool>;

    /// Ingredients owned by one recipe, in id order.
    async fn list_ingredients(&self, recipe: EntityId) -> Result<Vec<Ingredient>>;

    async fn create_ingredient(&self, recipe: EntityId, fields: IngredientFields)
        -> Result<Ingredient>;

    async fn update_ingredient(&self, id: EntityId, fields: IngredientFields) -> Result<Ingredient>;

    async fn delete_ingredient(&self, id: EntityId) -> Result<bool>;

    async fn find_collection(&self, id: EntityId) -> Result<Option<Collection>>;

    /// Look a collection up by its natural key.
    async fn find_collection_by_title(&self, title: &str) -> Result<Option<Collection>>;

    async fn list_collections(&self) -> Result<Vec<Collection>>;

    async fn create_collection(
        &self,
        fields: CollectionFields,
        recipes: Vec<EntityId>,
    ) -> Result<Collection>;

    async fn update_collection(
        &self,
        id: EntityId,
        fields: CollectionFields,
        recipes: Vec<EntityId>,
    ) -> Result<Collection>;

    async fn delete_collection(&self, id: EntityId) -> Result<bool>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;

    use crate::model::{CollectionFields, RecipeFields};

    pub fn recipe_fields(recipe_id: &str, name: &str) -> RecipeFields {
        RecipeFields {
            recipe_id: recipe_id.to_string(),
            name: name.to_string(),
            title: None,
            description: None,
            servings: 4,
            prep_time: None,
            cook_time: None,
            image_url: None,
            source_url: None,
            tags: Vec::new(),
            supermarkets: Vec::new(),
            prices_estimated_at: None,
            is_curated: true,
            published_at: Utc::now(),
        }
    }

    pub fn collection_fields(title: &str) -> CollectionFields {
        CollectionFields {
            title: title.to_string(),
            display_title: None,
            description: String::new(),
            order: 1,
            display_mode: "standard".to_string(),
            bg_color: "#FFF8F0".to_string(),
            dark_mode: false,
            background_image: None,
            featured: true,
            published_at: Utc::now(),
        }
    }
}
