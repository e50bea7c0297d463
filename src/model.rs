use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal identifier assigned by the store
pub type EntityId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// Price of a recipe or ingredient at one supermarket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupermarketPrice {
    pub supermarket: String,
    pub price: Option<f64>,
    pub currency: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// One step of a recipe with the ingredient records it uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub step: String,
    pub ingredients_used: Vec<EntityId>,
}

/// Mutable attributes of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFields {
    /// Natural key (slug)
    pub recipe_id: String,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub servings: u32,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub tags: Vec<Tag>,
    pub supermarkets: Vec<SupermarketPrice>,
    pub prices_estimated_at: Option<String>,
    pub is_curated: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: RecipeFields,
    pub instructions: Vec<Instruction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable attributes of an ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientFields {
    pub name: String,
    /// Free text, empty when the source gave none
    pub quantity: String,
    pub is_pantry: bool,
    pub supermarkets: Vec<SupermarketPrice>,
}

impl IngredientFields {
    pub fn named(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            is_pantry: false,
            supermarkets: Vec::new(),
        }
    }
}

/// Ingredient row owned by exactly one recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: EntityId,
    pub recipe: EntityId,
    #[serde(flatten)]
    pub fields: IngredientFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFields {
    /// Natural key
    pub title: String,
    pub display_title: Option<String>,
    pub description: String,
    pub order: i64,
    pub display_mode: String,
    pub bg_color: String,
    pub dark_mode: bool,
    pub background_image: Option<String>,
    pub featured: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: CollectionFields,
    /// Ordered member recipes
    pub recipes: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How an instruction names an ingredient before linking
#[derive(Debug, Clone, PartialEq)]
pub enum IngredientRef {
    /// Already an ingredient record id
    Id(EntityId),
    /// Name with optional quantity, resolved against the recipe's ingredients
    Name { name: String, quantity: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionDraft {
    pub step: Option<String>,
    pub ingredients_used: Vec<IngredientRef>,
}

/// Recipe as read from frontmatter or a request body, before persistence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeDraft {
    pub recipe_id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub servings: Option<u32>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub prices_estimated_at: Option<String>,
    pub published_at: Option<String>,
    pub tags: Vec<Tag>,
    pub supermarkets: Vec<SupermarketPrice>,
    pub ingredients: Vec<IngredientFields>,
    pub instructions: Vec<InstructionDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulatedInstruction {
    pub step: String,
    pub ingredients_used: Vec<Ingredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub id: EntityId,
    pub title: String,
    pub display_title: Option<String>,
    pub description: String,
}

/// Recipe with its relations expanded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedRecipe {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: RecipeFields,
    pub instructions: Vec<PopulatedInstruction>,
    pub ingredients: Vec<Ingredient>,
    pub collections: Vec<CollectionSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedCollection {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: CollectionFields,
    pub recipes: Vec<PopulatedRecipe>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Collection> for CollectionSummary {
    fn from(collection: &Collection) -> Self {
        Self {
            id: collection.id,
            title: collection.fields.title.clone(),
            display_title: collection.fields.display_title.clone(),
            description: collection.fields.description.clone(),
        }
    }
}
