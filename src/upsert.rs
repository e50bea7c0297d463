//! Find-or-create of recipes (by `recipeId`) and collections (by `title`).

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::error::Result;
use crate::frontmatter::CollectionSource;
use crate::linker::link_instructions;
use crate::model::{Collection, CollectionFields, EntityId, Recipe, RecipeDraft, RecipeFields};
use crate::normalize::parse_timestamp;
use crate::reconcile::{reconcile_ingredients, ReconcileStats};
use crate::store::EntityStore;

pub const DEFAULT_SERVINGS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
    /// Matched an existing record whose fields were already current
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Upserted<T> {
    pub record: T,
    pub action: UpsertAction,
}

/// First parseable timestamp of `candidates`, logging the ones that are not.
fn first_timestamp<'a>(candidates: impl IntoIterator<Item = &'a Option<String>>) -> Option<DateTime<Utc>> {
    candidates
        .into_iter()
        .flatten()
        .find_map(|raw| match parse_timestamp(raw) {
            Some(parsed) => Some(parsed),
            None => {
                warn!("Ignoring unparseable timestamp '{}'", raw);
                None
            }
        })
}

/// Map a draft onto stored recipe fields.
///
/// The publish time comes from the draft (`publishedAt`, then
/// `pricesEstimatedAt`), else from the existing record, else now.
pub fn recipe_fields(natural_id: &str, draft: &RecipeDraft, existing: Option<&Recipe>) -> RecipeFields {
    let published_at = first_timestamp([&draft.published_at, &draft.prices_estimated_at])
        .or_else(|| existing.map(|recipe| recipe.fields.published_at))
        .unwrap_or_else(Utc::now);

    RecipeFields {
        recipe_id: natural_id.to_string(),
        name: draft
            .name
            .clone()
            .or_else(|| draft.title.clone())
            .unwrap_or_default(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        servings: draft.servings.unwrap_or(DEFAULT_SERVINGS),
        prep_time: draft.prep_time.clone(),
        cook_time: draft.cook_time.clone(),
        image_url: draft.image_url.clone(),
        source_url: draft.source_url.clone(),
        tags: draft.tags.clone(),
        supermarkets: draft.supermarkets.clone(),
        prices_estimated_at: draft.prices_estimated_at.clone(),
        is_curated: true,
        published_at,
    }
}

pub async fn upsert_recipe(
    store: &dyn EntityStore,
    natural_id: &str,
    draft: &RecipeDraft,
) -> Result<Upserted<Recipe>> {
    match store.find_recipe_by_recipe_id(natural_id).await? {
        Some(existing) => {
            let fields = recipe_fields(natural_id, draft, Some(&existing));
            if fields == existing.fields {
                return Ok(Upserted {
                    record: existing,
                    action: UpsertAction::Unchanged,
                });
            }
            let record = store.update_recipe(existing.id, fields).await?;
            info!("Updated recipe \"{}\" (ID: {})", record.fields.name, record.id);
            Ok(Upserted {
                record,
                action: UpsertAction::Updated,
            })
        }
        None => {
            let record = store
                .create_recipe(recipe_fields(natural_id, draft, None))
                .await?;
            info!("Created recipe \"{}\" (ID: {})", record.fields.name, record.id);
            Ok(Upserted {
                record,
                action: UpsertAction::Created,
            })
        }
    }
}

/// A recipe after its fields, ingredients and instructions were brought in line
#[derive(Debug, Clone)]
pub struct SyncedRecipe {
    pub recipe: Recipe,
    pub action: UpsertAction,
    pub ingredients: ReconcileStats,
}

/// Upsert a recipe, reconcile its ingredients and relink its instructions.
pub async fn sync_recipe(
    store: &dyn EntityStore,
    natural_id: &str,
    draft: &RecipeDraft,
) -> Result<SyncedRecipe> {
    let upserted = upsert_recipe(store, natural_id, draft).await?;
    let recipe_id = upserted.record.id;

    let reconciled = reconcile_ingredients(store, recipe_id, &draft.ingredients).await?;
    let instructions = link_instructions(&draft.instructions, &reconciled.lookup);
    let recipe = store.set_instructions(recipe_id, instructions).await?;

    Ok(SyncedRecipe {
        recipe,
        action: upserted.action,
        ingredients: reconciled.stats,
    })
}

/// Map a parsed collection onto stored fields, keeping the existing
/// publish time when the source has none.
pub fn collection_fields(source: &CollectionSource, existing: Option<&Collection>) -> CollectionFields {
    let published_at = first_timestamp([&source.published_at])
        .or_else(|| existing.map(|collection| collection.fields.published_at))
        .unwrap_or_else(Utc::now);

    CollectionFields {
        title: source.title.clone(),
        display_title: source.display_title.clone(),
        description: source.description.clone(),
        order: source.order,
        display_mode: source.display_mode.clone(),
        bg_color: source.bg_color.clone(),
        dark_mode: source.dark_mode,
        background_image: source.background_image.clone(),
        featured: source.featured,
        published_at,
    }
}

pub async fn upsert_collection(
    store: &dyn EntityStore,
    source: &CollectionSource,
    recipes: Vec<EntityId>,
) -> Result<Upserted<Collection>> {
    match store.find_collection_by_title(&source.title).await? {
        Some(existing) => {
            let fields = collection_fields(source, Some(&existing));
            if fields == existing.fields && recipes == existing.recipes {
                return Ok(Upserted {
                    record: existing,
                    action: UpsertAction::Unchanged,
                });
            }
            let record = store.update_collection(existing.id, fields, recipes).await?;
            info!("Updated collection \"{}\"", record.fields.title);
            Ok(Upserted {
                record,
                action: UpsertAction::Updated,
            })
        }
        None => {
            let record = store
                .create_collection(collection_fields(source, None), recipes)
                .await?;
            info!("Created collection \"{}\"", record.fields.title);
            Ok(Upserted {
                record,
                action: UpsertAction::Created,
            })
        }
    }
}
