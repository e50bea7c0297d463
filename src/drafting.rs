//! Persisting recipe drafts submitted from the admin generator.

use chrono::Utc;
use log::info;
use serde_json::Value;

use crate::error::{CatalogError, Result};
use crate::model::{PopulatedRecipe, RecipeDraft};
use crate::normalize::{recipe_draft, title_slug};
use crate::populate::populate_recipe;
use crate::store::EntityStore;
use crate::upsert::sync_recipe;

pub const DEFAULT_RECIPE_NAME: &str = "New Recipe";

/// Maximum length of a slug derived from a drafted recipe's name
pub const DRAFT_SLUG_LEN: usize = 60;

/// Normalize an arbitrary recipe-shaped payload and pick its natural id.
///
/// The name falls back to the title and then to `New Recipe`; the title
/// falls back to the name. Instructions without text are dropped and
/// supermarket entries without a name are discarded.
pub fn prepare_draft(payload: &Value) -> (String, RecipeDraft) {
    let mut draft = recipe_draft(payload, None);

    let name = draft
        .name
        .clone()
        .or_else(|| draft.title.clone())
        .unwrap_or_else(|| DEFAULT_RECIPE_NAME.to_string());
    draft.title = draft.title.take().or_else(|| Some(name.clone()));
    draft.instructions.retain(|instruction| instruction.step.is_some());

    let natural_id = draft
        .recipe_id
        .clone()
        .or_else(|| Some(title_slug(&name, DRAFT_SLUG_LEN)).filter(|slug| !slug.is_empty()))
        .unwrap_or_else(|| format!("recipe-{}", Utc::now().timestamp_millis()));

    draft.name = Some(name);
    (natural_id, draft)
}

/// Persist a drafted recipe and return it with every relation populated.
///
/// Goes through the same upsert, ingredient reconciliation and instruction
/// linking as the migration, so submitting the same draft twice updates the
/// first record instead of duplicating it.
pub async fn create_recipe(store: &dyn EntityStore, payload: &Value) -> Result<PopulatedRecipe> {
    if !payload.is_object() {
        return Err(CatalogError::InvalidPayload(
            "Recipe payload must be an object".to_string(),
        ));
    }

    let (natural_id, draft) = prepare_draft(payload);
    let synced = sync_recipe(store, &natural_id, &draft).await?;
    info!(
        "Saved drafted recipe \"{}\" ({:?}, {} ingredients created)",
        natural_id, synced.action, synced.ingredients.created
    );

    populate_recipe(store, synced.recipe).await
}
