use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};
use log::info;
use serde_json::{json, Value};

use super::pagination::{calculate_pagination, PageParams};
use super::{merge_fields, ApiError, AppState, DataBody};
use crate::drafting::prepare_draft;
use crate::linker::link_instructions;
use crate::model::{EntityId, RecipeFields};
use crate::normalize::recipe_draft;
use crate::populate::populate_recipe;
use crate::reconcile::{reconcile_ingredients, IngredientLookup};
use crate::store::EntityStore;
use crate::upsert::sync_recipe;

fn not_found(id: EntityId) -> ApiError {
    ApiError::NotFound(format!("recipe {} not found", id))
}

/// GET /api/recipes
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let store = state.store.as_ref();

    let recipes = store.list_recipes().await?;
    let page = calculate_pagination(recipes.len(), params, &state.config.api);

    let mut data = Vec::with_capacity(page.page_size);
    for recipe in page.slice(recipes) {
        data.push(populate_recipe(store, recipe).await?);
    }

    Ok(Json(json!({ "data": data, "meta": { "pagination": page } })))
}

/// GET /api/recipes/:id
pub async fn find_one(
    State(state): State<AppState>,
    path: Result<Path<EntityId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let store = state.store.as_ref();
    let recipe = store.find_recipe(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(json!({ "data": populate_recipe(store, recipe).await? })))
}

/// POST /api/recipes
///
/// Accepts the same loose recipe shape as `/create`. A recipe whose natural
/// id is already taken is rejected.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<DataBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(DataBody { data }) = payload?;
    if !data.is_object() {
        return Err(ApiError::BadRequest("data must be an object".to_string()));
    }

    let store = state.store.as_ref();
    let (natural_id, draft) = prepare_draft(&data);
    if store.find_recipe_by_recipe_id(&natural_id).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "recipe \"{}\" already exists",
            natural_id
        )));
    }

    let synced = sync_recipe(store, &natural_id, &draft).await?;
    info!("Created recipe \"{}\" via REST", natural_id);
    Ok(Json(json!({ "data": populate_recipe(store, synced.recipe).await? })))
}

/// PUT /api/recipes/:id
///
/// Known scalar fields are overlaid on the stored record. When `ingredients`
/// or `instructions` are present they replace the stored ones through the
/// reconciler and linker.
pub async fn update(
    State(state): State<AppState>,
    path: Result<Path<EntityId>, PathRejection>,
    payload: Result<Json<DataBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let Json(DataBody { data }) = payload?;
    let store = state.store.as_ref();

    let existing = store.find_recipe(id).await?.ok_or_else(|| not_found(id))?;
    let fields: RecipeFields = merge_fields(&existing.fields, &data)?;
    ensure_recipe_id_free(store, id, &fields.recipe_id).await?;
    if fields != existing.fields {
        store.update_recipe(id, fields).await?;
    }

    let draft = recipe_draft(&data, None);
    let lookup = match data.get("ingredients") {
        Some(_) => Some(reconcile_ingredients(store, id, &draft.ingredients).await?.lookup),
        None => None,
    };
    if data.get("instructions").is_some() {
        let lookup = match lookup {
            Some(lookup) => lookup,
            None => IngredientLookup::from_ingredients(&store.list_ingredients(id).await?),
        };
        let instructions: Vec<_> = draft
            .instructions
            .into_iter()
            .filter(|instruction| instruction.step.is_some())
            .collect();
        store
            .set_instructions(id, link_instructions(&instructions, &lookup))
            .await?;
    }

    let recipe = store.find_recipe(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(json!({ "data": populate_recipe(store, recipe).await? })))
}

async fn ensure_recipe_id_free(
    store: &dyn EntityStore,
    id: EntityId,
    recipe_id: &str,
) -> Result<(), ApiError> {
    match store.find_recipe_by_recipe_id(recipe_id).await? {
        Some(other) if other.id != id => Err(ApiError::Conflict(format!(
            "recipe \"{}\" already exists",
            recipe_id
        ))),
        _ => Ok(()),
    }
}

/// DELETE /api/recipes/:id
pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<EntityId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let store = state.store.as_ref();

    let recipe = store.find_recipe(id).await?.ok_or_else(|| not_found(id))?;
    let populated = populate_recipe(store, recipe).await?;
    if !store.delete_recipe(id).await? {
        return Err(not_found(id));
    }

    info!("Deleted recipe {}", id);
    Ok(Json(json!({ "data": populated })))
}
