use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};
use log::info;
use serde_json::{json, Value};

use super::pagination::{calculate_pagination, PageParams};
use super::{merge_fields, ApiError, AppState, DataBody};
use crate::frontmatter::collection_source;
use crate::model::{CollectionFields, EntityId};
use crate::populate::populate_all_collections;
use crate::store::EntityStore;
use crate::upsert::collection_fields;

fn not_found(id: EntityId) -> ApiError {
    ApiError::NotFound(format!("collection {} not found", id))
}

/// Member recipe ids from `recipes`: plain ids or objects with an `id`.
fn recipe_ids(value: &Value) -> Vec<EntityId> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_u64().or_else(|| entry.get("id")?.as_u64()))
                .collect()
        })
        .unwrap_or_default()
}

async fn ensure_title_free(
    store: &dyn EntityStore,
    id: Option<EntityId>,
    title: &str,
) -> Result<(), ApiError> {
    match store.find_collection_by_title(title).await? {
        Some(other) if Some(other.id) != id => Err(ApiError::Conflict(format!(
            "collection \"{}\" already exists",
            title
        ))),
        _ => Ok(()),
    }
}

/// GET /api/collections
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let collections = state.store.list_collections().await?;
    let page = calculate_pagination(collections.len(), params, &state.config.api);

    Ok(Json(json!({
        "data": page.slice(collections),
        "meta": { "pagination": page },
    })))
}

/// GET /api/collections/full
pub async fn full(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let collections = populate_all_collections(state.store.as_ref()).await?;
    Ok(Json(json!({ "data": collections })))
}

/// GET /api/collections/:id
pub async fn find_one(
    State(state): State<AppState>,
    path: Result<Path<EntityId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let collection = state
        .store
        .find_collection(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(json!({ "data": collection })))
}

/// POST /api/collections
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<DataBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(DataBody { data }) = payload?;
    let source = collection_source(&data, false);
    if source.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Collection title is required".to_string()));
    }

    let store = state.store.as_ref();
    ensure_title_free(store, None, &source.title).await?;

    let recipes = data.get("recipes").map(recipe_ids).unwrap_or_default();
    let collection = store
        .create_collection(collection_fields(&source, None), recipes)
        .await?;

    info!("Created collection \"{}\" via REST", collection.fields.title);
    Ok(Json(json!({ "data": collection })))
}

/// PUT /api/collections/:id
pub async fn update(
    State(state): State<AppState>,
    path: Result<Path<EntityId>, PathRejection>,
    payload: Result<Json<DataBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let Json(DataBody { data }) = payload?;
    let store = state.store.as_ref();

    let existing = store.find_collection(id).await?.ok_or_else(|| not_found(id))?;
    let fields: CollectionFields = merge_fields(&existing.fields, &data)?;
    if fields.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Collection title is required".to_string()));
    }
    ensure_title_free(store, Some(id), &fields.title).await?;

    let recipes = match data.get("recipes") {
        Some(value) => recipe_ids(value),
        None => existing.recipes,
    };

    let collection = store.update_collection(id, fields, recipes).await?;
    Ok(Json(json!({ "data": collection })))
}

/// DELETE /api/collections/:id
pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<EntityId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let store = state.store.as_ref();

    let collection = store.find_collection(id).await?.ok_or_else(|| not_found(id))?;
    if !store.delete_collection(id).await? {
        return Err(not_found(id));
    }

    info!("Deleted collection \"{}\"", collection.fields.title);
    Ok(Json(json!({ "data": collection })))
}
