//! Admin routes that draft recipes with the chat API and save the result

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use log::info;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::drafting::create_recipe;
use crate::providers::{GenerateRequest, GeneratedRecipe, RecipeProvider};

/// POST /generate
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GeneratedRecipe>, ApiError> {
    let Json(mut request) = payload?;
    request.query = request.query.trim().to_string();
    if request.query.is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    info!(
        "Generating recipe via {} for \"{}\"",
        state.provider.provider_name(),
        request.query
    );
    let generated = state.provider.generate(&request).await?;
    Ok(Json(generated))
}

/// POST /create
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let recipe = body
        .get("recipe")
        .filter(|recipe| recipe.is_object())
        .ok_or_else(|| ApiError::BadRequest("Recipe payload is required".to_string()))?;

    let saved = create_recipe(state.store.as_ref(), recipe).await?;
    Ok(Json(json!({ "success": true, "recipe": saved })))
}
