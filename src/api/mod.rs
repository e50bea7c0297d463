//! HTTP surface: REST routes for recipes and collections, the migration
//! trigger and the admin generator routes.

mod auth;
mod collections;
mod error;
mod generator;
mod health;
mod migrate;
pub mod pagination;
mod recipes;

pub use auth::admin_auth;
pub use error::ApiError;
pub use health::{health_check, HealthResponse};

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AppConfig;
use crate::error::CatalogError;
use crate::providers::RecipeProvider;
use crate::store::EntityStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub provider: Arc<dyn RecipeProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        provider: Arc<dyn RecipeProvider>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config: Arc::new(config),
        }
    }
}

/// Build application router
///
/// `/generate` and `/create` sit behind the admin bearer token; everything
/// else is public.
pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/generate", post(generator::generate))
        .route("/create", post(generator::create))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    let public = Router::new()
        .route("/api/recipes", get(recipes::list).post(recipes::create))
        .route(
            "/api/recipes/:id",
            get(recipes::find_one)
                .put(recipes::update)
                .delete(recipes::delete),
        )
        .route(
            "/api/collections",
            get(collections::list).post(collections::create),
        )
        .route("/api/collections/full", get(collections::full))
        .route(
            "/api/collections/:id",
            get(collections::find_one)
                .put(collections::update)
                .delete(collections::delete),
        )
        .route("/api/migrate-recipes", post(migrate::migrate_recipes))
        .merge(health::health_routes());

    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Request body wrapper used by the REST create/update routes: `{"data": {...}}`
#[derive(Debug, Deserialize)]
pub struct DataBody {
    pub data: Value,
}

/// Overlay the keys of `patch` that `current` already has, then read the
/// result back. Unknown keys are ignored.
fn merge_fields<T>(current: &T, patch: &Value) -> Result<T, ApiError>
where
    T: Serialize + DeserializeOwned,
{
    let patch = patch
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("data must be an object".to_string()))?;

    let mut merged = serde_json::to_value(current).map_err(CatalogError::from)?;
    if let Value::Object(fields) = &mut merged {
        for (key, value) in patch {
            if fields.contains_key(key) {
                fields.insert(key.clone(), value.clone());
            }
        }
    }

    serde_json::from_value(merged).map_err(|e| ApiError::BadRequest(format!("Invalid data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::recipe_fields;
    use serde_json::json;

    #[test]
    fn test_merge_fields_overlays_known_keys() {
        let current = recipe_fields("toast", "Toast");
        let merged = merge_fields(
            &current,
            &json!({"name": "French Toast", "servings": 2, "unknown": true}),
        )
        .unwrap();

        assert_eq!(merged.name, "French Toast");
        assert_eq!(merged.servings, 2);
        assert_eq!(merged.recipe_id, "toast");
    }

    #[test]
    fn test_merge_fields_rejects_bad_types() {
        let current = recipe_fields("toast", "Toast");
        assert!(matches!(
            merge_fields(&current, &json!({"servings": "many"})),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            merge_fields(&current, &json!(["not", "an", "object"])),
            Err(ApiError::BadRequest(_))
        ));
    }
}
