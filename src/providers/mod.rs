mod chat_api;

pub use chat_api::ChatApiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// What the admin asked the generator for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_requirements: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<Value>,
}

/// Draft recipe returned by a provider, with the provider's full response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedRecipe {
    pub success: bool,
    pub recipe: Value,
    pub raw: Value,
}

/// Source of AI-drafted recipes
#[async_trait]
pub trait RecipeProvider: Send + Sync {
    /// Get the provider name (e.g., "chat_api")
    fn provider_name(&self) -> &str;

    /// Ask the provider for a recipe draft
    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedRecipe>;
}
