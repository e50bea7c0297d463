use crate::config::{ChatConfig, DEFAULT_CHAT_TIMEOUT_SECS};
use crate::error::{CatalogError, Result};
use crate::providers::{GenerateRequest, GeneratedRecipe, RecipeProvider};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Chat frontend endpoint that drafts recipes from a free-text query.
///
/// The deployment sits behind access protection; requests carry the bypass
/// secret as a query parameter.
pub struct ChatApiProvider {
    client: Client,
    base_url: String,
    bypass_secret: Option<String>,
}

impl ChatApiProvider {
    /// Create a provider from configuration, falling back to the
    /// CHAT_BASE_URL and CHAT_BYPASS_SECRET environment variables.
    ///
    /// A missing secret is not an error here; every `generate` call fails
    /// until one is configured.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .or_else(|| std::env::var("CHAT_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let bypass_secret = config
            .bypass_secret
            .clone()
            .or_else(|| std::env::var("CHAT_BYPASS_SECRET").ok())
            .filter(|secret| !secret.is_empty());

        let client = Client::builder()
            .timeout(Duration::from_secs(
                config.timeout.unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS),
            ))
            .build()?;

        Ok(ChatApiProvider {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bypass_secret,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(base_url: String, bypass_secret: Option<String>) -> Self {
        ChatApiProvider {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bypass_secret,
        }
    }
}

/// The recipe object of a chat response: `response.recipe`, else `recipe`.
fn extract_recipe(body: &Value) -> Option<Value> {
    [&body["response"]["recipe"], &body["recipe"]]
        .into_iter()
        .find(|candidate| !candidate.is_null())
        .cloned()
}

#[async_trait]
impl RecipeProvider for ChatApiProvider {
    fn provider_name(&self) -> &str {
        "chat_api"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedRecipe> {
        let secret = self
            .bypass_secret
            .as_deref()
            .ok_or(CatalogError::MissingSetting("CHAT_BYPASS_SECRET"))?;

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .query(&[
                ("x-vercel-set-bypass-cookie", "true"),
                ("x-vercel-protection-bypass", secret),
            ])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = response.json().await?;
        debug!("{:?}", raw);
        let recipe = extract_recipe(&raw).ok_or(CatalogError::MissingRecipePayload)?;

        Ok(GeneratedRecipe {
            success: true,
            recipe,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn bypass_query(secret: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("x-vercel-set-bypass-cookie".into(), "true".into()),
            Matcher::UrlEncoded("x-vercel-protection-bypass".into(), secret.into()),
        ])
    }

    fn pasta_request() -> GenerateRequest {
        GenerateRequest {
            query: "quick pasta".to_string(),
            dietary_requirements: None,
            serving_size: Some(json!(2)),
        }
    }

    #[tokio::test]
    async fn test_generate() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_query(bypass_query("s3cret"))
            .match_body(Matcher::Json(json!({"query": "quick pasta", "servingSize": 2})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": {"recipe": {"name": "Pasta al Limone"}, "text": "Enjoy"}}"#)
            .create_async()
            .await;

        let provider = ChatApiProvider::with_base_url(server.url(), Some("s3cret".to_string()));
        let result = provider.generate(&pasta_request()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.recipe["name"], "Pasta al Limone");
        assert_eq!(result.raw["response"]["text"], "Enjoy");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_top_level_recipe() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"recipe": {"name": "Shakshuka"}}"#)
            .create_async()
            .await;

        let provider = ChatApiProvider::with_base_url(server.url(), Some("s3cret".to_string()));
        let result = provider.generate(&pasta_request()).await.unwrap();
        assert_eq!(result.recipe["name"], "Shakshuka");
    }

    #[tokio::test]
    async fn test_generate_api_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let provider = ChatApiProvider::with_base_url(server.url(), Some("s3cret".to_string()));
        let result = provider.generate(&pasta_request()).await;

        match result {
            Err(CatalogError::RemoteStatus { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("Expected RemoteStatus, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_without_recipe() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": {"text": "I can only talk about food"}}"#)
            .create_async()
            .await;

        let provider = ChatApiProvider::with_base_url(server.url(), Some("s3cret".to_string()));
        let result = provider.generate(&pasta_request()).await;
        assert!(matches!(result, Err(CatalogError::MissingRecipePayload)));
    }

    #[tokio::test]
    async fn test_generate_requires_secret() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let provider = ChatApiProvider::with_base_url(server.url(), None);
        let result = provider.generate(&pasta_request()).await;

        let err = result.unwrap_err();
        assert!(matches!(err, CatalogError::MissingSetting(_)));
        assert_eq!(err.to_string(), "CHAT_BYPASS_SECRET is not configured");
        mock.assert_async().await;
    }

    #[test]
    fn test_provider_name() {
        let provider = ChatApiProvider::with_base_url("http://localhost".to_string(), None);
        assert_eq!(provider.provider_name(), "chat_api");
    }

    #[test]
    fn test_new_from_config() {
        let config = ChatConfig {
            base_url: Some("https://chat.example.com/".to_string()),
            bypass_secret: Some("abc".to_string()),
            timeout: Some(5),
        };
        let provider = ChatApiProvider::new(&config).unwrap();
        assert_eq!(provider.base_url, "https://chat.example.com");
        assert_eq!(provider.bypass_secret.as_deref(), Some("abc"));
    }
}
