use std::path::PathBuf;

use thiserror::Error;

use crate::model::EntityId;

/// Errors that can occur while migrating, drafting or serving catalog data
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to reach the chat API
    #[error("Failed to reach chat API: {0}")]
    FetchError(#[from] reqwest::Error),

    /// Chat API answered with a non-success status
    #[error("Chat API error ({status}): {body}")]
    RemoteStatus { status: u16, body: String },

    /// Chat API answered without a recipe object
    #[error("Chat API did not return a recipe payload")]
    MissingRecipePayload,

    /// Markdown file has no leading frontmatter block
    #[error("No frontmatter found in {}", .0.display())]
    MissingFrontmatter(PathBuf),

    /// Active content directory is absent
    #[error("Content directory {} does not exist", .0.display())]
    MissingContentDir(PathBuf),

    /// Frontmatter block is not valid YAML
    #[error("Invalid frontmatter: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Filesystem access failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Request payload failed validation
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: EntityId },

    /// A required setting is absent
    #[error("{0} is not configured")]
    MissingSetting(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
