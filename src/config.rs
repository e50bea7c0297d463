use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// HTTP listener and admin access
    #[serde(default)]
    pub server: ServerConfig,
    /// Location of the markdown collection files
    #[serde(default)]
    pub content: ContentConfig,
    /// External chat endpoint used to draft recipes
    #[serde(default)]
    pub chat: ChatConfig,
    /// Snapshot location of the entity store
    #[serde(default)]
    pub store: StoreConfig,
    /// REST pagination limits
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Bearer token for the generator routes; without one they reject every request
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            admin_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_active_dir")]
    pub active_dir: PathBuf,
    #[serde(default = "default_archived_dir")]
    pub archived_dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            active_dir: default_active_dir(),
            archived_dir: default_archived_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatConfig {
    /// Base URL of the chat service (can also be set via CHAT_BASE_URL)
    pub base_url: Option<String>,
    /// Protection bypass secret (can also be set via CHAT_BYPASS_SECRET)
    pub bypass_secret: Option<String>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// JSON snapshot file; in-memory only when unset
    #[serde(default = "default_store_path")]
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    1337
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://localhost:1337".to_string(),
    ]
}

fn default_active_dir() -> PathBuf {
    PathBuf::from("content/collections/active")
}

fn default_archived_dir() -> PathBuf {
    PathBuf::from("content/collections/archived")
}

fn default_store_path() -> Option<PathBuf> {
    Some(PathBuf::from("data/catalog.json"))
}

fn default_limit() -> usize {
    25
}

fn default_max_limit() -> usize {
    100
}

pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 30;

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with CATALOG__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: CATALOG__CHAT__BYPASS_SECRET
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
///
/// See [`AppConfig::load`] for the precedence rules.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: CATALOG__SERVER__PORT
        .add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
