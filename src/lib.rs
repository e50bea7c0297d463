//! Recipe catalog backend.
//!
//! Migrates markdown collection files (YAML frontmatter) into an entity
//! store, keeps each recipe's ingredients reconciled by name and quantity,
//! links instruction steps to ingredient records, and serves the catalog
//! over HTTP along with admin routes that draft recipes through an external
//! chat API.

pub mod api;
pub mod config;
pub mod drafting;
pub mod error;
pub mod frontmatter;
pub mod linker;
pub mod migration;
pub mod model;
pub mod normalize;
pub mod populate;
pub mod providers;
pub mod reconcile;
pub mod store;
pub mod upsert;

pub use api::{build_router, AppState};
pub use config::AppConfig;
pub use drafting::create_recipe;
pub use error::{CatalogError, Result};
pub use migration::{run_migration, MigrationOptions, MigrationReport};
pub use providers::{ChatApiProvider, GenerateRequest, GeneratedRecipe, RecipeProvider};
pub use store::{EntityStore, MemoryStore};
