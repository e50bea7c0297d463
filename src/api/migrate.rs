use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::migration::{run_migration, MigrationOptions};

/// POST /api/migrate-recipes
///
/// Runs the markdown migration against the configured content directories.
pub async fn migrate_recipes(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let options = MigrationOptions {
        active_dir: state.config.content.active_dir.clone(),
        archived_dir: state.config.content.archived_dir.clone(),
    };
    options.ensure_active_dir().await?;

    let report = run_migration(state.store.as_ref(), &options).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Migration completed successfully",
        "results": report,
    })))
}
