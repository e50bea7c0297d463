//! Batch migration of markdown collection files into the store.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use log::{error, info, warn};
use serde::Serialize;

use crate::error::{CatalogError, Result};
use crate::frontmatter::scan_content;
use crate::model::EntityId;
use crate::reconcile::ReconcileStats;
use crate::store::EntityStore;
use crate::upsert::{sync_recipe, upsert_collection, UpsertAction};

/// Where the collection files live
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub active_dir: PathBuf,
    pub archived_dir: PathBuf,
}

impl MigrationOptions {
    /// Fail when the active directory is missing. The archived one is optional.
    pub async fn ensure_active_dir(&self) -> Result<()> {
        match tokio::fs::metadata(&self.active_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(CatalogError::MissingContentDir(self.active_dir.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl UpsertCounts {
    fn record(&mut self, action: UpsertAction) {
        match action {
            UpsertAction::Created => self.created += 1,
            UpsertAction::Updated => self.updated += 1,
            UpsertAction::Unchanged => self.unchanged += 1,
        }
    }
}

/// One record that could not be migrated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationFailure {
    /// `recipe` or `collection`
    pub kind: &'static str,
    pub name: String,
    pub error: String,
}

/// Summary of one migration run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub files_skipped: usize,
    pub empty_recipes_removed: usize,
    pub recipes: UpsertCounts,
    pub ingredients: ReconcileStats,
    pub collections: UpsertCounts,
    pub errors: Vec<MigrationFailure>,
}

/// Delete recipes whose name is blank, left behind by earlier partial imports.
async fn remove_empty_recipes(store: &dyn EntityStore) -> Result<usize> {
    let mut removed = 0;
    for recipe in store.list_recipes().await? {
        if recipe.fields.name.trim().is_empty() && store.delete_recipe(recipe.id).await? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Parse the content directories and bring the store in line with them.
///
/// Runs sequentially. A failure on one recipe or collection is logged and
/// recorded in the report; the run carries on with the next item.
pub async fn run_migration(
    store: &dyn EntityStore,
    options: &MigrationOptions,
) -> Result<MigrationReport> {
    info!("Starting migration");
    let parsed = scan_content(&options.active_dir, &options.archived_dir).await;

    let mut report = MigrationReport {
        files_skipped: parsed.skipped.len(),
        ..Default::default()
    };

    match remove_empty_recipes(store).await {
        Ok(removed) => {
            info!("Deleted {} empty recipes", removed);
            report.empty_recipes_removed = removed;
        }
        Err(e) => warn!("Could not clean up empty recipes: {}", e),
    }

    let mut recipe_ids: HashMap<&str, EntityId> = HashMap::new();
    for source in &parsed.recipes {
        let label = source
            .draft
            .name
            .clone()
            .unwrap_or_else(|| source.natural_id.clone());

        match sync_recipe(store, &source.natural_id, &source.draft).await {
            Ok(synced) => {
                report.recipes.record(synced.action);
                report.ingredients.add(&synced.ingredients);
                recipe_ids.insert(source.natural_id.as_str(), synced.recipe.id);
            }
            Err(e) => {
                error!("Error migrating recipe \"{}\": {}", label, e);
                report.errors.push(MigrationFailure {
                    kind: "recipe",
                    name: label,
                    error: e.to_string(),
                });
            }
        }
    }

    for collection in &parsed.collections {
        let mut seen = HashSet::new();
        let members = collection
            .recipe_refs
            .iter()
            .filter_map(|natural_id| recipe_ids.get(natural_id.as_str()).copied())
            .filter(|id| seen.insert(*id))
            .collect();

        match upsert_collection(store, collection, members).await {
            Ok(upserted) => report.collections.record(upserted.action),
            Err(e) => {
                error!("Error migrating collection \"{}\": {}", collection.title, e);
                report.errors.push(MigrationFailure {
                    kind: "collection",
                    name: collection.title.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Migration complete: recipes {:?}, collections {:?}, {} errors",
        report.recipes,
        report.collections,
        report.errors.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::recipe_fields;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_remove_empty_recipes() {
        let store = MemoryStore::new();
        store.create_recipe(recipe_fields("blank", "  ")).await.unwrap();
        store.create_recipe(recipe_fields("soup", "Soup")).await.unwrap();

        assert_eq!(remove_empty_recipes(&store).await.unwrap(), 1);
        let remaining = store.list_recipes().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].fields.recipe_id, "soup");
    }

    #[tokio::test]
    async fn test_ensure_active_dir() {
        let dir = tempfile::tempdir().unwrap();
        let options = MigrationOptions {
            active_dir: dir.path().join("missing"),
            archived_dir: dir.path().join("archived"),
        };
        assert!(matches!(
            options.ensure_active_dir().await,
            Err(CatalogError::MissingContentDir(_))
        ));

        let options = MigrationOptions {
            active_dir: dir.path().to_path_buf(),
            ..options
        };
        assert!(options.ensure_active_dir().await.is_ok());
    }

    #[tokio::test]
    async fn test_unresolved_collection_refs_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("active");
        std::fs::create_dir_all(&active).unwrap();
        std::fs::write(
            active.join("mixed.md"),
            "---\ntitle: Mixed\nrecipes:\n  - id: good\n    name: Good\n  - {}\n---\n",
        )
        .unwrap();

        let store = MemoryStore::new();
        let options = MigrationOptions {
            active_dir: active,
            archived_dir: dir.path().join("archived"),
        };
        let report = run_migration(&store, &options).await.unwrap();

        assert_eq!(report.recipes.created, 1);
        assert_eq!(report.collections.created, 1);
        let collection = store.find_collection_by_title("Mixed").await.unwrap().unwrap();
        assert_eq!(collection.recipes.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_collection_refs_keep_first_position() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("active");
        std::fs::create_dir_all(&active).unwrap();
        std::fs::write(
            active.join("dup.md"),
            "---\ntitle: Dup\nrecipes:\n  - id: r1\n    name: One\n  - id: r2\n    name: Two\n  - id: r1\n---\n",
        )
        .unwrap();

        let store = MemoryStore::new();
        let options = MigrationOptions {
            active_dir: active,
            archived_dir: dir.path().join("archived"),
        };
        run_migration(&store, &options).await.unwrap();

        let one = store.find_recipe_by_recipe_id("r1").await.unwrap().unwrap();
        let two = store.find_recipe_by_recipe_id("r2").await.unwrap().unwrap();
        let collection = store.find_collection_by_title("Dup").await.unwrap().unwrap();
        assert_eq!(collection.recipes, vec![one.id, two.id]);
    }
}
