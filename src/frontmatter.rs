//! Markdown collection files with YAML frontmatter.
//!
//! Each file describes one collection and embeds its recipes:
//!
//! ```text
//! ---
//! title: Weeknight
//! order: 1
//! recipes:
//!   - id: r1
//!     name: Chicken Pasta
//!     ingredients: [{name: Chicken, quantity: 200g}]
//! ---
//! Optional markdown body, ignored.
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::error::{CatalogError, Result};
use crate::model::RecipeDraft;
use crate::normalize::{self, slugify, text_field};

/// Maximum length of a slug derived from a recipe name
pub const RECIPE_SLUG_LEN: usize = 50;

/// Supermarket name used for unnamed price entries in content files
pub const UNNAMED_SUPERMARKET: &str = "Unknown";

/// Sort position of collections that do not set one
pub const DEFAULT_ORDER: i64 = 999;

/// A recipe found in a collection file, keyed by its natural id
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeSource {
    pub natural_id: String,
    pub draft: RecipeDraft,
}

/// Collection metadata with recipe references by natural id
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSource {
    pub title: String,
    pub display_title: Option<String>,
    pub description: String,
    pub order: i64,
    pub display_mode: String,
    pub bg_color: String,
    pub dark_mode: bool,
    pub background_image: Option<String>,
    pub featured: bool,
    pub published_at: Option<String>,
    pub recipe_refs: Vec<String>,
    pub archived: bool,
}

/// Result of scanning the content directories
#[derive(Debug, Default)]
pub struct ParsedContent {
    /// Unique recipes in first-seen order
    pub recipes: Vec<RecipeSource>,
    pub collections: Vec<CollectionSource>,
    /// Files that could not be used
    pub skipped: Vec<PathBuf>,
}

impl ParsedContent {
    /// Add recipes whose natural id has not been seen yet.
    fn absorb(&mut self, seen: &mut HashSet<String>, recipes: Vec<RecipeSource>) {
        for recipe in recipes {
            if seen.insert(recipe.natural_id.clone()) {
                self.recipes.push(recipe);
            } else {
                debug!("Recipe '{}' already parsed, keeping first occurrence", recipe.natural_id);
            }
        }
    }
}

/// The body of a leading `---` delimited block, if any.
pub fn extract_frontmatter(content: &str) -> Option<&str> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    // An empty block closes immediately
    if rest.starts_with("---") {
        return Some("");
    }

    let end = rest.find("\n---")?;
    Some(rest[..end].trim_end_matches('\r'))
}

/// Natural id of a recipe entry: its `id`, else a slug of its name.
pub fn natural_id(recipe: &Value) -> Option<String> {
    text_field(recipe, &["id"])
        .map(|id| id.trim().to_string())
        .or_else(|| {
            text_field(recipe, &["name"])
                .map(|name| slugify(&name, RECIPE_SLUG_LEN))
                .filter(|slug| !slug.is_empty())
        })
}

/// Parse one collection file.
pub fn parse_collection_file(
    path: &Path,
    content: &str,
    archived: bool,
) -> Result<(CollectionSource, Vec<RecipeSource>)> {
    let block = extract_frontmatter(content)
        .ok_or_else(|| CatalogError::MissingFrontmatter(path.to_path_buf()))?;

    let yaml: serde_yaml::Value = serde_yaml::from_str(block)?;
    let frontmatter: Value = serde_json::to_value(yaml)?;

    let entries = frontmatter
        .get("recipes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut recipes = Vec::new();
    let mut recipe_refs = Vec::new();
    for entry in entries {
        match natural_id(entry) {
            Some(id) => {
                recipe_refs.push(id.clone());
                recipes.push(RecipeSource {
                    natural_id: id,
                    draft: normalize::recipe_draft(entry, Some(UNNAMED_SUPERMARKET)),
                });
            }
            None => warn!("Recipe without id or name in {}, skipping", path.display()),
        }
    }

    let file_stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut collection = collection_source(&frontmatter, archived);
    if collection.title.is_empty() {
        collection.title = file_stem;
    }
    collection.recipe_refs = recipe_refs;

    Ok((collection, recipes))
}

/// Collection metadata from a frontmatter-shaped object, with defaults for
/// everything absent. `recipe_refs` is left empty.
pub fn collection_source(value: &Value, archived: bool) -> CollectionSource {
    CollectionSource {
        title: text_field(value, &["title"]).unwrap_or_default(),
        display_title: text_field(value, &["displayTitle"]),
        description: text_field(value, &["description"]).unwrap_or_default(),
        order: value.get("order").and_then(Value::as_i64).unwrap_or(DEFAULT_ORDER),
        display_mode: text_field(value, &["displayMode"])
            .unwrap_or_else(|| "standard".to_string()),
        bg_color: text_field(value, &["bgColor"]).unwrap_or_else(|| "#FFF8F0".to_string()),
        dark_mode: value
            .get("darkMode")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        background_image: text_field(value, &["backgroundImage"]),
        featured: value.get("featured").and_then(Value::as_bool) != Some(false),
        published_at: text_field(value, &["publishedAt"]),
        recipe_refs: Vec::new(),
        archived,
    }
}

/// Sorted `.md` files of a directory. A missing directory yields nothing.
async fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "md") {
                    files.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error listing {}: {}", dir.display(), e);
                break;
            }
        }
    }
    files.sort();
    files
}

/// Parse every markdown file under the active and archived directories.
///
/// Unreadable or malformed files are logged and recorded in
/// [`ParsedContent::skipped`]; they never abort the scan.
pub async fn scan_content(active_dir: &Path, archived_dir: &Path) -> ParsedContent {
    let mut parsed = ParsedContent::default();
    let mut seen = HashSet::new();

    let active = markdown_files(active_dir).await;
    let archived = markdown_files(archived_dir).await;
    info!("Found {} markdown files", active.len() + archived.len());

    let files = active
        .into_iter()
        .map(|path| (path, false))
        .chain(archived.into_iter().map(|path| (path, true)));

    for (path, is_archived) in files {
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                error!("Error reading {}: {}", path.display(), e);
                parsed.skipped.push(path);
                continue;
            }
        };

        match parse_collection_file(&path, &content, is_archived) {
            Ok((collection, recipes)) => {
                info!("Parsed {}: {} recipes", path.display(), recipes.len());
                parsed.absorb(&mut seen, recipes);
                parsed.collections.push(collection);
            }
            Err(CatalogError::MissingFrontmatter(_)) => {
                warn!("No frontmatter found in {}, skipping", path.display());
                parsed.skipped.push(path);
            }
            Err(e) => {
                error!("Error processing {}: {}", path.display(), e);
                parsed.skipped.push(path);
            }
        }
    }

    info!(
        "Collections: {}, unique recipes: {}",
        parsed.collections.len(),
        parsed.recipes.len()
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IngredientRef;

    const WEEKNIGHT: &str = r#"---
title: Weeknight
recipes:
  - id: r1
    name: Chicken Pasta
    ingredients:
      - name: Chicken
        quantity: 200g
    instructions:
      - step: Cook chicken
        ingredients_used: [Chicken]
---
Body text
"#;

    #[test]
    fn test_extract_frontmatter() {
        assert_eq!(extract_frontmatter("---\na: 1\n---\nbody"), Some("a: 1"));
        assert_eq!(extract_frontmatter("---\r\na: 1\r\n---\r\n"), Some("a: 1"));
        assert_eq!(extract_frontmatter("---\n---\n"), Some(""));
        assert_eq!(extract_frontmatter("no block here"), None);
        assert_eq!(extract_frontmatter("---\nunterminated"), None);
        assert_eq!(extract_frontmatter("\n---\na: 1\n---"), None);
    }

    #[test]
    fn test_parse_collection_file() {
        let (collection, recipes) =
            parse_collection_file(Path::new("weeknight.md"), WEEKNIGHT, false).unwrap();

        assert_eq!(collection.title, "Weeknight");
        assert_eq!(collection.order, 999);
        assert_eq!(collection.display_mode, "standard");
        assert_eq!(collection.bg_color, "#FFF8F0");
        assert!(collection.featured);
        assert!(!collection.dark_mode);
        assert_eq!(collection.recipe_refs, vec!["r1"]);

        assert_eq!(recipes.len(), 1);
        let draft = &recipes[0].draft;
        assert_eq!(draft.name.as_deref(), Some("Chicken Pasta"));
        assert_eq!(draft.ingredients[0].quantity, "200g");
        assert_eq!(
            draft.instructions[0].ingredients_used,
            vec![IngredientRef::Name { name: "Chicken".into(), quantity: String::new() }]
        );
    }

    #[test]
    fn test_title_defaults_to_file_stem() {
        let content = "---\nfeatured: false\norder: 2\nrecipes:\n  - name: Beef Stew\n---\n";
        let (collection, recipes) =
            parse_collection_file(Path::new("/tmp/winter-warmers.md"), content, true).unwrap();

        assert_eq!(collection.title, "winter-warmers");
        assert!(!collection.featured);
        assert!(collection.archived);
        assert_eq!(collection.order, 2);
        assert_eq!(recipes[0].natural_id, "beef-stew");
    }

    #[test]
    fn test_missing_frontmatter_is_reported() {
        let result = parse_collection_file(Path::new("plain.md"), "# Just markdown", false);
        assert!(matches!(result, Err(CatalogError::MissingFrontmatter(_))));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let result = parse_collection_file(Path::new("bad.md"), "---\ntitle: [unclosed\n---\n", false);
        assert!(matches!(result, Err(CatalogError::YamlError(_))));
    }

    #[tokio::test]
    async fn test_scan_content_first_occurrence_wins() {
        let root = tempfile::tempdir().unwrap();
        let active = root.path().join("active");
        let archived = root.path().join("archived");
        std::fs::create_dir_all(&active).unwrap();
        std::fs::create_dir_all(&archived).unwrap();

        std::fs::write(active.join("a.md"), "---\ntitle: A\nrecipes:\n  - id: r1\n    name: First\n---\n").unwrap();
        std::fs::write(archived.join("b.md"), "---\ntitle: B\nrecipes:\n  - id: r1\n    name: Second\n---\n").unwrap();
        std::fs::write(active.join("notes.txt"), "ignored").unwrap();
        std::fs::write(active.join("broken.md"), "no frontmatter").unwrap();

        let parsed = scan_content(&active, &archived).await;

        assert_eq!(parsed.collections.len(), 2);
        assert_eq!(parsed.recipes.len(), 1);
        assert_eq!(parsed.recipes[0].draft.name.as_deref(), Some("First"));
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.collections[1].recipe_refs, vec!["r1"]);
    }

    #[tokio::test]
    async fn test_scan_content_missing_dirs() {
        let root = tempfile::tempdir().unwrap();
        let parsed = scan_content(&root.path().join("nope"), &root.path().join("nada")).await;
        assert!(parsed.collections.is_empty());
        assert!(parsed.recipes.is_empty());
    }
}
