//! Key normalization and lenient conversion of loosely shaped payloads.
//!
//! Recipe data arrives from YAML frontmatter and from chat API output, and
//! neither source agrees on field names or on whether a list item is a plain
//! string or an object. Everything here turns a `serde_json::Value` into the
//! typed drafts in [`crate::model`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::model::{
    IngredientFields, IngredientRef, InstructionDraft, RecipeDraft, SupermarketPrice, Tag,
};

pub const DEFAULT_CURRENCY: &str = "GBP";

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize_name(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Identity key of an ingredient within one recipe.
pub fn ingredient_key(name: &str, quantity: &str) -> String {
    format!("{}|{}", normalize_name(name), normalize_name(quantity))
}

/// Lower-case ASCII slug with runs of other characters replaced by `-`,
/// truncated to `max_len` characters.
pub fn slugify(value: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    let truncated: String = slug.chars().take(max_len).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Slug for a drafted recipe's name.
///
/// Accents are decomposed and dropped, anything other than ASCII letters,
/// digits, `_`, `-` and whitespace is removed without a separator, and
/// whitespace runs become a single `-`.
pub fn title_slug(value: &str, max_len: usize) -> String {
    let kept: String = value
        .nfkd()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-' || ch.is_whitespace())
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase()
        .chars()
        .take(max_len)
        .collect()
}

/// Accepts RFC 3339, a bare `YYYY-MM-DD` date or a naive `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// First of `keys` holding a non-blank string or a number, as text.
pub fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| scalar_text(value.get(*key)?))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn bool_field(value: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    })
}

fn price_field(value: &Value) -> Option<f64> {
    match value.get("price")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('£').parse().ok(),
        _ => None,
    }
}

fn array_field<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| value.get(*key)?.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn normalize_tag(value: &Value) -> Option<Tag> {
    let name = match value {
        Value::Object(_) => text_field(value, &["name", "title", "label", "id"]),
        other => scalar_text(other),
    }?;
    Some(Tag { name })
}

/// Supermarket entry from `{supermarket|name, price, currency, url|link, image|imageUrl}`.
///
/// Entries without a supermarket name take `unnamed` when given and are
/// dropped otherwise.
pub fn normalize_supermarket(value: &Value, unnamed: Option<&str>) -> Option<SupermarketPrice> {
    if !value.is_object() {
        return None;
    }
    let supermarket = text_field(value, &["supermarket", "name"])
        .or_else(|| unnamed.map(str::to_string))?;

    Some(SupermarketPrice {
        supermarket,
        price: price_field(value),
        currency: text_field(value, &["currency"]).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        url: text_field(value, &["url", "link"]),
        image: text_field(value, &["image", "imageUrl"]),
    })
}

pub fn normalize_supermarkets(values: &[Value], unnamed: Option<&str>) -> Vec<SupermarketPrice> {
    values
        .iter()
        .filter_map(|entry| normalize_supermarket(entry, unnamed))
        .collect()
}

/// Ingredient from a plain string or `{name|title, quantity|amount, is_pantry|isPantry, supermarkets}`.
///
/// Returns `None` when no name can be found.
pub fn normalize_ingredient(value: &Value, unnamed: Option<&str>) -> Option<IngredientFields> {
    match value {
        Value::Object(_) => {
            let name = text_field(value, &["name", "title"])?;
            Some(IngredientFields {
                name,
                quantity: text_field(value, &["quantity", "amount"]).unwrap_or_default(),
                is_pantry: bool_field(value, &["is_pantry", "isPantry"]).unwrap_or(false),
                supermarkets: normalize_supermarkets(array_field(value, &["supermarkets"]), unnamed),
            })
        }
        other => scalar_text(other).map(|name| IngredientFields::named(name, "")),
    }
}

fn normalize_ingredient_ref(value: &Value) -> Option<IngredientRef> {
    match value {
        Value::Object(_) => {
            if let Some(id) = value.get("id").and_then(Value::as_u64) {
                return Some(IngredientRef::Id(id));
            }
            let name = text_field(value, &["name", "title"])?;
            Some(IngredientRef::Name {
                name,
                quantity: text_field(value, &["quantity", "amount"]).unwrap_or_default(),
            })
        }
        other => scalar_text(other).map(|name| IngredientRef::Name {
            name,
            quantity: String::new(),
        }),
    }
}

/// Instruction from a plain string or `{step|text, ingredients_used|ingredients}`.
pub fn normalize_instruction(value: &Value) -> InstructionDraft {
    match value {
        Value::Object(_) => InstructionDraft {
            step: text_field(value, &["step", "text"]),
            ingredients_used: array_field(value, &["ingredients_used", "ingredients"])
                .iter()
                .filter_map(normalize_ingredient_ref)
                .collect(),
        },
        other => InstructionDraft {
            step: scalar_text(other),
            ingredients_used: Vec::new(),
        },
    }
}

fn servings_field(value: &Value) -> Option<u32> {
    match value.get("servings")? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|servings| *servings > 0)
}

/// Build a draft from any recipe-shaped object.
pub fn recipe_draft(value: &Value, unnamed_supermarket: Option<&str>) -> RecipeDraft {
    RecipeDraft {
        recipe_id: value
            .get("recipeId")
            .or_else(|| value.get("id"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        name: text_field(value, &["name"]),
        title: text_field(value, &["title"]),
        description: text_field(value, &["description", "summary"]),
        servings: servings_field(value),
        prep_time: text_field(value, &["prepTime", "preparationTime"]),
        cook_time: text_field(value, &["cookTime", "cookingTime"]),
        image_url: text_field(value, &["imageUrl", "image"]),
        source_url: text_field(value, &["sourceUrl", "url"]),
        prices_estimated_at: text_field(value, &["pricesEstimatedAt"]),
        published_at: text_field(value, &["publishedAt"]),
        tags: array_field(value, &["tags"])
            .iter()
            .filter_map(normalize_tag)
            .collect(),
        supermarkets: normalize_supermarkets(array_field(value, &["supermarkets"]), unnamed_supermarket),
        ingredients: array_field(value, &["ingredients"])
            .iter()
            .filter_map(|ingredient| normalize_ingredient(ingredient, unnamed_supermarket))
            .collect(),
        instructions: array_field(value, &["instructions"])
            .iter()
            .map(normalize_instruction)
            .collect(),
    }
}
