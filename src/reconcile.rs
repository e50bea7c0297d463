//! Ingredient reconciliation.
//!
//! The persisted ingredient set of a recipe is replaced by key: an incoming
//! ingredient whose `name|quantity` key matches an existing row reuses that
//! row, everything else is created, and rows whose key is no longer present
//! are deleted. A quantity edit therefore shows up as one create plus one
//! delete, not as an update.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::model::{EntityId, Ingredient, IngredientFields};
use crate::normalize::{ingredient_key, normalize_name};
use crate::store::EntityStore;

/// Counts of what one reconciliation did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl ReconcileStats {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }

    pub fn add(&mut self, other: &ReconcileStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.deleted += other.deleted;
    }
}

/// Ingredient ids of one recipe, addressable by exact key or bare name
#[derive(Debug, Clone, Default)]
pub struct IngredientLookup {
    by_key: HashMap<String, EntityId>,
    by_name: HashMap<String, Vec<EntityId>>,
    ids: HashSet<EntityId>,
}

impl IngredientLookup {
    pub fn from_ingredients(ingredients: &[Ingredient]) -> Self {
        let mut lookup = Self::default();
        for ingredient in ingredients {
            lookup.register(ingredient.id, &ingredient.fields.name, &ingredient.fields.quantity);
        }
        lookup
    }

    pub fn register(&mut self, id: EntityId, name: &str, quantity: &str) {
        self.by_key.entry(ingredient_key(name, quantity)).or_insert(id);
        self.by_name.entry(normalize_name(name)).or_default().push(id);
        self.ids.insert(id);
    }

    /// Exact `name|quantity` match first, then the first id registered under the name.
    pub fn resolve(&self, name: &str, quantity: &str) -> Option<EntityId> {
        self.by_key
            .get(&ingredient_key(name, quantity))
            .copied()
            .or_else(|| {
                self.by_name
                    .get(&normalize_name(name))
                    .and_then(|ids| ids.first().copied())
            })
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One step of a reconciliation plan
#[derive(Debug, Clone, PartialEq)]
pub enum IngredientChange {
    Create(IngredientFields),
    Update { id: EntityId, fields: IngredientFields },
    Keep { id: EntityId, fields: IngredientFields },
    Delete(EntityId),
}

/// Diff `existing` rows against `incoming` ingredients.
///
/// Incoming entries without a name are ignored and repeated keys collapse
/// onto their first occurrence. When several existing rows share a key the
/// first one is reused and the others are deleted. Creates, updates and
/// keeps come in incoming order, deletes last.
pub fn plan(existing: &[Ingredient], incoming: &[IngredientFields]) -> Vec<IngredientChange> {
    let mut existing_by_key: HashMap<String, &Ingredient> = HashMap::new();
    let mut changes = Vec::new();
    let mut duplicates = Vec::new();

    for ingredient in existing {
        let key = ingredient_key(&ingredient.fields.name, &ingredient.fields.quantity);
        if existing_by_key.contains_key(&key) {
            duplicates.push(ingredient.id);
        } else {
            existing_by_key.insert(key, ingredient);
        }
    }

    let mut kept_keys = HashSet::new();
    for fields in incoming {
        if fields.name.trim().is_empty() {
            continue;
        }
        let key = ingredient_key(&fields.name, &fields.quantity);
        if !kept_keys.insert(key.clone()) {
            debug!("Duplicate ingredient '{}' ignored", key);
            continue;
        }

        let change = match existing_by_key.get(&key) {
            Some(current) if current.fields == *fields => IngredientChange::Keep {
                id: current.id,
                fields: fields.clone(),
            },
            Some(current) => IngredientChange::Update {
                id: current.id,
                fields: fields.clone(),
            },
            None => IngredientChange::Create(fields.clone()),
        };
        changes.push(change);
    }

    let mut deletes: Vec<EntityId> = existing_by_key
        .iter()
        .filter(|(key, _)| !kept_keys.contains(*key))
        .map(|(_, ingredient)| ingredient.id)
        .chain(duplicates)
        .collect();
    deletes.sort_unstable();
    changes.extend(deletes.into_iter().map(IngredientChange::Delete));

    changes
}

/// Outcome of reconciling one recipe's ingredients
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    pub stats: ReconcileStats,
    /// Ids of the surviving ingredients, for linking instructions
    pub lookup: IngredientLookup,
}

/// Make the stored ingredients of `recipe` match `incoming` exactly.
pub async fn reconcile_ingredients(
    store: &dyn EntityStore,
    recipe: EntityId,
    incoming: &[IngredientFields],
) -> Result<Reconciled> {
    let existing = store.list_ingredients(recipe).await?;
    let mut reconciled = Reconciled::default();

    for change in plan(&existing, incoming) {
        match change {
            IngredientChange::Keep { id, fields } => {
                reconciled.lookup.register(id, &fields.name, &fields.quantity);
                reconciled.stats.unchanged += 1;
            }
            IngredientChange::Update { id, fields } => {
                let updated = store.update_ingredient(id, fields).await?;
                reconciled
                    .lookup
                    .register(updated.id, &updated.fields.name, &updated.fields.quantity);
                reconciled.stats.updated += 1;
            }
            IngredientChange::Create(fields) => {
                let created = store.create_ingredient(recipe, fields).await?;
                reconciled
                    .lookup
                    .register(created.id, &created.fields.name, &created.fields.quantity);
                reconciled.stats.created += 1;
            }
            IngredientChange::Delete(id) => {
                store.delete_ingredient(id).await?;
                reconciled.stats.deleted += 1;
            }
        }
    }

    debug!("Reconciled ingredients of recipe {}: {:?}", recipe, reconciled.stats);
    Ok(reconciled)
}
