use log::debug;

use crate::model::{IngredientRef, Instruction, InstructionDraft};
use crate::reconcile::IngredientLookup;

/// Resolve instruction ingredient references to ingredient ids of the same recipe.
///
/// Names go through [`IngredientLookup::resolve`]; ids are kept only when
/// they belong to the recipe. Anything unresolved is dropped. Steps without
/// text become `Step {n}`.
pub fn link_instructions(drafts: &[InstructionDraft], lookup: &IngredientLookup) -> Vec<Instruction> {
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let ingredients_used = draft
                .ingredients_used
                .iter()
                .filter_map(|reference| {
                    let resolved = match reference {
                        IngredientRef::Id(id) => Some(*id).filter(|id| lookup.contains(*id)),
                        IngredientRef::Name { name, quantity } => lookup.resolve(name, quantity),
                    };
                    if resolved.is_none() {
                        debug!("Dropping unresolved ingredient reference {:?}", reference);
                    }
                    resolved
                })
                .collect();

            Instruction {
                step: draft
                    .step
                    .clone()
                    .unwrap_or_else(|| format!("Step {}", index + 1)),
                ingredients_used,
            }
        })
        .collect()
}
