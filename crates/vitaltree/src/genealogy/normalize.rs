//! The one-family-per-child rule.
//!
//! A person id may appear in the `children` of at most one family across the
//! whole document. [`normalize`] repairs stored data (earliest family wins);
//! [`apply_unique_children`] enforces the rule on every family write (the
//! written family wins).

use std::collections::HashSet;

use tracing::debug;

use super::model::Family;

/// Strip from each family any child already claimed by an earlier family.
///
/// Returns the repaired list and whether anything was removed. Idempotent:
/// normalizing the output again reports no change.
#[must_use]
pub fn normalize(mut families: Vec<Family>) -> (Vec<Family>, bool) {
    let mut claimed: HashSet<String> = HashSet::new();
    let mut changed = false;

    for family in &mut families {
        let before = family.children.len();
        family.children.retain(|child| !claimed.contains(child));
        if family.children.len() != before {
            debug!(
                "Removed {} already-claimed children from family {}",
                before - family.children.len(),
                family.id
            );
            changed = true;
        }
        claimed.extend(family.children.iter().cloned());
    }

    (families, changed)
}

/// Insert or replace `edited` by id, then remove its children from every
/// other family. Other families keep their order and all other fields.
#[must_use]
pub fn apply_unique_children(families: Vec<Family>, edited: Family) -> Vec<Family> {
    let taken: HashSet<&str> = edited.children.iter().map(String::as_str).collect();
    let mut replaced = false;

    let mut result: Vec<Family> = families
        .into_iter()
        .map(|mut family| {
            if family.id == edited.id {
                replaced = true;
                return edited.clone();
            }
            family
                .children
                .retain(|child| !taken.contains(child.as_str()));
            family
        })
        .collect();

    if !replaced {
        result.push(edited);
    }
    result
}
