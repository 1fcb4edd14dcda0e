//! Relationship lookups over the family list.

use super::model::{Person, TreeData};

/// The immediate relatives of one person.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Relations<'a> {
    /// Spouses of every family that lists the person as a child.
    pub parents: Vec<&'a Person>,
    /// Co-spouses from every family the person is a spouse in.
    pub spouses: Vec<&'a Person>,
    /// Children of every family the person is a spouse in.
    pub children: Vec<&'a Person>,
}

impl Relations<'_> {
    /// `true` if the person has no known relatives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.spouses.is_empty() && self.children.is_empty()
    }
}

/// Collect parents, spouses and children of `person_id`.
///
/// Ids that do not resolve to a person are skipped. Each list keeps the order
/// in which ids are first seen and holds no duplicates.
#[must_use]
pub fn relations_of<'a>(tree: &'a TreeData, person_id: &str) -> Relations<'a> {
    let mut parent_ids: Vec<&str> = Vec::new();
    let mut spouse_ids: Vec<&str> = Vec::new();
    let mut child_ids: Vec<&str> = Vec::new();

    for family in &tree.families {
        if family.children.iter().any(|c| c == person_id) {
            push_unique(&mut parent_ids, family.spouses.iter().map(String::as_str));
        }
        if family.spouses.iter().any(|s| s == person_id) {
            push_unique(
                &mut spouse_ids,
                family
                    .spouses
                    .iter()
                    .map(String::as_str)
                    .filter(|s| *s != person_id),
            );
            push_unique(&mut child_ids, family.children.iter().map(String::as_str));
        }
    }

    Relations {
        parents: resolve(tree, &parent_ids),
        spouses: resolve(tree, &spouse_ids),
        children: resolve(tree, &child_ids),
    }
}

fn push_unique<'a>(into: &mut Vec<&'a str>, ids: impl Iterator<Item = &'a str>) {
    for id in ids {
        if !into.contains(&id) {
            into.push(id);
        }
    }
}

fn resolve<'a>(tree: &'a TreeData, ids: &[&str]) -> Vec<&'a Person> {
    ids.iter().filter_map(|id| tree.person(id)).collect()
}
