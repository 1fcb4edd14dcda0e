//! Family tree persistence.
//!
//! The whole tree is one JSON document under [`TREE_KEY`]. Every read goes
//! through [`normalize`], and a repaired document is written straight back.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::storage::{load_json, save_json, KeyValueStore, TREE_KEY};

use super::model::{Family, Person, StyleConfig, TreeData};
use super::normalize::{apply_unique_children, normalize};

/// Family tree operations over a key-value store.
#[derive(Debug)]
pub struct TreeRepository<S> {
    store: S,
    seed_demo_on_empty: bool,
}

impl<S: KeyValueStore> TreeRepository<S> {
    /// Wrap a store. An absent tree loads as empty.
    pub fn new(store: S) -> Self {
        Self {
            store,
            seed_demo_on_empty: false,
        }
    }

    /// Load the demo tree instead of an empty one when nothing is stored.
    #[must_use]
    pub fn with_demo_seed(mut self, seed: bool) -> Self {
        self.seed_demo_on_empty = seed;
        self
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the tree, repairing duplicate child claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read, parsed, or rewritten.
    pub fn load(&self) -> Result<TreeData> {
        let Some(mut tree) = load_json::<TreeData, _>(&self.store, TREE_KEY)? else {
            debug!("No stored tree, seed_demo_on_empty={}", self.seed_demo_on_empty);
            return Ok(if self.seed_demo_on_empty {
                TreeData::demo()
            } else {
                TreeData::default()
            });
        };

        let (families, changed) = normalize(std::mem::take(&mut tree.families));
        tree.families = families;
        if changed {
            warn!("Stored tree had children claimed by several families; repaired");
            self.save(&tree)?;
        }
        Ok(tree)
    }

    /// Persist the whole tree as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn save(&self, tree: &TreeData) -> Result<()> {
        save_json(&self.store, TREE_KEY, tree)?;
        debug!(
            "Saved tree: {} people, {} families",
            tree.people.len(),
            tree.families.len()
        );
        Ok(())
    }

    // === People ===

    /// Insert or replace a person by id.
    ///
    /// # Errors
    ///
    /// Rejects a blank id or name; otherwise returns store errors.
    pub fn upsert_person(&self, person: Person) -> Result<TreeData> {
        if person.id.trim().is_empty() {
            return Err(Error::validation("person id must not be empty"));
        }
        if person.name.trim().is_empty() {
            return Err(Error::validation("person name must not be empty"));
        }

        let mut tree = self.load()?;
        match tree.people.iter_mut().find(|p| p.id == person.id) {
            Some(existing) => *existing = person,
            None => tree.people.push(person),
        }
        self.save(&tree)?;
        Ok(tree)
    }

    /// Remove a person and every reference to them from the families.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id, or a store error.
    pub fn delete_person(&self, id: &str) -> Result<TreeData> {
        let mut tree = self.load()?;
        let before = tree.people.len();
        tree.people.retain(|p| p.id != id);
        if tree.people.len() == before {
            return Err(Error::not_found("person", id));
        }

        for family in &mut tree.families {
            family.spouses.retain(|s| s != id);
            family.children.retain(|c| c != id);
        }
        self.save(&tree)?;
        info!("Deleted person {id}");
        Ok(tree)
    }

    // === Families ===

    /// Insert or replace a family, taking its children away from any other
    /// family. A blank label takes the style's default label.
    ///
    /// # Errors
    ///
    /// Rejects a blank id or more than [`Family::MAX_SPOUSES`] spouses;
    /// otherwise returns store errors.
    pub fn upsert_family(&self, mut family: Family) -> Result<TreeData> {
        if family.id.trim().is_empty() {
            return Err(Error::validation("family id must not be empty"));
        }
        if family.spouses.len() > Family::MAX_SPOUSES {
            return Err(Error::validation(format!(
                "a family has at most {} spouses, got {}",
                Family::MAX_SPOUSES,
                family.spouses.len()
            )));
        }

        let mut tree = self.load()?;
        if family.label.trim().is_empty() {
            family.label.clone_from(&tree.style.family_label_default);
        }
        let id = family.id.clone();
        tree.families = apply_unique_children(std::mem::take(&mut tree.families), family);
        self.save(&tree)?;
        debug!("Saved family {id}");
        Ok(tree)
    }

    /// Remove a family. The people in it are kept.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id, or a store error.
    pub fn delete_family(&self, id: &str) -> Result<TreeData> {
        let mut tree = self.load()?;
        let before = tree.families.len();
        tree.families.retain(|f| f.id != id);
        if tree.families.len() == before {
            return Err(Error::not_found("family", id));
        }
        self.save(&tree)?;
        info!("Deleted family {id}");
        Ok(tree)
    }

    // === Style ===

    /// Replace the layout style.
    ///
    /// # Errors
    ///
    /// Rejects non-positive sizes; otherwise returns store errors.
    pub fn set_style(&self, style: StyleConfig) -> Result<TreeData> {
        validate_style(&style)?;
        let mut tree = self.load()?;
        tree.style = style;
        self.save(&tree)?;
        Ok(tree)
    }

    /// Restore the default layout style.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be read or written.
    pub fn reset_style(&self) -> Result<TreeData> {
        let mut tree = self.load()?;
        tree.style = StyleConfig::default();
        self.save(&tree)?;
        Ok(tree)
    }

    /// Overwrite everything with the demo tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be written.
    pub fn reset_to_demo(&self) -> Result<TreeData> {
        let tree = TreeData::demo();
        self.save(&tree)?;
        info!("Tree reset to demo data");
        Ok(tree)
    }

    // === Import / export ===

    /// The stored tree as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be read or serialized.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.load()?)?)
    }

    /// Replace the stored tree with a JSON document, normalizing it first.
    ///
    /// # Errors
    ///
    /// Returns a JSON error for an unparseable document, a validation error
    /// for an invalid style, or a store error.
    pub fn import_json(&self, text: &str) -> Result<TreeData> {
        let mut tree: TreeData = serde_json::from_str(text)?;
        validate_style(&tree.style)?;
        let (families, changed) = normalize(std::mem::take(&mut tree.families));
        tree.families = families;
        if changed {
            warn!("Imported tree had children claimed by several families; repaired");
        }
        self.save(&tree)?;
        info!(
            "Imported tree: {} people, {} families",
            tree.people.len(),
            tree.families.len()
        );
        Ok(tree)
    }

    /// Write the tree as pretty JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written, or a store error.
    pub fn export_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.export_json()?)?;
        debug!("Wrote tree to {}", path.display());
        Ok(())
    }

    /// Replace the stored tree with the JSON document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise the same
    /// errors as [`Self::import_json`].
    pub fn import_file(&self, path: &Path) -> Result<TreeData> {
        let text = std::fs::read_to_string(path)?;
        self.import_json(&text)
    }
}

fn validate_style(style: &StyleConfig) -> Result<()> {
    let sizes = [
        ("edge_width", style.edge_width),
        ("node_size_person.width", style.node_size_person.width),
        ("node_size_person.height", style.node_size_person.height),
        ("node_size_family", style.node_size_family),
        ("ranksep", style.ranksep),
        ("nodesep", style.nodesep),
    ];
    for (name, value) in sizes {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::validation(format!(
                "style.{name} must be a positive number, got {value}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Storage};

    fn repo() -> TreeRepository<MemoryStore> {
        TreeRepository::new(MemoryStore::new())
    }

    #[test]
    fn test_absent_tree_loads_empty_or_demo() {
        let empty = repo().load().unwrap();
        assert!(empty.people.is_empty());
        assert!(empty.families.is_empty());
        assert_eq!(empty.style, StyleConfig::default());

        let seeded = repo().with_demo_seed(true).load().unwrap();
        assert_eq!(seeded, TreeData::demo());
    }

    #[test]
    fn test_load_repairs_and_persists() {
        crate::logging::init_test_logging();
        let repo = repo();
        let mut tree = TreeData::demo();
        tree.families[1].children.push("p3".to_string());
        repo.save(&tree).unwrap();

        let loaded = repo.load().unwrap();
        assert_eq!(loaded.families[1].children, ["p5", "p6"]);

        let raw = repo.store().load(TREE_KEY).unwrap().unwrap();
        let stored: TreeData = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.families[1].children, ["p5", "p6"]);
    }

    #[test]
    fn test_load_accepts_partial_style() {
        let repo = repo();
        repo.store()
            .save(
                TREE_KEY,
                r#"{"people":[],"families":[],"style":{"ranksep":150}}"#,
            )
            .unwrap();

        let tree = repo.load().unwrap();
        assert!((tree.style.ranksep - 150.0).abs() < f64::EPSILON);
        assert_eq!(tree.style.family_label_default, "💍");
        assert!((tree.style.nodesep - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_upsert_family_moves_child() {
        let repo = repo();
        repo.reset_to_demo().unwrap();

        let tree = repo
            .upsert_family(
                Family::new("F3", "")
                    .with_spouses(["p5"])
                    .with_children(["p6"]),
            )
            .unwrap();

        assert_eq!(tree.family("FAM_LUIGI_ELENA").unwrap().children, ["p5"]);
        let f3 = tree.family("F3").unwrap();
        assert_eq!(f3.children, ["p6"]);
        assert_eq!(f3.label, "💍");
        assert_eq!(repo.load().unwrap(), tree);
    }

    #[test]
    fn test_upsert_family_rejects_three_spouses() {
        let err = repo()
            .upsert_family(Family::new("F", "x").with_spouses(["a", "b", "c"]))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_upsert_person_replaces_by_id() {
        let repo = repo();
        repo.reset_to_demo().unwrap();

        let mut renamed = Person::new("p4", "Elena Rossi");
        renamed.born = "1968".to_string();
        let tree = repo.upsert_person(renamed).unwrap();

        assert_eq!(tree.people.len(), 6);
        assert_eq!(tree.person("p4").unwrap().name, "Elena Rossi");
        assert!(repo
            .upsert_person(Person::new("p9", " "))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_delete_person_strips_references() {
        let repo = repo();
        repo.reset_to_demo().unwrap();

        let tree = repo.delete_person("p3").unwrap();
        assert!(tree.person("p3").is_none());
        assert!(tree.family("FAM_MARIO_ANNA").unwrap().children.is_empty());
        assert_eq!(tree.family("FAM_LUIGI_ELENA").unwrap().spouses, ["p4"]);

        assert!(repo.delete_person("p3").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_family_keeps_people() {
        let repo = repo();
        repo.reset_to_demo().unwrap();

        let tree = repo.delete_family("FAM_MARIO_ANNA").unwrap();
        assert_eq!(tree.families.len(), 1);
        assert_eq!(tree.people.len(), 6);
        assert!(repo.delete_family("FAM_MARIO_ANNA").unwrap_err().is_not_found());
    }

    #[test]
    fn test_style_set_and_reset() {
        let repo = repo();
        let mut style = StyleConfig::default();
        style.ranksep = 200.0;
        assert!((repo.set_style(style).unwrap().style.ranksep - 200.0).abs() < f64::EPSILON);

        let mut bad = StyleConfig::default();
        bad.nodesep = 0.0;
        assert!(repo.set_style(bad).unwrap_err().is_validation());

        assert_eq!(repo.reset_style().unwrap().style, StyleConfig::default());
    }

    #[test]
    fn test_export_import_on_sqlite() {
        let source = TreeRepository::new(Storage::open_in_memory().unwrap());
        source.reset_to_demo().unwrap();
        let json = source.export_json().unwrap();

        let target = TreeRepository::new(Storage::open_in_memory().unwrap());
        let imported = target.import_json(&json).unwrap();
        assert_eq!(imported, TreeData::demo());
        assert_eq!(target.load().unwrap(), imported);
    }

    #[test]
    fn test_import_normalizes_and_rejects_garbage() {
        let repo = repo();
        let doc = r#"{
            "people": [{"id": "a", "name": "A"}],
            "families": [
                {"id": "f1", "children": ["a"]},
                {"id": "f2", "children": ["a"]}
            ]
        }"#;
        let tree = repo.import_json(doc).unwrap();
        assert_eq!(tree.families[0].children, ["a"]);
        assert!(tree.families[1].children.is_empty());

        assert!(matches!(repo.import_json("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_export_import_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");

        let source = repo();
        source.reset_to_demo().unwrap();
        source.export_file(&path).unwrap();

        let target = repo();
        assert_eq!(target.import_file(&path).unwrap(), TreeData::demo());

        let missing = target.import_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
