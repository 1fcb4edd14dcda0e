//! Family tree document types.

use serde::{Deserialize, Serialize};

/// A person in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Person id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Birth date or year, free text.
    #[serde(default)]
    pub born: String,
    /// Death date or year, free text; empty when living.
    #[serde(default)]
    pub died: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Photo URL or data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Person {
    /// Create a person with only an id and a name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            born: String::new(),
            died: String::new(),
            notes: String::new(),
            photo: None,
        }
    }

    /// `born–died`, `born–`, `–died`, or empty.
    #[must_use]
    pub fn lifespan(&self) -> String {
        match (self.born.trim(), self.died.trim()) {
            ("", "") => String::new(),
            (born, died) => format!("{born}–{died}"),
        }
    }
}

/// A family unit: up to two spouses and their children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    /// Family id.
    pub id: String,
    /// Label shown on the family node.
    #[serde(default)]
    pub label: String,
    /// Spouse person ids (0 to 2).
    #[serde(default)]
    pub spouses: Vec<String>,
    /// Child person ids.
    #[serde(default)]
    pub children: Vec<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

impl Family {
    /// Maximum number of spouses in one family unit.
    pub const MAX_SPOUSES: usize = 2;

    /// Create an empty family with the given id and label.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            spouses: Vec::new(),
            children: Vec::new(),
            notes: String::new(),
        }
    }

    /// Set spouses, builder style.
    #[must_use]
    pub fn with_spouses<I, T>(mut self, spouses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.spouses = spouses.into_iter().map(Into::into).collect();
        self
    }

    /// Set children, builder style.
    #[must_use]
    pub fn with_children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }
}

/// Width and height of a person node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

/// Layout parameters for the tree diagram. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Label given to new family units.
    pub family_label_default: String,
    /// Edge stroke width.
    pub edge_width: f64,
    /// Person node size.
    pub node_size_person: NodeSize,
    /// Family node diameter.
    pub node_size_family: f64,
    /// Separation between ranks (generations).
    pub ranksep: f64,
    /// Separation between nodes within a rank.
    pub nodesep: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            family_label_default: "💍".to_string(),
            edge_width: 2.0,
            node_size_person: NodeSize {
                width: 140.0,
                height: 60.0,
            },
            node_size_family: 30.0,
            ranksep: 120.0,
            nodesep: 80.0,
        }
    }
}

/// The whole persisted family tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeData {
    /// People.
    #[serde(default)]
    pub people: Vec<Person>,
    /// Family units.
    #[serde(default)]
    pub families: Vec<Family>,
    /// Layout style.
    #[serde(default)]
    pub style: StyleConfig,
}

impl TreeData {
    /// Find a person by id.
    #[must_use]
    pub fn person(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    /// Find a family by id.
    #[must_use]
    pub fn family(&self, id: &str) -> Option<&Family> {
        self.families.iter().find(|f| f.id == id)
    }

    /// A three-generation sample tree.
    #[must_use]
    pub fn demo() -> Self {
        let person = |id: &str, name: &str, born: &str, died: &str, notes: &str| Person {
            born: born.to_string(),
            died: died.to_string(),
            notes: notes.to_string(),
            ..Person::new(id, name)
        };

        let mut main_line = Family::new("FAM_MARIO_ANNA", "💍 1960")
            .with_spouses(["p1", "p2"])
            .with_children(["p3"]);
        main_line.notes = "Main line".to_string();

        let mut second = Family::new("FAM_LUIGI_ELENA", "💍 1990")
            .with_spouses(["p3", "p4"])
            .with_children(["p5", "p6"]);
        second.notes = "Second generation".to_string();

        Self {
            people: vec![
                person("p1", "Mario Rossi", "1935", "2010", "Grandfather / Nonno"),
                person("p2", "Anna Bianchi", "1938", "", "Grandmother / Nonna"),
                person("p3", "Luigi Rossi", "1965", "", "Father / Padre"),
                person("p4", "Elena Neri", "1968", "", "Mother / Madre"),
                person("p5", "Marco Rossi", "1995", "", "Son / Figlio"),
                person("p6", "Sofia Rossi", "1998", "", "Daughter / Figlia"),
            ],
            families: vec![main_line, second],
            style: StyleConfig::default(),
        }
    }
}
