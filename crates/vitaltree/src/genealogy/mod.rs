//! Family tree editor: people, family units, and layout style.

pub mod model;
pub mod normalize;
pub mod relations;
mod repository;

pub use model::{Family, NodeSize, Person, StyleConfig, TreeData};
pub use normalize::{apply_unique_children, normalize};
pub use relations::{relations_of, Relations};
pub use repository::TreeRepository;

/// Display the lifespan of a person as `born–died`, `born–`, or nothing.
#[must_use]
pub fn lifespan(person: &Person) -> String {
    person.lifespan()
}
