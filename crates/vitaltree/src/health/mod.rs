//! Health vitals tracker: profiles, readings, sharing, and export.

pub mod accessors;
pub mod age;
pub mod export;
pub mod model;
mod repository;

pub use age::{age, age_in_year};
pub use export::{export_csv, export_file_name, write_csv_file};
pub use model::{Gender, HealthProfile, NewProfile, NewRecord, User, VitalRecord};
pub use repository::HealthRepository;
