//! `vitaltree` - Local-first health vitals tracker and family tree editor
//!
//! Two small applications share one key-value store:
//!
//! - [`health`]: profiles, vital sign readings, sharing by email, CSV export,
//!   and AI-written trend summaries through [`insight`].
//! - [`genealogy`]: people, family units, layout style, and the
//!   one-family-per-child rule.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod genealogy;
pub mod health;
pub mod insight;
pub mod logging;
pub mod storage;
pub mod view;

pub use config::Config;
pub use error::{Error, Result};
pub use genealogy::{TreeData, TreeRepository};
pub use health::HealthRepository;
pub use insight::{GeminiClient, InsightOutcome, InsightProvider, InsightService};
pub use logging::init_logging;
pub use storage::{KeyValueStore, MemoryStore, Storage, StorageStats};
pub use view::{HealthView, TreeView};
