//! Shared types, settings, and persistence contract for rallycounter.
//!
//! This crate contains everything the detection and session crates agree on:
//! the settings snapshot taken at detection start, the persisted score and
//! stat records, and the JSON key-value store the surrounding application
//! injects.

pub mod error;
pub mod score;
pub mod settings;
pub mod store;

pub use error::CoreError;
pub use score::{ScoreRecord, SessionKind, Stats};
pub use settings::{DetectionConfig, Settings};
pub use store::{KeyValueStore, MemoryStore};

/// Storage key for the persisted settings object.
pub const SETTINGS_KEY: &str = "rallycounter-settings";
/// Storage key for the persisted high-score list.
pub const SCORES_KEY: &str = "rallycounter-scores";
/// Storage key for the persisted running statistics.
pub const STATS_KEY: &str = "rallycounter-stats";
