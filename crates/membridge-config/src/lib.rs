//! # membridge-config
//!
//! Config resolution for the memory-bridge subsystem, grounded in the
//! host's own settings loader: compiled defaults, deep-merged JSON file
//! override, then environment-variable overrides, with zero/negative
//! numeric fields normalized back to their documented default.
//!
//! This subsystem owns its own config resolution end to end — it does not
//! assume the host hands it a fully-formed config.

#![deny(unsafe_code)]

pub mod loader;
pub mod types;

pub use loader::{config_path, load_config, load_config_from_path};
pub use types::{
    CommitConfig, CommitMode, CommitTriggers, FsWriteConfig, MemoryConfig,
    RelationPriorityBoost, ReadLayer, SearchConfig, SearchStrategy,
};
