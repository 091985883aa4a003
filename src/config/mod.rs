//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, one table per adapter key)
//!     → loader.rs (parse, keep entries raw until fetched)
//!     → source.rs fetch(key)
//!         → merge.rs (fill absent fields from "config.adapter.common.v1")
//!         → fingerprint.rs (SHA-256 of canonical JSON)
//!         → change.rs (compare with last fingerprint for key)
//!     → ConfigSnapshot { key, properties, refresh }
//!     → client manager decides whether to rebuild
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs re-reads the document
//!     → atomic swap of the document
//!     → next fetch sees new content and reports refresh = true
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable values built fresh on every fetch
//! - All fields have defaults to allow minimal configs
//! - Zero values mean "absent" for merge purposes
//! - Validation separates syntactic (serde) from semantic checks

pub mod change;
pub mod error;
pub mod fingerprint;
pub mod loader;
pub mod merge;
pub mod schema;
pub mod source;
pub mod validation;
pub mod watcher;

pub use change::{ChangeDetector, ChangeStatus};
pub use error::{ConfigError, ConfigResult};
pub use fingerprint::fingerprint;
pub use loader::{ConfigDocument, FileConfigStore, PropertyStore};
pub use merge::{merge_if_absent, Patch};
pub use schema::{AdapterProperties, Auth, BearerCredentials, HttpSettings, COMMON_CONFIG_KEY};
pub use source::{ConfigSnapshot, ConfigSource, MergingConfigSource, StaticConfigSource};
pub use watcher::ConfigWatcher;
