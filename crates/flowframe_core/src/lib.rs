//! Core domain logic for the FlowFrame dashboard.
//! This crate is the single source of truth for state invariants.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod registry;
pub mod sanitize;
pub mod snapshot;
pub mod store;

pub use config::{default_log_level, ConfigError, CoreConfig, LogLevel};
pub use dashboard::{Dashboard, MutationOutcome, MutatorError, RelatedItem, RenderHook};
pub use graph::{RelationshipChange, RelationshipGraph};
pub use logging::{init_from_config, init_logging, logging_status};
pub use model::id::{EntityId, IdLedger};
pub use model::item::{Client, ItemAccess, JournalEntry, Note, Project, ProjectStatus, Task};
pub use model::module::{Module, ModuleData, ModuleType};
pub use model::state::{DashboardState, Palette, Snapshot, SnapshotState, ThemeKey};
pub use registry::{ModuleDefinition, ModuleRegistry, RegistryError};
pub use sanitize::{default_state, sanitize_blob, sanitize_value};
pub use snapshot::suggest_snapshot_name;
pub use store::{
    MemoryStateStore, SqliteStateStore, StateStore, StoreError, StoreResult, STORAGE_KEY,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
