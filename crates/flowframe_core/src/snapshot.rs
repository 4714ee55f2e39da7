//! Snapshot manager.
//!
//! # Responsibility
//! - Capture named, timestamped copies of theme, density, modules and
//!   relationships.
//! - Restore a snapshot into live state and remove snapshots.
//!
//! # Invariants
//! - Snapshots are never mutated after creation; apply copies out of them.
//! - Snapshot list is most recent first.
//! - Applied relationships are re-cleaned against the restored modules.

use crate::dashboard::Dashboard;
use crate::model::id::{EntityId, IdLedger};
use crate::model::state::{Snapshot, SnapshotState};
use crate::store::StateStore;
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use std::fmt::Display;

/// Default snapshot name, e.g. `Snapshot Oct 14 09:30`.
pub fn suggest_snapshot_name<Tz>(at: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("Snapshot {}", at.format("%b %-d %H:%M"))
}

impl<S: StateStore> Dashboard<S> {
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.state.snapshots
    }

    /// Captures the live state under `name` and prepends it.
    ///
    /// Blank names fall back to `suggest_snapshot_name` for the local time.
    pub fn save_snapshot(&mut self, name: &str) -> Snapshot {
        let created = Utc::now();
        let name = match name.trim() {
            "" => suggest_snapshot_name(created.with_timezone(&chrono::Local)),
            trimmed => trimmed.to_string(),
        };
        let snapshot = Snapshot {
            id: EntityId::generate(),
            name,
            created_at: created.timestamp_millis(),
            state: SnapshotState {
                theme: self.state.theme.clone(),
                density: self.state.density,
                modules: self.state.modules.clone(),
                relationships: self.state.relationships.clone(),
            },
        };
        self.state.snapshots.insert(0, snapshot.clone());
        info!(
            "event=snapshot_save module=snapshot status=ok snapshot_id={} modules={} links={}",
            snapshot.id,
            snapshot.state.modules.len(),
            snapshot.state.relationships.link_count()
        );
        self.persist();
        self.render();
        snapshot
    }

    /// Copies a snapshot back into live state.
    ///
    /// Returns `false` (and does nothing) when `snapshot_id` is unknown.
    pub fn apply_snapshot(&mut self, snapshot_id: &EntityId) -> bool {
        let Some(snapshot) = self.state.snapshot(snapshot_id) else {
            info!("event=snapshot_apply module=snapshot status=skipped reason=snapshot_missing snapshot_id={snapshot_id}");
            return false;
        };
        let restored = snapshot.state.clone();

        self.state.theme = restored.theme;
        self.state.density = restored.density;
        self.state.modules = restored.modules;
        self.state.relationships = restored.relationships;
        self.normalize_restored_modules();
        let removed = self.cleanup_relationships();

        info!(
            "event=snapshot_apply module=snapshot status=ok snapshot_id={} modules={} links_removed={}",
            snapshot_id,
            self.state.modules.len(),
            removed
        );
        self.persist();
        self.render();
        true
    }

    /// Deletes one snapshot. Live state is untouched.
    pub fn remove_snapshot(&mut self, snapshot_id: &EntityId) -> bool {
        let before = self.state.snapshots.len();
        self.state
            .snapshots
            .retain(|snapshot| &snapshot.id != snapshot_id);
        if self.state.snapshots.len() == before {
            return false;
        }
        info!("event=snapshot_remove module=snapshot status=ok snapshot_id={snapshot_id}");
        self.persist();
        self.render();
        true
    }

    /// Drops unregistered modules and re-runs per-type normalization.
    fn normalize_restored_modules(&mut self) {
        let registry = &self.registry;
        self.state
            .modules
            .retain(|module| registry.contains(module.kind));
        let mut ids = IdLedger::new();
        for module in &mut self.state.modules {
            module.id = ids.claim_existing(&module.id);
            if let Some(definition) = registry.get(module.kind) {
                definition.normalize(&mut module.data, &mut ids);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::suggest_snapshot_name;
    use chrono::{TimeZone, Utc};

    #[test]
    fn suggested_name_uses_month_day_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 10, 4, 9, 5, 0).unwrap();
        assert_eq!(suggest_snapshot_name(at), "Snapshot Oct 4 09:05");
    }
}
