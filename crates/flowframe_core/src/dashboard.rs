//! Owned dashboard context and mutation pipeline.
//!
//! # Responsibility
//! - Own the live `DashboardState`, the registry and the state store.
//! - Route every module change through one copy-on-write pipeline:
//!   clone, mutate, validate, commit, cleanup relationships, persist, render.
//! - Expose structural module operations, preferences and relationship ops.
//!
//! # Invariants
//! - A rejected mutation leaves live state untouched.
//! - After every committed change the relationship graph only references live
//!   linkable items.
//! - Persistence failures are logged; in-memory state stays authoritative.
//!
//! # See also
//! - `snapshot` for save/apply/remove.

use crate::graph::RelationshipChange;
use crate::model::id::{EntityId, IdLedger};
use crate::model::module::{Module, ModuleType};
use crate::model::state::{DashboardState, Palette, ThemeKey};
use crate::registry::ModuleRegistry;
use crate::sanitize::{default_state, density_from_f64, sanitize_blob};
use crate::store::StateStore;
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Presentation callback fired after user-visible changes.
pub type RenderHook = Box<dyn FnMut(&DashboardState)>;

/// Reasons a module mutation was not committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutatorError {
    /// Mutator refused the change.
    Rejected(String),
    /// Mutator replaced the module id.
    IdentityChanged,
    /// Mutator changed the module type or swapped in data of another type.
    KindChanged {
        expected: ModuleType,
        actual: ModuleType,
    },
    /// Module type has no registered definition.
    UnregisteredType(ModuleType),
}

impl MutatorError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "mutator_rejected",
            Self::IdentityChanged => "module_id_changed",
            Self::KindChanged { .. } => "module_type_changed",
            Self::UnregisteredType(_) => "module_type_unregistered",
        }
    }
}

impl Display for MutatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "mutation rejected: {reason}"),
            Self::IdentityChanged => write!(f, "mutation must not change the module id"),
            Self::KindChanged { expected, actual } => write!(
                f,
                "mutation must not change module type {} to {}",
                expected.as_str(),
                actual.as_str()
            ),
            Self::UnregisteredType(kind) => {
                write!(f, "module type is not registered: {}", kind.as_str())
            }
        }
    }
}

impl Error for MutatorError {}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Change committed and persisted. `rendered` reports whether a render
    /// hook was invoked.
    Applied { rendered: bool },
    /// No module with the requested id; nothing happened.
    ModuleMissing,
    /// Mutator or validator refused the change; live state untouched.
    Rejected(MutatorError),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Live descriptor of an item linked to another item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedItem {
    pub module_id: EntityId,
    pub module_type: ModuleType,
    pub module_label: String,
    pub item_id: EntityId,
    pub title: String,
    pub subtitle: String,
}

/// Single-threaded owned dashboard context.
pub struct Dashboard<S: StateStore> {
    pub(crate) state: DashboardState,
    pub(crate) registry: ModuleRegistry,
    pub(crate) store: S,
    render_hook: Option<RenderHook>,
}

impl<S: StateStore> Dashboard<S> {
    /// Loads state from `store` and sanitizes it.
    ///
    /// Read failures fall back to the default state.
    pub fn load(registry: ModuleRegistry, store: S) -> Self {
        let started_at = Instant::now();
        let (state, source) = match store.get() {
            Ok(Some(blob)) => (sanitize_blob(Some(blob.as_str()), &registry), "stored"),
            Ok(None) => (default_state(&registry), "default"),
            Err(err) => {
                warn!(
                    "event=state_load module=dashboard status=error error_code=store_read_failed error={err}"
                );
                (default_state(&registry), "default")
            }
        };
        info!(
            "event=state_load module=dashboard status=ok source={} modules={} snapshots={} links={} duration_ms={}",
            source,
            state.modules.len(),
            state.snapshots.len(),
            state.relationships.link_count(),
            started_at.elapsed().as_millis()
        );
        Self::from_parts(registry, store, state)
    }

    /// Wraps an explicit state. Relationships are re-cleaned against it.
    pub fn with_state(registry: ModuleRegistry, store: S, state: DashboardState) -> Self {
        let mut dashboard = Self::from_parts(registry, store, state);
        dashboard.cleanup_relationships();
        dashboard
    }

    fn from_parts(registry: ModuleRegistry, store: S, state: DashboardState) -> Self {
        Self {
            state,
            registry,
            store,
            render_hook: None,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_render_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&DashboardState) + 'static,
    {
        self.render_hook = Some(Box::new(hook));
    }

    pub fn clear_render_hook(&mut self) {
        self.render_hook = None;
    }

    /// Runs the pipeline and signals a render on commit.
    pub fn mutate_and_notify<F>(&mut self, module_id: &EntityId, mutator: F) -> MutationOutcome
    where
        F: FnOnce(&mut Module) -> Result<(), MutatorError>,
    {
        self.mutate(module_id, mutator, true)
    }

    /// Runs the pipeline without a render signal; still persists.
    pub fn mutate_quietly<F>(&mut self, module_id: &EntityId, mutator: F) -> MutationOutcome
    where
        F: FnOnce(&mut Module) -> Result<(), MutatorError>,
    {
        self.mutate(module_id, mutator, false)
    }

    fn mutate<F>(&mut self, module_id: &EntityId, mutator: F, notify: bool) -> MutationOutcome
    where
        F: FnOnce(&mut Module) -> Result<(), MutatorError>,
    {
        let Some(index) = self.state.module_index(module_id) else {
            info!("event=module_mutate module=dashboard status=skipped reason=module_missing module_id={module_id}");
            return MutationOutcome::ModuleMissing;
        };

        let mut draft = self.state.modules[index].clone();
        let validated = mutator(&mut draft).and_then(|()| self.validate_draft(index, &mut draft));
        if let Err(err) = validated {
            warn!(
                "event=module_mutate module=dashboard status=rejected module_id={} error_code={}",
                module_id,
                err.code()
            );
            return MutationOutcome::Rejected(err);
        }

        self.state.modules[index] = draft;
        self.cleanup_relationships();
        self.persist();
        let rendered = notify && self.render();
        info!(
            "event=module_mutate module=dashboard status=ok module_id={module_id} rendered={rendered}"
        );
        MutationOutcome::Applied { rendered }
    }

    /// Checks identity and type, then normalizes the draft in place.
    fn validate_draft(&self, index: usize, draft: &mut Module) -> Result<(), MutatorError> {
        let original = &self.state.modules[index];
        if draft.id != original.id {
            return Err(MutatorError::IdentityChanged);
        }
        for actual in [draft.kind, draft.data.kind()] {
            if actual != original.kind {
                return Err(MutatorError::KindChanged {
                    expected: original.kind,
                    actual,
                });
            }
        }
        let definition = self
            .registry
            .get(draft.kind)
            .ok_or(MutatorError::UnregisteredType(draft.kind))?;

        let mut ids = IdLedger::new();
        for (position, module) in self.state.modules.iter().enumerate() {
            if position == index {
                continue;
            }
            ids.claim_existing(&module.id);
            for record in module.data.records() {
                ids.claim_existing(record.id());
            }
        }
        ids.claim_existing(&draft.id);
        definition.normalize(&mut draft.data, &mut ids);
        draft.name = draft.name.trim().to_string();
        Ok(())
    }

    /// Appends a module of `kind` with default data.
    ///
    /// Returns the new module id, or `None` for unregistered types.
    pub fn add_module(&mut self, kind: ModuleType) -> Option<EntityId> {
        let module = self.registry.create_module(kind)?;
        let module_id = module.id.clone();
        self.state.modules.push(module);
        info!(
            "event=module_add module=dashboard status=ok module_id={} module_type={}",
            module_id,
            kind.as_str()
        );
        self.commit_structural();
        Some(module_id)
    }

    /// Removes a module and every relationship touching its items.
    pub fn remove_module(&mut self, module_id: &EntityId) -> bool {
        let Some(index) = self.state.module_index(module_id) else {
            return false;
        };
        self.state.modules.remove(index);
        info!("event=module_remove module=dashboard status=ok module_id={module_id}");
        self.commit_structural();
        true
    }

    /// Sets the display override; blank names restore the definition label.
    pub fn rename_module(&mut self, module_id: &EntityId, name: &str) -> bool {
        let name = name.trim().to_string();
        self.mutate_and_notify(module_id, move |module| {
            module.name = name;
            Ok(())
        })
        .is_applied()
    }

    /// Moves a module by `offset` positions. Out-of-range moves are no-ops.
    pub fn reorder_module(&mut self, module_id: &EntityId, offset: isize) -> bool {
        let Some(index) = self.state.module_index(module_id) else {
            return false;
        };
        let Some(target) = index.checked_add_signed(offset) else {
            return false;
        };
        if offset == 0 || target >= self.state.modules.len() {
            return false;
        }
        let module = self.state.modules.remove(index);
        self.state.modules.insert(target, module);
        self.commit_structural();
        true
    }

    /// Places a module before `before`, or at the end when `before` is `None`.
    ///
    /// Unknown ids and placements that keep the order are no-ops.
    pub fn move_module(&mut self, module_id: &EntityId, before: Option<&EntityId>) -> bool {
        if before == Some(module_id) {
            return false;
        }
        let Some(index) = self.state.module_index(module_id) else {
            return false;
        };
        if let Some(before) = before {
            if self.state.module_index(before).is_none() {
                return false;
            }
        }

        let module = self.state.modules.remove(index);
        let target = before
            .and_then(|before| self.state.module_index(before))
            .unwrap_or(self.state.modules.len());
        self.state.modules.insert(target, module);
        if target == index {
            return false;
        }
        self.commit_structural();
        true
    }

    /// Sets one palette color. Invalid hex values are ignored.
    pub fn set_theme_color(&mut self, key: ThemeKey, value: &str) -> bool {
        if !self.state.theme.set(key, value) {
            return false;
        }
        self.commit_preferences();
        true
    }

    pub fn restore_palette(&mut self) {
        self.state.theme = Palette::default();
        self.commit_preferences();
    }

    /// Sets layout density; non-positive and non-finite values are ignored.
    pub fn set_density(&mut self, value: f64) -> bool {
        let Some(density) = density_from_f64(value) else {
            return false;
        };
        self.state.density = density;
        self.commit_preferences();
        true
    }

    /// Flips focus mode and returns the new value.
    pub fn toggle_focus_mode(&mut self) -> bool {
        self.state.focus_mode = !self.state.focus_mode;
        self.commit_preferences();
        self.state.focus_mode
    }

    /// Live descriptors of items linked to `item_id`, in module display order
    /// then item order. Unresolvable ids are skipped.
    pub fn related_to(&self, item_id: &EntityId) -> Vec<RelatedItem> {
        let neighbors: BTreeSet<&EntityId> = self.state.relationships.neighbors(item_id).collect();
        if neighbors.is_empty() {
            return Vec::new();
        }
        self.linkable_items()
            .filter(|related| neighbors.contains(&related.item_id))
            .collect()
    }

    /// Linkable items other than `item_id`, for relationship pickers.
    pub fn link_candidates(&self, item_id: &EntityId) -> Vec<RelatedItem> {
        self.linkable_items()
            .filter(|candidate| &candidate.item_id != item_id)
            .collect()
    }

    fn linkable_items(&self) -> impl Iterator<Item = RelatedItem> + '_ {
        self.state
            .modules
            .iter()
            .filter(|module| self.registry.supports_relationships(module.kind))
            .filter_map(|module| {
                self.registry
                    .get(module.kind)
                    .map(|definition| (module, definition))
            })
            .flat_map(|(module, definition)| {
                let module_label = module.display_name(definition.label()).to_string();
                definition
                    .items(&module.data)
                    .into_iter()
                    .map(move |item| RelatedItem {
                        module_id: module.id.clone(),
                        module_type: module.kind,
                        module_label: module_label.clone(),
                        item_id: item.id().clone(),
                        title: definition.item_title(item),
                        subtitle: definition.item_subtitle(item),
                    })
            })
    }

    /// Links two live linkable items.
    pub fn link(&mut self, a: &EntityId, b: &EntityId) -> bool {
        let live = self.live_ids();
        if !live.contains(a) || !live.contains(b) || !self.state.relationships.link(a, b) {
            return false;
        }
        self.commit_relationships(1, 0);
        true
    }

    pub fn unlink(&mut self, a: &EntityId, b: &EntityId) -> bool {
        if !self.state.relationships.unlink(a, b) {
            return false;
        }
        self.commit_relationships(0, 1);
        true
    }

    /// Replaces the link set of `item_id`.
    ///
    /// Non-linkable sources are ignored; targets are filtered to live
    /// linkable items.
    pub fn set_relationships<I>(&mut self, item_id: &EntityId, targets: I) -> RelationshipChange
    where
        I: IntoIterator<Item = EntityId>,
    {
        let live = self.live_ids();
        if !live.contains(item_id) {
            return RelationshipChange::default();
        }
        let change = self.state.relationships.set_relationships(
            item_id,
            targets.into_iter().filter(|target| live.contains(target)),
        );
        if !change.is_empty() {
            self.commit_relationships(change.linked.len(), change.unlinked.len());
        }
        change
    }

    pub(crate) fn live_ids(&self) -> BTreeSet<EntityId> {
        self.registry.linkable_ids(&self.state.modules)
    }

    pub(crate) fn cleanup_relationships(&mut self) -> usize {
        let live = self.live_ids();
        let removed = self.state.relationships.cleanup(&live);
        if removed > 0 {
            info!("event=relationships_cleanup module=graph status=ok removed={removed}");
        }
        removed
    }

    /// Serializes and writes the whole state. Returns whether the write
    /// succeeded.
    pub(crate) fn persist(&mut self) -> bool {
        let started_at = Instant::now();
        let blob = match self.state.to_json() {
            Ok(blob) => blob,
            Err(err) => {
                error!(
                    "event=state_persist module=store status=error error_code=serialize_failed error={err}"
                );
                return false;
            }
        };
        match self.store.set(&blob) {
            Ok(()) => {
                info!(
                    "event=state_persist module=store status=ok bytes={} duration_ms={}",
                    blob.len(),
                    started_at.elapsed().as_millis()
                );
                true
            }
            Err(err) => {
                error!(
                    "event=state_persist module=store status=error error_code=store_write_failed error={err}"
                );
                false
            }
        }
    }

    /// Invokes the render hook. Returns whether one was registered.
    pub(crate) fn render(&mut self) -> bool {
        match self.render_hook.as_mut() {
            Some(hook) => {
                hook(&self.state);
                true
            }
            None => false,
        }
    }

    fn commit_structural(&mut self) {
        self.cleanup_relationships();
        self.persist();
        self.render();
    }

    fn commit_preferences(&mut self) {
        self.persist();
        self.render();
    }

    fn commit_relationships(&mut self, linked: usize, unlinked: usize) {
        info!("event=relationships_set module=graph status=ok linked={linked} unlinked={unlinked}");
        self.persist();
        self.render();
    }
}

#[cfg(test)]
mod tests {
    use super::{Dashboard, MutationOutcome, MutatorError};
    use crate::model::id::EntityId;
    use crate::model::item::ItemAccess;
    use crate::model::module::{ModuleData, ModuleType};
    use crate::registry::ModuleRegistry;
    use crate::store::MemoryStateStore;

    fn dashboard() -> Dashboard<MemoryStateStore> {
        Dashboard::load(ModuleRegistry::builtin(), MemoryStateStore::new())
    }

    fn module_ids(dashboard: &Dashboard<MemoryStateStore>) -> Vec<EntityId> {
        dashboard
            .state()
            .modules
            .iter()
            .map(|module| module.id.clone())
            .collect()
    }

    #[test]
    fn swapping_module_data_type_is_rejected() {
        let mut dashboard = dashboard();
        let tasks_id = dashboard.state().modules[1].id.clone();
        let before = dashboard.state().clone();

        let outcome = dashboard.mutate_and_notify(&tasks_id, |module| {
            module.data = ModuleData::empty(ModuleType::Notes);
            Ok(())
        });

        assert_eq!(
            outcome,
            MutationOutcome::Rejected(MutatorError::KindChanged {
                expected: ModuleType::Tasks,
                actual: ModuleType::Notes,
            })
        );
        assert_eq!(dashboard.state(), &before);
    }

    #[test]
    fn reorder_module_ignores_out_of_range_offsets() {
        let mut dashboard = dashboard();
        let ids = module_ids(&dashboard);

        assert!(!dashboard.reorder_module(&ids[0], -1));
        assert!(!dashboard.reorder_module(&ids[2], 1));
        assert!(!dashboard.reorder_module(&ids[1], 0));
        assert_eq!(module_ids(&dashboard), ids);

        assert!(dashboard.reorder_module(&ids[0], 1));
        assert_eq!(
            module_ids(&dashboard),
            vec![ids[1].clone(), ids[0].clone(), ids[2].clone()]
        );
    }

    #[test]
    fn move_module_places_before_target_or_at_end() {
        let mut dashboard = dashboard();
        let ids = module_ids(&dashboard);

        assert!(dashboard.move_module(&ids[2], Some(&ids[0])));
        assert_eq!(
            module_ids(&dashboard),
            vec![ids[2].clone(), ids[0].clone(), ids[1].clone()]
        );

        assert!(dashboard.move_module(&ids[2], None));
        assert_eq!(module_ids(&dashboard), ids);

        assert!(!dashboard.move_module(&ids[2], None));
        assert!(!dashboard.move_module(&ids[0], Some(&ids[0])));
        let ghost = EntityId::generate();
        assert!(!dashboard.move_module(&ids[0], Some(&ghost)));
        assert_eq!(module_ids(&dashboard), ids);
    }

    #[test]
    fn rename_trims_and_blank_restores_label() {
        let mut dashboard = dashboard();
        let id = dashboard.state().modules[0].id.clone();

        assert!(dashboard.rename_module(&id, "  Roadmap  "));
        assert_eq!(dashboard.state().modules[0].name, "Roadmap");
        assert!(dashboard.rename_module(&id, "   "));
        assert_eq!(dashboard.state().modules[0].display_name("Projects"), "Projects");
    }

    #[test]
    fn preferences_validate_input() {
        let mut dashboard = dashboard();
        assert!(!dashboard.set_density(f64::NAN));
        assert!(!dashboard.set_density(0.0));
        assert!(dashboard.set_density(420.4));
        assert_eq!(dashboard.state().density, 420);

        assert!(dashboard.toggle_focus_mode());
        assert!(!dashboard.toggle_focus_mode());
    }

    #[test]
    fn with_state_drops_links_to_missing_items() {
        let registry = ModuleRegistry::builtin();
        let mut state = crate::sanitize::default_state(&registry);
        let task = state.modules[1].data.records()[0].id().clone();
        let ghost = EntityId::generate();
        state.relationships.link(&task, &ghost);

        let dashboard = Dashboard::with_state(registry, MemoryStateStore::new(), state);

        assert!(dashboard.state().relationships.is_empty());
        assert_eq!(dashboard.store().write_count(), 0);
    }

    #[test]
    fn add_module_rejects_unregistered_types() {
        let mut dashboard = Dashboard::load(ModuleRegistry::new(), MemoryStateStore::new());
        assert!(dashboard.state().modules.is_empty());
        assert_eq!(dashboard.add_module(ModuleType::Clients), None);
    }
}
