//! Module type registry.
//!
//! # Responsibility
//! - Declare one `ModuleDefinition` per module type: labels, default data,
//!   item accessors, relationship capability, sanitize/normalize rules.
//! - Dispatch by `ModuleType` through one lookup table.
//!
//! # Invariants
//! - At most one definition per `ModuleType`.
//! - Registration order is the "add module" menu order.
//! - Default data always carries fresh ids for seeded records.

use crate::model::id::{EntityId, IdLedger};
use crate::model::item::{Client, ItemAccess, JournalEntry, Note, Project, ProjectStatus, Task};
use crate::model::module::{Module, ModuleData, ModuleType, DEFAULT_MOOD};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Capability table for one module type.
pub trait ModuleDefinition {
    fn kind(&self) -> ModuleType;
    fn label(&self) -> &'static str;
    fn icon(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// Whether items of this type may appear in the relationship graph.
    fn supports_relationships(&self) -> bool;

    /// Fresh, valid data with new ids for any seeded records.
    fn default_data(&self) -> ModuleData;

    /// Coerces untyped persisted data; falls back to defaults per collection.
    fn sanitize_data(&self, raw: Option<&Value>, ids: &mut IdLedger) -> ModuleData;

    /// Re-establishes data invariants after a mutation.
    ///
    /// The default claims every record id through `ids`, replacing duplicates.
    fn normalize(&self, data: &mut ModuleData, ids: &mut IdLedger) {
        claim_records(data, ids);
    }

    /// Records of `data` in display order; empty when `data` is of another type.
    fn items<'a>(&self, data: &'a ModuleData) -> Vec<&'a dyn ItemAccess> {
        if data.kind() == self.kind() {
            data.records()
        } else {
            Vec::new()
        }
    }

    fn item_title(&self, item: &dyn ItemAccess) -> String {
        item.title()
    }

    fn item_subtitle(&self, item: &dyn ItemAccess) -> String {
        item.subtitle()
    }
}

/// Registry failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateModuleType(ModuleType),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateModuleType(kind) => {
                write!(f, "module type already registered: {}", kind.as_str())
            }
        }
    }
}

impl Error for RegistryError {}

/// Lookup table from module type to definition.
#[derive(Default)]
pub struct ModuleRegistry {
    definitions: BTreeMap<ModuleType, Box<dyn ModuleDefinition>>,
    order: Vec<ModuleType>,
}

impl Debug for ModuleRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("order", &self.order)
            .finish()
    }
}

/// Types seeded into a brand-new dashboard, in display order.
const DEFAULT_LAYOUT: [ModuleType; 3] = [ModuleType::Projects, ModuleType::Tasks, ModuleType::Notes];

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in module type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let builtins: [Box<dyn ModuleDefinition>; 5] = [
            Box::new(ProjectsDefinition),
            Box::new(ClientsDefinition),
            Box::new(TasksDefinition),
            Box::new(NotesDefinition),
            Box::new(JournalDefinition),
        ];
        for definition in builtins {
            let kind = definition.kind();
            registry.order.push(kind);
            registry.definitions.insert(kind, definition);
        }
        registry
    }

    /// Registers one definition.
    pub fn register(
        &mut self,
        definition: Box<dyn ModuleDefinition>,
    ) -> Result<(), RegistryError> {
        let kind = definition.kind();
        if self.definitions.contains_key(&kind) {
            return Err(RegistryError::DuplicateModuleType(kind));
        }
        self.order.push(kind);
        self.definitions.insert(kind, definition);
        Ok(())
    }

    pub fn get(&self, kind: ModuleType) -> Option<&dyn ModuleDefinition> {
        self.definitions.get(&kind).map(|definition| definition.as_ref())
    }

    pub fn contains(&self, kind: ModuleType) -> bool {
        self.definitions.contains_key(&kind)
    }

    /// Registered types in registration order.
    pub fn ordered_types(&self) -> &[ModuleType] {
        &self.order
    }

    pub fn supports_relationships(&self, kind: ModuleType) -> bool {
        self.get(kind)
            .is_some_and(|definition| definition.supports_relationships())
    }

    /// Creates a module with default data. `None` for unregistered types.
    pub fn create_module(&self, kind: ModuleType) -> Option<Module> {
        self.get(kind)
            .map(|definition| Module::new(definition.default_data()))
    }

    /// Modules seeded into a brand-new dashboard.
    pub fn default_modules(&self) -> Vec<Module> {
        DEFAULT_LAYOUT
            .iter()
            .filter_map(|kind| self.create_module(*kind))
            .collect()
    }

    /// Ids of every record that may participate in relationships.
    pub fn linkable_ids(&self, modules: &[Module]) -> BTreeSet<EntityId> {
        modules
            .iter()
            .filter(|module| self.supports_relationships(module.kind))
            .filter_map(|module| {
                self.get(module.kind)
                    .map(|definition| definition.items(&module.data))
            })
            .flat_map(|items| items.into_iter().map(|item| item.id().clone()))
            .collect()
    }
}

/// Claims every record id through `ids`; duplicate or colliding ids are
/// replaced with fresh ones.
pub fn claim_records(data: &mut ModuleData, ids: &mut IdLedger) {
    for record in data.records_mut() {
        let claimed = ids.claim_existing(record.id());
        if &claimed != record.id() {
            record.set_id(claimed);
        }
    }
}

/// Reads the array under `key`, mapping object elements through `parse`.
///
/// Returns `None` when `key` is missing or not an array so callers can fall
/// back to the default collection. Non-object elements are dropped.
fn sanitize_collection<T>(
    raw: &Map<String, Value>,
    key: &str,
    ids: &mut IdLedger,
    parse: fn(&Map<String, Value>, &mut IdLedger) -> T,
) -> Option<Vec<T>> {
    let values = raw.get(key)?.as_array()?;
    Some(
        values
            .iter()
            .filter_map(Value::as_object)
            .map(|item| parse(item, ids))
            .collect(),
    )
}

/// Default data with ids claimed through `ids`.
fn claimed_default(definition: &dyn ModuleDefinition, ids: &mut IdLedger) -> ModuleData {
    let mut data = definition.default_data();
    claim_records(&mut data, ids);
    data
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectsDefinition;

impl ModuleDefinition for ProjectsDefinition {
    fn kind(&self) -> ModuleType {
        ModuleType::Projects
    }

    fn label(&self) -> &'static str {
        "Projects"
    }

    fn icon(&self) -> &'static str {
        "🧭"
    }

    fn description(&self) -> &'static str {
        "Track multi-step journeys with status, progress and upcoming deadlines."
    }

    fn supports_relationships(&self) -> bool {
        true
    }

    fn default_data(&self) -> ModuleData {
        let mut onboarding = Project::new("Craft onboarding");
        onboarding.status = ProjectStatus::InProgress;
        onboarding.owner = "Design".to_string();
        onboarding.progress = 64;
        onboarding.due = "2024-09-06".to_string();
        onboarding.note = "Build tailored welcome experience for new members.".to_string();

        let mut rituals = Project::new("Automation rituals");
        rituals.owner = "Ops".to_string();
        rituals.progress = 32;
        rituals.due = "2024-09-18".to_string();
        rituals.note = "Outline weekly maintenance loops and automations.".to_string();

        ModuleData::Projects {
            items: vec![onboarding, rituals],
        }
    }

    fn sanitize_data(&self, raw: Option<&Value>, ids: &mut IdLedger) -> ModuleData {
        let Some(raw) = raw.and_then(Value::as_object) else {
            return claimed_default(self, ids);
        };
        match sanitize_collection(raw, "items", ids, Project::from_value) {
            Some(items) => ModuleData::Projects { items },
            None => claimed_default(self, ids),
        }
    }

    fn normalize(&self, data: &mut ModuleData, ids: &mut IdLedger) {
        claim_records(data, ids);
        if let ModuleData::Projects { items } = data {
            for project in items {
                project.progress = project.progress.min(100);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClientsDefinition;

impl ModuleDefinition for ClientsDefinition {
    fn kind(&self) -> ModuleType {
        ModuleType::Clients
    }

    fn label(&self) -> &'static str {
        "Clients"
    }

    fn icon(&self) -> &'static str {
        "🤝"
    }

    fn description(&self) -> &'static str {
        "Keep the people and companies you work with one glance away."
    }

    fn supports_relationships(&self) -> bool {
        true
    }

    fn default_data(&self) -> ModuleData {
        let mut northwind = Client::new("Avery Chen", "Northwind Studio");
        northwind.email = "avery@northwind.example".to_string();

        let mut lumen = Client::new("Jordan Blake", "Lumen Labs");
        lumen.status = "Lead".to_string();

        ModuleData::Clients {
            items: vec![northwind, lumen],
        }
    }

    fn sanitize_data(&self, raw: Option<&Value>, ids: &mut IdLedger) -> ModuleData {
        let Some(raw) = raw.and_then(Value::as_object) else {
            return claimed_default(self, ids);
        };
        match sanitize_collection(raw, "items", ids, Client::from_value) {
            Some(items) => ModuleData::Clients { items },
            None => claimed_default(self, ids),
        }
    }

    fn normalize(&self, data: &mut ModuleData, ids: &mut IdLedger) {
        claim_records(data, ids);
        if let ModuleData::Clients { items } = data {
            for client in items {
                if client.status.trim().is_empty() {
                    client.status = Client::DEFAULT_STATUS.to_string();
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TasksDefinition;

impl ModuleDefinition for TasksDefinition {
    fn kind(&self) -> ModuleType {
        ModuleType::Tasks
    }

    fn label(&self) -> &'static str {
        "Tasks"
    }

    fn icon(&self) -> &'static str {
        "☑️"
    }

    fn description(&self) -> &'static str {
        "Capture actionable steps and follow momentum across your day."
    }

    fn supports_relationships(&self) -> bool {
        true
    }

    fn default_data(&self) -> ModuleData {
        let mut review = Task::new("Morning plan review");
        review.done = true;
        ModuleData::Tasks {
            items: vec![
                review,
                Task::new("Prototype weekly update"),
                Task::new("Share progress snapshot"),
            ],
        }
    }

    fn sanitize_data(&self, raw: Option<&Value>, ids: &mut IdLedger) -> ModuleData {
        let Some(raw) = raw.and_then(Value::as_object) else {
            return claimed_default(self, ids);
        };
        match sanitize_collection(raw, "items", ids, Task::from_value) {
            Some(items) => ModuleData::Tasks { items },
            None => claimed_default(self, ids),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NotesDefinition;

impl ModuleDefinition for NotesDefinition {
    fn kind(&self) -> ModuleType {
        ModuleType::Notes
    }

    fn label(&self) -> &'static str {
        "Notes"
    }

    fn icon(&self) -> &'static str {
        "📝"
    }

    fn description(&self) -> &'static str {
        "Capture lightweight thoughts, meeting agendas or inspiration."
    }

    fn supports_relationships(&self) -> bool {
        true
    }

    fn default_data(&self) -> ModuleData {
        ModuleData::Notes {
            items: vec![
                Note::new(
                    "Framing",
                    "Anchor decisions on the outcomes we want people to feel.",
                ),
                Note::new(
                    "Highlights",
                    "Celebrate one micro-win daily to keep the team encouraged.",
                ),
            ],
        }
    }

    fn sanitize_data(&self, raw: Option<&Value>, ids: &mut IdLedger) -> ModuleData {
        let Some(raw) = raw.and_then(Value::as_object) else {
            return claimed_default(self, ids);
        };
        match sanitize_collection(raw, "items", ids, Note::from_value) {
            Some(items) => ModuleData::Notes { items },
            None => claimed_default(self, ids),
        }
    }
}

/// Journal entries carry ids but are excluded from cross-linking.
#[derive(Debug, Clone, Copy)]
pub struct JournalDefinition;

impl ModuleDefinition for JournalDefinition {
    fn kind(&self) -> ModuleType {
        ModuleType::Journal
    }

    fn label(&self) -> &'static str {
        "Daily Journal"
    }

    fn icon(&self) -> &'static str {
        "🌿"
    }

    fn description(&self) -> &'static str {
        "Reflect on the day with a gentle mood tracker and gratitude prompts."
    }

    fn supports_relationships(&self) -> bool {
        false
    }

    fn default_data(&self) -> ModuleData {
        ModuleData::empty(ModuleType::Journal)
    }

    fn sanitize_data(&self, raw: Option<&Value>, ids: &mut IdLedger) -> ModuleData {
        let Some(raw) = raw.and_then(Value::as_object) else {
            return claimed_default(self, ids);
        };
        let entries = sanitize_collection(raw, "entries", ids, JournalEntry::from_value)
            .unwrap_or_default();
        let mood = raw
            .get("mood")
            .and_then(Value::as_str)
            .filter(|mood| !mood.trim().is_empty())
            .unwrap_or(DEFAULT_MOOD)
            .to_string();
        ModuleData::Journal { entries, mood }
    }

    fn normalize(&self, data: &mut ModuleData, ids: &mut IdLedger) {
        claim_records(data, ids);
        if let ModuleData::Journal { mood, .. } = data {
            if mood.trim().is_empty() {
                *mood = DEFAULT_MOOD.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ModuleDefinition, ModuleRegistry, RegistryError, TasksDefinition};
    use crate::model::id::IdLedger;
    use crate::model::item::ItemAccess;
    use crate::model::module::{ModuleData, ModuleType};
    use serde_json::json;

    #[test]
    fn builtin_registry_covers_every_type_in_menu_order() {
        let registry = ModuleRegistry::builtin();
        assert_eq!(registry.ordered_types(), &ModuleType::ALL);
        for kind in ModuleType::ALL {
            let definition = registry.get(kind).expect("builtin definition");
            assert_eq!(definition.kind(), kind);
            assert_eq!(definition.default_data().kind(), kind);
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ModuleRegistry::builtin();
        let err = registry
            .register(Box::new(TasksDefinition))
            .expect_err("duplicate must fail");
        assert_eq!(err, RegistryError::DuplicateModuleType(ModuleType::Tasks));
    }

    #[test]
    fn journal_is_excluded_from_relationships() {
        let registry = ModuleRegistry::builtin();
        assert!(!registry.supports_relationships(ModuleType::Journal));
        assert!(registry.supports_relationships(ModuleType::Projects));
        assert!(registry.supports_relationships(ModuleType::Clients));
    }

    #[test]
    fn default_data_ids_are_fresh_per_call() {
        let registry = ModuleRegistry::builtin();
        let projects = registry.get(ModuleType::Projects).unwrap();
        let first = projects.default_data();
        let second = projects.default_data();
        assert_ne!(first.records()[0].id(), second.records()[0].id());
    }

    #[test]
    fn linkable_ids_skip_journal_entries() {
        let registry = ModuleRegistry::builtin();
        let mut journal = registry.create_module(ModuleType::Journal).unwrap();
        if let ModuleData::Journal { entries, .. } = &mut journal.data {
            entries.push(crate::model::item::JournalEntry::new("2024-09-01", "calm"));
        }
        let tasks = registry.create_module(ModuleType::Tasks).unwrap();

        let live = registry.linkable_ids(&[journal.clone(), tasks.clone()]);
        assert_eq!(live.len(), tasks.data.len());
        assert!(!live.contains(journal.data.records()[0].id()));
    }

    #[test]
    fn sanitize_falls_back_per_collection() {
        let registry = ModuleRegistry::builtin();
        let tasks = registry.get(ModuleType::Tasks).unwrap();
        let mut ids = IdLedger::new();

        let from_garbage = tasks.sanitize_data(Some(&json!({"items": "nope"})), &mut ids);
        assert_eq!(from_garbage.len(), 3);

        let kept = tasks.sanitize_data(
            Some(&json!({"items": [{"title": "Keep", "id": "t-1"}, 5, null]})),
            &mut ids,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.records()[0].id().as_str(), "t-1");
    }

    #[test]
    fn journal_sanitize_defaults_mood_and_entries() {
        let registry = ModuleRegistry::builtin();
        let journal = registry.get(ModuleType::Journal).unwrap();
        let data = journal.sanitize_data(Some(&json!({"mood": ""})), &mut IdLedger::new());
        assert_eq!(
            data,
            ModuleData::Journal {
                entries: Vec::new(),
                mood: "Balanced".to_string()
            }
        );
    }
}
