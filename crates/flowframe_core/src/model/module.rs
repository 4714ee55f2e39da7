//! Dashboard module model.
//!
//! # Responsibility
//! - Define the module envelope (`Module`) and its type tag (`ModuleType`).
//! - Define type-specific data collections (`ModuleData`).
//! - Offer collection helpers used by mutators (remove/move by item id).
//!
//! # Invariants
//! - `Module::kind` never changes after creation and always matches
//!   `ModuleData::kind()` for committed modules.
//! - Collection order is display order.

use crate::model::id::EntityId;
use crate::model::item::{Client, ItemAccess, JournalEntry, Note, Project, Task};
use serde::Serialize;

/// Registered module type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    Projects,
    Clients,
    Tasks,
    Notes,
    Journal,
}

impl ModuleType {
    pub const ALL: [ModuleType; 5] = [
        Self::Projects,
        Self::Clients,
        Self::Tasks,
        Self::Notes,
        Self::Journal,
    ];

    /// Stable tag used in persisted blobs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Clients => "clients",
            Self::Tasks => "tasks",
            Self::Notes => "notes",
            Self::Journal => "journal",
        }
    }

    /// Parses a persisted type tag. Unknown tags return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "projects" => Some(Self::Projects),
            "clients" => Some(Self::Clients),
            "tasks" => Some(Self::Tasks),
            "notes" => Some(Self::Notes),
            "journal" => Some(Self::Journal),
            _ => None,
        }
    }
}

/// Journal energy level default.
pub const DEFAULT_MOOD: &str = "Balanced";

/// Type-specific module payload.
///
/// Serialized untagged: item collections as `{ "items": [...] }`, the
/// journal as `{ "entries": [...], "mood": "..." }`. The owning module's
/// `type` field carries the tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModuleData {
    Projects { items: Vec<Project> },
    Clients { items: Vec<Client> },
    Tasks { items: Vec<Task> },
    Notes { items: Vec<Note> },
    Journal { entries: Vec<JournalEntry>, mood: String },
}

impl ModuleData {
    pub fn kind(&self) -> ModuleType {
        match self {
            Self::Projects { .. } => ModuleType::Projects,
            Self::Clients { .. } => ModuleType::Clients,
            Self::Tasks { .. } => ModuleType::Tasks,
            Self::Notes { .. } => ModuleType::Notes,
            Self::Journal { .. } => ModuleType::Journal,
        }
    }

    /// Empty collection for the given type.
    pub fn empty(kind: ModuleType) -> Self {
        match kind {
            ModuleType::Projects => Self::Projects { items: Vec::new() },
            ModuleType::Clients => Self::Clients { items: Vec::new() },
            ModuleType::Tasks => Self::Tasks { items: Vec::new() },
            ModuleType::Notes => Self::Notes { items: Vec::new() },
            ModuleType::Journal => Self::Journal {
                entries: Vec::new(),
                mood: DEFAULT_MOOD.to_string(),
            },
        }
    }

    /// Items (or journal entries) in display order.
    pub fn records(&self) -> Vec<&dyn ItemAccess> {
        match self {
            Self::Projects { items } => items.iter().map(|i| i as &dyn ItemAccess).collect(),
            Self::Clients { items } => items.iter().map(|i| i as &dyn ItemAccess).collect(),
            Self::Tasks { items } => items.iter().map(|i| i as &dyn ItemAccess).collect(),
            Self::Notes { items } => items.iter().map(|i| i as &dyn ItemAccess).collect(),
            Self::Journal { entries, .. } => {
                entries.iter().map(|i| i as &dyn ItemAccess).collect()
            }
        }
    }

    /// Mutable records in display order.
    pub fn records_mut(&mut self) -> Vec<&mut dyn ItemAccess> {
        match self {
            Self::Projects { items } => items.iter_mut().map(|i| i as &mut dyn ItemAccess).collect(),
            Self::Clients { items } => items.iter_mut().map(|i| i as &mut dyn ItemAccess).collect(),
            Self::Tasks { items } => items.iter_mut().map(|i| i as &mut dyn ItemAccess).collect(),
            Self::Notes { items } => items.iter_mut().map(|i| i as &mut dyn ItemAccess).collect(),
            Self::Journal { entries, .. } => entries
                .iter_mut()
                .map(|i| i as &mut dyn ItemAccess)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Projects { items } => items.len(),
            Self::Clients { items } => items.len(),
            Self::Tasks { items } => items.len(),
            Self::Notes { items } => items.len(),
            Self::Journal { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, item_id: &EntityId) -> Option<usize> {
        self.records().iter().position(|item| item.id() == item_id)
    }

    /// Removes one record by id. Returns whether a record was removed.
    pub fn remove_item(&mut self, item_id: &EntityId) -> bool {
        let Some(index) = self.position(item_id) else {
            return false;
        };
        match self {
            Self::Projects { items } => drop(items.remove(index)),
            Self::Clients { items } => drop(items.remove(index)),
            Self::Tasks { items } => drop(items.remove(index)),
            Self::Notes { items } => drop(items.remove(index)),
            Self::Journal { entries, .. } => drop(entries.remove(index)),
        }
        true
    }

    /// Moves one record to `to_index` (clamped to the collection bounds).
    pub fn move_item(&mut self, item_id: &EntityId, to_index: usize) -> bool {
        let Some(from) = self.position(item_id) else {
            return false;
        };
        let to = to_index.min(self.len().saturating_sub(1));
        match self {
            Self::Projects { items } => move_within(items, from, to),
            Self::Clients { items } => move_within(items, from, to),
            Self::Tasks { items } => move_within(items, from, to),
            Self::Notes { items } => move_within(items, from, to),
            Self::Journal { entries, .. } => move_within(entries, from, to),
        }
        true
    }
}

fn move_within<T>(items: &mut Vec<T>, from: usize, to: usize) {
    let item = items.remove(from);
    items.insert(to, item);
}

/// One dashboard module instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub id: EntityId,
    /// Serialized as `type` to match the persisted blob layout.
    #[serde(rename = "type")]
    pub kind: ModuleType,
    /// Display override; empty means "use the definition label".
    pub name: String,
    pub data: ModuleData,
}

impl Module {
    /// Builds a module for already-constructed data.
    pub fn new(data: ModuleData) -> Self {
        Self {
            id: EntityId::generate(),
            kind: data.kind(),
            name: String::new(),
            data,
        }
    }

    /// Display name, falling back to `label` when no override is set.
    pub fn display_name<'a>(&'a self, label: &'a str) -> &'a str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            label
        } else {
            trimmed
        }
    }

    pub fn contains_item(&self, item_id: &EntityId) -> bool {
        self.data.position(item_id).is_some()
    }
}
