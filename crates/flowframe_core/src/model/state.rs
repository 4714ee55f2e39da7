//! Top-level dashboard state and snapshot records.
//!
//! # Responsibility
//! - Define the single unit of persistence (`DashboardState`).
//! - Define immutable point-in-time copies (`Snapshot`).
//! - Own theme palette defaults and color validation.
//!
//! # Invariants
//! - Palette colors are `#rgb` or `#rrggbb` hex strings.
//! - Snapshot content is never mutated after creation.
//! - Serialized layout uses camelCase keys (`focusMode`, `createdAt`).

use crate::graph::RelationshipGraph;
use crate::model::id::EntityId;
use crate::model::module::Module;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Density applied when no valid persisted value exists.
pub const DEFAULT_DENSITY: u32 = 380;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid hex color regex")
});

/// Palette slot addressed by theme controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKey {
    Background,
    Surface,
    Accent,
    Text,
}

impl ThemeKey {
    pub const ALL: [ThemeKey; 4] = [Self::Background, Self::Surface, Self::Accent, Self::Text];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Surface => "surface",
            Self::Accent => "accent",
            Self::Text => "text",
        }
    }
}

/// Theme color palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: String,
    pub surface: String,
    pub accent: String,
    pub text: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: "#f5efe6".to_string(),
            surface: "#fffaf2".to_string(),
            accent: "#c9a976".to_string(),
            text: "#2f241d".to_string(),
        }
    }
}

impl Palette {
    pub fn get(&self, key: ThemeKey) -> &str {
        match key {
            ThemeKey::Background => self.background.as_str(),
            ThemeKey::Surface => self.surface.as_str(),
            ThemeKey::Accent => self.accent.as_str(),
            ThemeKey::Text => self.text.as_str(),
        }
    }

    /// Sets one slot. Returns `false` and leaves the palette unchanged when
    /// `value` is not a hex color.
    pub fn set(&mut self, key: ThemeKey, value: &str) -> bool {
        let value = value.trim();
        if !is_hex_color(value) {
            return false;
        }
        let slot = match key {
            ThemeKey::Background => &mut self.background,
            ThemeKey::Surface => &mut self.surface,
            ThemeKey::Accent => &mut self.accent,
            ThemeKey::Text => &mut self.text,
        };
        *slot = value.to_string();
        true
    }
}

/// Returns whether `value` is a `#rgb` or `#rrggbb` color.
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Captured portion of the live state stored inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotState {
    pub theme: Palette,
    pub density: u32,
    pub modules: Vec<Module>,
    pub relationships: RelationshipGraph,
}

/// Named, timestamped, restorable copy of the live state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: EntityId,
    pub name: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub state: SnapshotState,
}

/// Whole dashboard state; serialized wholesale on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub theme: Palette,
    pub density: u32,
    pub focus_mode: bool,
    /// Display order.
    pub modules: Vec<Module>,
    /// Most recent first.
    pub snapshots: Vec<Snapshot>,
    pub relationships: RelationshipGraph,
}

impl DashboardState {
    pub fn module(&self, module_id: &EntityId) -> Option<&Module> {
        self.modules.iter().find(|module| &module.id == module_id)
    }

    pub fn module_index(&self, module_id: &EntityId) -> Option<usize> {
        self.modules.iter().position(|module| &module.id == module_id)
    }

    pub fn snapshot(&self, snapshot_id: &EntityId) -> Option<&Snapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| &snapshot.id == snapshot_id)
    }

    /// Module owning the item (or journal entry) with `item_id`.
    pub fn module_of_item(&self, item_id: &EntityId) -> Option<&Module> {
        self.modules
            .iter()
            .find(|module| module.contains_item(item_id))
    }

    /// Serializes the state into the persisted blob layout.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
