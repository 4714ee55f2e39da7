//! Persisted-blob sanitizer.
//!
//! # Responsibility
//! - Turn an untrusted persisted blob into a `DashboardState` that satisfies
//!   every model invariant.
//! - Build the hard-coded default state.
//!
//! # Invariants
//! - Never fails: malformed input degrades to defaults field by field.
//! - Idempotent: sanitizing the serialization of a sanitized state yields an
//!   equal state.
//! - Relationship graphs only reference live linkable items of the same state.
//!
//! # See also
//! - `registry::ModuleDefinition::sanitize_data` for per-type data rules.

use crate::graph::RelationshipGraph;
use crate::model::id::{EntityId, IdLedger};
use crate::model::module::{Module, ModuleType};
use crate::model::state::{
    is_hex_color, DashboardState, Palette, Snapshot, SnapshotState, ThemeKey, DEFAULT_DENSITY,
};
use crate::registry::ModuleRegistry;
use crate::snapshot::suggest_snapshot_name;
use chrono::{Local, TimeZone, Utc};
use serde_json::{Map, Value};

/// Hard-coded default state for a brand-new dashboard.
pub fn default_state(registry: &ModuleRegistry) -> DashboardState {
    DashboardState {
        theme: Palette::default(),
        density: DEFAULT_DENSITY,
        focus_mode: false,
        modules: registry.default_modules(),
        snapshots: Vec::new(),
        relationships: RelationshipGraph::new(),
    }
}

/// Sanitizes a raw persisted blob.
///
/// Absent, unparseable, non-object and empty-object blobs yield the default
/// state.
pub fn sanitize_blob(raw: Option<&str>, registry: &ModuleRegistry) -> DashboardState {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return default_state(registry);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => sanitize_value(&value, registry),
        Err(_) => default_state(registry),
    }
}

/// Sanitizes an already-parsed persisted value.
pub fn sanitize_value(value: &Value, registry: &ModuleRegistry) -> DashboardState {
    let Some(raw) = value.as_object().filter(|raw| !raw.is_empty()) else {
        return default_state(registry);
    };

    let mut ids = IdLedger::new();
    let modules = match raw.get("modules").and_then(Value::as_array) {
        Some(values) => sanitize_modules(values, registry, &mut ids),
        None => registry.default_modules(),
    };
    let relationships = sanitize_relationships(raw.get("relationships"), &modules, registry);

    DashboardState {
        theme: sanitize_palette(raw.get("theme")),
        density: sanitize_density(raw.get("density")).unwrap_or(DEFAULT_DENSITY),
        focus_mode: raw
            .get("focusMode")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        modules,
        snapshots: sanitize_snapshots(raw.get("snapshots"), registry),
        relationships,
    }
}

/// Sanitizes a module list; non-object and unknown-type entries are dropped.
pub(crate) fn sanitize_modules(
    values: &[Value],
    registry: &ModuleRegistry,
    ids: &mut IdLedger,
) -> Vec<Module> {
    values
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|raw| sanitize_module(raw, registry, ids))
        .collect()
}

fn sanitize_module(
    raw: &Map<String, Value>,
    registry: &ModuleRegistry,
    ids: &mut IdLedger,
) -> Option<Module> {
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .and_then(ModuleType::parse)?;
    let definition = registry.get(kind)?;

    let id = ids.claim(EntityId::from_value(raw.get("id")));
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .map(|name| name.trim().to_string())
        .unwrap_or_default();
    let data = definition.sanitize_data(raw.get("data"), ids);
    Some(Module {
        id,
        kind,
        name,
        data,
    })
}

/// Default palette overlaid with valid persisted hex colors.
pub(crate) fn sanitize_palette(raw: Option<&Value>) -> Palette {
    let mut palette = Palette::default();
    let Some(raw) = raw.and_then(Value::as_object) else {
        return palette;
    };
    for key in ThemeKey::ALL {
        if let Some(color) = raw.get(key.as_str()).and_then(Value::as_str) {
            if is_hex_color(color.trim()) {
                palette.set(key, color);
            }
        }
    }
    palette
}

/// Positive finite density rounded to an integer.
pub(crate) fn sanitize_density(raw: Option<&Value>) -> Option<u32> {
    let value = raw.and_then(Value::as_f64)?;
    density_from_f64(value)
}

pub(crate) fn density_from_f64(value: f64) -> Option<u32> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < 1.0 || rounded > f64::from(u32::MAX) {
        return None;
    }
    Some(rounded as u32)
}

/// Rebuilds a persisted adjacency object against the live linkable ids.
pub(crate) fn sanitize_relationships(
    raw: Option<&Value>,
    modules: &[Module],
    registry: &ModuleRegistry,
) -> RelationshipGraph {
    let Some(raw) = raw.and_then(Value::as_object) else {
        return RelationshipGraph::new();
    };
    let live = registry.linkable_ids(modules);
    let pairs = raw.iter().flat_map(|(key, members)| {
        let source = EntityId::parse(key.as_str());
        members
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(move |member| {
                let source = source.clone()?;
                let target = EntityId::from_value(Some(member))?;
                Some((source, target))
            })
    });
    RelationshipGraph::from_pairs(pairs, &live)
}

fn sanitize_snapshots(raw: Option<&Value>, registry: &ModuleRegistry) -> Vec<Snapshot> {
    let Some(values) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut snapshot_ids = IdLedger::new();
    values
        .iter()
        .filter_map(Value::as_object)
        .map(|raw| sanitize_snapshot(raw, registry, &mut snapshot_ids))
        .collect()
}

fn sanitize_snapshot(
    raw: &Map<String, Value>,
    registry: &ModuleRegistry,
    snapshot_ids: &mut IdLedger,
) -> Snapshot {
    let created_at = raw
        .get("createdAt")
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
        .map(|value| value.round() as i64)
        .unwrap_or_else(|| Utc::now().timestamp_millis());
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_snapshot_name(created_at));

    Snapshot {
        id: snapshot_ids.claim(EntityId::from_value(raw.get("id"))),
        name,
        created_at,
        state: sanitize_snapshot_state(raw.get("state"), registry),
    }
}

/// Snapshot state with the same per-field rules as live state.
///
/// An empty or fully-invalid module list falls back to the default modules.
pub(crate) fn sanitize_snapshot_state(
    raw: Option<&Value>,
    registry: &ModuleRegistry,
) -> SnapshotState {
    let Some(raw) = raw.and_then(Value::as_object) else {
        return default_snapshot_state(registry);
    };

    let mut ids = IdLedger::new();
    let modules = raw
        .get("modules")
        .and_then(Value::as_array)
        .map(|values| sanitize_modules(values, registry, &mut ids))
        .filter(|modules| !modules.is_empty())
        .unwrap_or_else(|| registry.default_modules());
    let relationships = sanitize_relationships(raw.get("relationships"), &modules, registry);

    SnapshotState {
        theme: sanitize_palette(raw.get("theme")),
        density: sanitize_density(raw.get("density")).unwrap_or(DEFAULT_DENSITY),
        modules,
        relationships,
    }
}

fn default_snapshot_state(registry: &ModuleRegistry) -> SnapshotState {
    SnapshotState {
        theme: Palette::default(),
        density: DEFAULT_DENSITY,
        modules: registry.default_modules(),
        relationships: RelationshipGraph::new(),
    }
}

fn fallback_snapshot_name(created_at: i64) -> String {
    match Local.timestamp_millis_opt(created_at).single() {
        Some(at) => suggest_snapshot_name(at),
        None => suggest_snapshot_name(Local::now()),
    }
}
