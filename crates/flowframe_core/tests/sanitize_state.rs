use flowframe_core::{
    sanitize_blob, sanitize_value, Dashboard, EntityId, ItemAccess, MemoryStateStore,
    ModuleData, ModuleRegistry, ModuleType, ProjectStatus,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;

fn legacy_blob() -> serde_json::Value {
    json!({
        "theme": { "background": "#101010", "accent": "blue" },
        "density": "wide",
        "focusMode": "yes",
        "modules": [
            {
                "id": "mod-projects",
                "type": "projects",
                "name": "  Client work ",
                "data": { "items": [
                    { "id": "p-1", "title": "Site refresh", "status": "In progress", "progress": 140 },
                    { "id": "p-2", "title": "Brand kit", "status": "Paused", "progress": "45.6" },
                    { "id": "p-1", "title": "Duplicate id" },
                ] }
            },
            {
                "id": "mod-tasks",
                "type": "tasks",
                "data": { "items": [ { "title": "Legacy task without id", "done": true }, "junk" ] }
            },
            { "type": "kanban", "data": {} },
            { "id": "mod-notes", "type": "notes", "data": "not-an-object" },
            { "id": "mod-journal", "type": "journal", "data": { "entries": [ { "date": "2024-09-01" } ] } }
        ],
        "relationships": {
            "p-1": ["p-2", "ghost", "p-1", 5],
            "p-2": [],
            "ghost": ["p-1"]
        },
        "snapshots": [
            { "id": "s-1", "name": "Monday", "createdAt": 1725000000000u64, "state": {
                "theme": {}, "density": 300, "modules": [], "relationships": {}
            } }
        ]
    })
}

#[test]
fn legacy_blob_is_repaired_field_by_field() {
    let registry = ModuleRegistry::builtin();
    let state = sanitize_value(&legacy_blob(), &registry);

    assert_eq!(state.theme.background, "#101010");
    assert_eq!(state.theme.accent, "#c9a976");
    assert_eq!(state.density, 380);
    assert!(!state.focus_mode);

    let kinds: Vec<_> = state.modules.iter().map(|module| module.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ModuleType::Projects,
            ModuleType::Tasks,
            ModuleType::Notes,
            ModuleType::Journal
        ]
    );
    assert_eq!(state.modules[0].name, "Client work");

    let ModuleData::Projects { items } = &state.modules[0].data else {
        panic!("projects data expected");
    };
    assert_eq!(items[0].id.as_str(), "p-1");
    assert_eq!(items[0].status, ProjectStatus::InProgress);
    assert_eq!(items[0].progress, 100);
    assert_eq!(items[1].status, ProjectStatus::Planning);
    assert_eq!(items[1].progress, 46);
    assert_ne!(items[2].id.as_str(), "p-1");

    assert_eq!(state.modules[1].data.len(), 1);
    assert_eq!(state.modules[2].data.len(), 2);
    assert_eq!(state.modules[3].data.len(), 1);
}

#[test]
fn legacy_item_without_id_gets_stable_id_after_load() {
    let registry = ModuleRegistry::builtin();
    let blob = serde_json::to_string(&legacy_blob()).unwrap();
    let store = MemoryStateStore::with_blob(blob);
    let mut dashboard = Dashboard::load(registry, store.clone());

    let task_id = dashboard.state().modules[1].data.records()[0].id().clone();
    let projects = dashboard.state().modules[0].data.records()[0].id().clone();
    assert!(dashboard.link(&task_id, &projects));

    let reloaded = Dashboard::load(ModuleRegistry::builtin(), store);
    let reloaded_task_id = reloaded.state().modules[1].data.records()[0].id().clone();
    assert_eq!(reloaded_task_id, task_id);
    assert!(reloaded.state().relationships.is_linked(&task_id, &projects));
}

#[test]
fn persisted_relationships_are_filtered_and_symmetrized() {
    let registry = ModuleRegistry::builtin();
    let state = sanitize_value(&legacy_blob(), &registry);
    let p1 = EntityId::parse("p-1").unwrap();
    let p2 = EntityId::parse("p-2").unwrap();

    assert_eq!(state.relationships.pairs(), vec![(p1.clone(), p2.clone())]);
    assert!(state.relationships.is_linked(&p2, &p1));
    assert!(state.relationships.is_consistent());
}

#[test]
fn ids_are_unique_across_the_sanitized_state() {
    let registry = ModuleRegistry::builtin();
    let state = sanitize_value(&legacy_blob(), &registry);

    let mut seen = HashSet::new();
    for module in &state.modules {
        assert!(seen.insert(module.id.clone()));
        for record in module.data.records() {
            assert!(seen.insert(record.id().clone()), "duplicate {}", record.id());
        }
    }
}

#[test]
fn empty_snapshot_module_list_falls_back_to_defaults() {
    let registry = ModuleRegistry::builtin();
    let state = sanitize_value(&legacy_blob(), &registry);

    let snapshot = &state.snapshots[0];
    assert_eq!(snapshot.id.as_str(), "s-1");
    assert_eq!(snapshot.name, "Monday");
    assert_eq!(snapshot.created_at, 1_725_000_000_000);
    assert_eq!(snapshot.state.density, 300);
    assert_eq!(snapshot.state.modules.len(), 3);
}

#[test]
fn sanitize_is_idempotent() {
    let registry = ModuleRegistry::builtin();
    let first = sanitize_value(&legacy_blob(), &registry);
    let second = sanitize_blob(Some(&first.to_json().unwrap()), &registry);
    let third = sanitize_blob(Some(&second.to_json().unwrap()), &registry);

    assert_eq!(second, first);
    assert_eq!(third, second);
}

#[test]
fn default_state_is_a_sanitize_fixed_point() {
    let registry = ModuleRegistry::builtin();
    let defaults = sanitize_blob(None, &registry);
    let reparsed = sanitize_blob(Some(&defaults.to_json().unwrap()), &registry);

    assert_eq!(reparsed, defaults);
}
