use flowframe_core::{
    Dashboard, EntityId, ItemAccess, JournalEntry, MemoryStateStore, ModuleData, ModuleRegistry,
    ModuleType, Project,
};
use pretty_assertions::assert_eq;

fn dashboard() -> Dashboard<MemoryStateStore> {
    Dashboard::load(ModuleRegistry::builtin(), MemoryStateStore::new())
}

fn module_id(dashboard: &Dashboard<MemoryStateStore>, kind: ModuleType) -> EntityId {
    dashboard
        .state()
        .modules
        .iter()
        .find(|module| module.kind == kind)
        .map(|module| module.id.clone())
        .unwrap()
}

fn item_ids(dashboard: &Dashboard<MemoryStateStore>, kind: ModuleType) -> Vec<EntityId> {
    dashboard
        .state()
        .modules
        .iter()
        .find(|module| module.kind == kind)
        .map(|module| {
            module
                .data
                .records()
                .into_iter()
                .map(|item| item.id().clone())
                .collect()
        })
        .unwrap()
}

#[test]
fn linking_two_projects_is_visible_from_both_sides() {
    let mut dashboard = dashboard();
    let projects = item_ids(&dashboard, ModuleType::Projects);
    let (p1, p2) = (&projects[0], &projects[1]);

    assert!(dashboard.link(p1, p2));

    let from_p1 = dashboard.related_to(p1);
    assert_eq!(from_p1.len(), 1);
    assert_eq!(&from_p1[0].item_id, p2);
    assert_eq!(from_p1[0].title, "Automation rituals");
    assert_eq!(from_p1[0].subtitle, "Planning · Ops");
    assert_eq!(from_p1[0].module_label, "Projects");

    let from_p2 = dashboard.related_to(p2);
    assert_eq!(from_p2.len(), 1);
    assert_eq!(&from_p2[0].item_id, p1);
    assert!(dashboard.state().relationships.is_consistent());
}

#[test]
fn deleting_an_item_removes_it_from_every_adjacency() {
    let mut dashboard = dashboard();
    let projects = item_ids(&dashboard, ModuleType::Projects);
    let tasks = item_ids(&dashboard, ModuleType::Tasks);
    let (p1, p2) = (projects[0].clone(), projects[1].clone());
    dashboard.link(&p1, &p2);
    dashboard.link(&p2, &tasks[0]);

    let projects_module = module_id(&dashboard, ModuleType::Projects);
    let removed_id = p2.clone();
    let outcome = dashboard.mutate_and_notify(&projects_module, move |module| {
        module.data.remove_item(&removed_id);
        Ok(())
    });
    assert!(outcome.is_applied());

    let graph = &dashboard.state().relationships;
    assert!(!graph.contains_key(&p2));
    assert!(!graph.contains_key(&p1));
    assert!(!graph.contains_key(&tasks[0]));
    assert!(graph.is_empty());
    assert!(dashboard.related_to(&p1).is_empty());
}

#[test]
fn removing_a_module_drops_links_to_its_items() {
    let mut dashboard = dashboard();
    let projects = item_ids(&dashboard, ModuleType::Projects);
    let notes = item_ids(&dashboard, ModuleType::Notes);
    dashboard.link(&projects[0], &notes[0]);
    dashboard.link(&projects[0], &projects[1]);

    let notes_module = module_id(&dashboard, ModuleType::Notes);
    assert!(dashboard.remove_module(&notes_module));

    let related: Vec<_> = dashboard
        .related_to(&projects[0])
        .into_iter()
        .map(|item| item.item_id)
        .collect();
    assert_eq!(related, vec![projects[1].clone()]);
    assert!(!dashboard.state().relationships.contains_key(&notes[0]));
}

#[test]
fn related_items_follow_module_display_order() {
    let mut dashboard = dashboard();
    let projects = item_ids(&dashboard, ModuleType::Projects);
    let tasks = item_ids(&dashboard, ModuleType::Tasks);
    let notes = item_ids(&dashboard, ModuleType::Notes);

    dashboard.set_relationships(
        &tasks[0],
        [notes[1].clone(), projects[1].clone(), notes[0].clone()],
    );
    let order: Vec<_> = dashboard
        .related_to(&tasks[0])
        .into_iter()
        .map(|item| item.item_id)
        .collect();
    assert_eq!(order, vec![projects[1].clone(), notes[0].clone(), notes[1].clone()]);

    let notes_module = module_id(&dashboard, ModuleType::Notes);
    let projects_module = module_id(&dashboard, ModuleType::Projects);
    assert!(dashboard.move_module(&notes_module, Some(&projects_module)));
    let order: Vec<_> = dashboard
        .related_to(&tasks[0])
        .into_iter()
        .map(|item| item.item_id)
        .collect();
    assert_eq!(order, vec![notes[0].clone(), notes[1].clone(), projects[1].clone()]);
}

#[test]
fn set_relationships_replaces_previous_targets() {
    let mut dashboard = dashboard();
    let tasks = item_ids(&dashboard, ModuleType::Tasks);
    let (a, b, c) = (&tasks[0], &tasks[1], &tasks[2]);
    let projects = item_ids(&dashboard, ModuleType::Projects);
    let d = &projects[0];

    dashboard.set_relationships(a, [b.clone(), c.clone()]);
    let change = dashboard.set_relationships(a, [c.clone(), d.clone(), a.clone()]);

    assert_eq!(change.linked, vec![d.clone()]);
    assert_eq!(change.unlinked, vec![b.clone()]);
    let graph = &dashboard.state().relationships;
    assert!(graph.is_linked(a, c));
    assert!(graph.is_linked(a, d));
    assert!(!graph.is_linked(a, b));
    assert!(!graph.contains_key(b));
    assert!(!graph.is_linked(a, a));
}

#[test]
fn journal_entries_cannot_participate_in_links() {
    let mut dashboard = dashboard();
    let journal_module = dashboard.add_module(ModuleType::Journal).unwrap();
    let entry = JournalEntry::new("2024-09-02", "Quiet focus block");
    let entry_id = entry.id.clone();
    dashboard.mutate_quietly(&journal_module, move |module| {
        if let ModuleData::Journal { entries, .. } = &mut module.data {
            entries.push(entry);
        }
        Ok(())
    });
    let tasks = item_ids(&dashboard, ModuleType::Tasks);

    assert!(!dashboard.link(&entry_id, &tasks[0]));
    assert!(!dashboard.link(&tasks[0], &entry_id));
    let change = dashboard.set_relationships(&tasks[0], [entry_id.clone()]);
    assert!(change.is_empty());
    assert!(dashboard.set_relationships(&entry_id, [tasks[0].clone()]).is_empty());
    assert!(dashboard.state().relationships.is_empty());
}

#[test]
fn unknown_ids_are_silent_no_ops() {
    let mut dashboard = dashboard();
    let tasks = item_ids(&dashboard, ModuleType::Tasks);
    let ghost = EntityId::generate();
    let writes_before = dashboard.store().write_count();

    assert!(!dashboard.link(&tasks[0], &ghost));
    assert!(!dashboard.unlink(&tasks[0], &ghost));
    assert!(dashboard.related_to(&ghost).is_empty());
    assert_eq!(dashboard.store().write_count(), writes_before);
}

#[test]
fn link_candidates_exclude_source_and_journal() {
    let mut dashboard = dashboard();
    dashboard.add_module(ModuleType::Journal).unwrap();
    let projects = item_ids(&dashboard, ModuleType::Projects);

    let candidates = dashboard.link_candidates(&projects[0]);
    assert_eq!(candidates.len(), 2 + 3 + 2 - 1);
    assert!(candidates.iter().all(|item| item.item_id != projects[0]));
    assert!(candidates
        .iter()
        .all(|item| item.module_type != ModuleType::Journal));
}

#[test]
fn new_items_added_through_mutation_become_linkable() {
    let mut dashboard = dashboard();
    let projects_module = module_id(&dashboard, ModuleType::Projects);
    let project = Project::new("Quarterly review");
    let project_id = project.id.clone();
    dashboard.mutate_and_notify(&projects_module, move |module| {
        if let ModuleData::Projects { items } = &mut module.data {
            items.push(project);
        }
        Ok(())
    });
    let notes = item_ids(&dashboard, ModuleType::Notes);

    assert!(dashboard.link(&project_id, &notes[0]));
    assert_eq!(dashboard.related_to(&notes[0])[0].title, "Quarterly review");
}
