//! Bidirectional relationship graph between items.
//!
//! # Responsibility
//! - Store cross-module item links as a flat symmetric adjacency map.
//! - Provide link/unlink/replace-set mutation and liveness cleanup.
//!
//! # Invariants
//! - Symmetric: `b ∈ adj(a)` iff `a ∈ adj(b)`.
//! - No self-loops.
//! - No empty adjacency entries (the map stays sparse).
//!
//! Liveness (every id references an existing, relationship-capable item) is
//! restored by `cleanup`, which callers run after structural changes.

use crate::model::id::EntityId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Link changes applied by one `set_relationships` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipChange {
    pub linked: Vec<EntityId>,
    pub unlinked: Vec<EntityId>,
}

impl RelationshipChange {
    pub fn is_empty(&self) -> bool {
        self.linked.is_empty() && self.unlinked.is_empty()
    }
}

/// Symmetric adjacency map keyed by item id.
///
/// Serialized as `{ "<itemId>": ["<itemId>", ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RelationshipGraph {
    adjacency: BTreeMap<EntityId, BTreeSet<EntityId>>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from untrusted adjacency pairs.
    ///
    /// Pairs touching an id outside `live` are dropped, self-loops are
    /// dropped, and every remaining pair is stored in both directions.
    pub fn from_pairs<I>(pairs: I, live: &BTreeSet<EntityId>) -> Self
    where
        I: IntoIterator<Item = (EntityId, EntityId)>,
    {
        let mut graph = Self::new();
        for (a, b) in pairs {
            if live.contains(&a) && live.contains(&b) {
                graph.link(&a, &b);
            }
        }
        graph
    }

    /// Links `a` and `b` in both directions.
    ///
    /// Returns `false` for self-links and already-linked pairs.
    pub fn link(&mut self, a: &EntityId, b: &EntityId) -> bool {
        if a == b {
            return false;
        }
        let inserted = self
            .adjacency
            .entry(a.clone())
            .or_default()
            .insert(b.clone());
        self.adjacency
            .entry(b.clone())
            .or_default()
            .insert(a.clone());
        inserted
    }

    /// Removes both directions of the `a`-`b` link.
    ///
    /// Returns whether a link existed. Emptied entries are removed.
    pub fn unlink(&mut self, a: &EntityId, b: &EntityId) -> bool {
        let removed_forward = self.remove_member(a, b);
        let removed_backward = self.remove_member(b, a);
        removed_forward || removed_backward
    }

    /// Replaces the link set of `item_id` with `targets`.
    ///
    /// Duplicates and self-references in `targets` are ignored. Only the
    /// difference between the current and requested sets is applied.
    pub fn set_relationships<I>(&mut self, item_id: &EntityId, targets: I) -> RelationshipChange
    where
        I: IntoIterator<Item = EntityId>,
    {
        let requested: BTreeSet<EntityId> = targets
            .into_iter()
            .filter(|target| target != item_id)
            .collect();
        let current: BTreeSet<EntityId> = self.neighbors(item_id).cloned().collect();

        let mut change = RelationshipChange::default();
        for stale in current.difference(&requested) {
            if self.unlink(item_id, stale) {
                change.unlinked.push(stale.clone());
            }
        }
        for fresh in requested.difference(&current) {
            if self.link(item_id, fresh) {
                change.linked.push(fresh.clone());
            }
        }
        change
    }

    /// Drops every key and member that is not in `live`.
    ///
    /// Returns the number of removed link directions.
    pub fn cleanup(&mut self, live: &BTreeSet<EntityId>) -> usize {
        let mut removed = 0;
        self.adjacency.retain(|key, members| {
            if !live.contains(key) {
                removed += members.len();
                return false;
            }
            let before = members.len();
            members.retain(|member| live.contains(member));
            removed += before - members.len();
            !members.is_empty()
        });
        removed
    }

    /// Ids linked to `item_id`, in id order.
    pub fn neighbors<'a>(&'a self, item_id: &EntityId) -> impl Iterator<Item = &'a EntityId> + 'a {
        self.adjacency
            .get(item_id)
            .into_iter()
            .flat_map(|members| members.iter())
    }

    pub fn is_linked(&self, a: &EntityId, b: &EntityId) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|members| members.contains(b))
    }

    pub fn contains_key(&self, item_id: &EntityId) -> bool {
        self.adjacency.contains_key(item_id)
    }

    /// Number of items with at least one link.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Number of undirected links.
    pub fn link_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Undirected links as `(smaller, larger)` id pairs.
    pub fn pairs(&self) -> Vec<(EntityId, EntityId)> {
        self.adjacency
            .iter()
            .flat_map(|(key, members)| {
                members
                    .iter()
                    .filter(move |member| key < *member)
                    .map(move |member| (key.clone(), member.clone()))
            })
            .collect()
    }

    /// Checks symmetry, absence of self-loops and sparseness.
    pub fn is_consistent(&self) -> bool {
        self.adjacency.iter().all(|(key, members)| {
            !members.is_empty()
                && !members.contains(key)
                && members.iter().all(|member| self.is_linked(member, key))
        })
    }

    fn remove_member(&mut self, key: &EntityId, member: &EntityId) -> bool {
        let Some(members) = self.adjacency.get_mut(key) else {
            return false;
        };
        let removed = members.remove(member);
        if members.is_empty() {
            self.adjacency.remove(key);
        }
        removed
    }
}
