//! Identifier model and generator.
//!
//! # Responsibility
//! - Provide one opaque identifier type for modules, items and snapshots.
//! - Generate collision-resistant fresh identifiers.
//! - Track claimed identifiers while filling gaps during sanitize passes.
//!
//! # Invariants
//! - A valid identifier is a non-blank string.
//! - Generated identifiers are never reused within a process lifetime.
//! - Existing valid identifiers are preserved verbatim (legacy forms included).

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque stable identifier.
///
/// Serialized as a plain JSON string. Only constructible through `generate`
/// and `parse`, so a held `EntityId` is never blank. No ordering semantics are
/// implied by the value; `Ord` exists only so ids can key deterministic maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generates a fresh UUID v4 backed identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier value.
    ///
    /// Returns `None` when the value is blank.
    pub fn parse(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return None;
        }
        Some(Self(value))
    }

    /// Reads an identifier from an untyped persisted value.
    ///
    /// Only non-blank JSON strings are accepted.
    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        value
            .and_then(Value::as_str)
            .and_then(|raw| Self::parse(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Claimed-id tracker for one sanitize or normalize pass.
///
/// First valid occurrence of an id wins; later duplicates and missing ids are
/// replaced with generated ones.
#[derive(Debug, Default)]
pub struct IdLedger {
    claimed: HashSet<EntityId>,
}

impl IdLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `candidate` when valid and unclaimed, otherwise generates one.
    pub fn claim(&mut self, candidate: Option<EntityId>) -> EntityId {
        if let Some(id) = candidate {
            if self.claimed.insert(id.clone()) {
                return id;
            }
        }
        self.fresh()
    }

    /// Keeps an already-typed id when unclaimed, otherwise replaces it.
    pub fn claim_existing(&mut self, id: &EntityId) -> EntityId {
        self.claim(Some(id.clone()))
    }

    /// Generates and claims a fresh identifier.
    pub fn fresh(&mut self) -> EntityId {
        loop {
            let id = EntityId::generate();
            if self.claimed.insert(id.clone()) {
                return id;
            }
        }
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.claimed.contains(id)
    }
}
