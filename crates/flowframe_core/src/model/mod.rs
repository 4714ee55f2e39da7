//! Dashboard domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep typed shapes for every module type behind one module envelope.
//!
//! # Invariants
//! - Every module, item, journal entry and snapshot is identified by a stable
//!   `EntityId`.
//! - Typed records are built from persisted data only through `sanitize`.

pub mod id;
pub mod item;
pub mod module;
pub mod state;
