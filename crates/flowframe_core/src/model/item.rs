//! Item records owned by module data collections.
//!
//! # Responsibility
//! - Define one record type per module item shape.
//! - Provide a uniform accessor contract (`ItemAccess`) for the registry,
//!   relationship resolution and presentation.
//! - Coerce untyped persisted item values into typed records.
//!
//! # Invariants
//! - Every record carries an `EntityId`; coercion claims ids through an
//!   `IdLedger` so missing or duplicate ids are replaced.
//! - `Project::progress` is always within `0..=100`.

use crate::model::id::{EntityId, IdLedger};
use serde::Serialize;
use serde_json::{Map, Value};

const UNTITLED: &str = "Untitled";
const NOTE_SUBTITLE_MAX_CHARS: usize = 80;

/// Uniform item accessor used across module types.
pub trait ItemAccess {
    fn id(&self) -> &EntityId;
    fn set_id(&mut self, id: EntityId);
    /// Primary display label.
    fn title(&self) -> String;
    /// Secondary display label.
    fn subtitle(&self) -> String;
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ProjectStatus {
    #[default]
    Planning,
    #[serde(rename = "In progress")]
    InProgress,
    Blocked,
    Complete,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::InProgress => "In progress",
            Self::Blocked => "Blocked",
            Self::Complete => "Complete",
        }
    }

    /// Parses the display form used in persisted blobs.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Planning" => Some(Self::Planning),
            "In progress" => Some(Self::InProgress),
            "Blocked" => Some(Self::Blocked),
            "Complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

/// Multi-step project tracked in a `projects` module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: EntityId,
    pub title: String,
    pub status: ProjectStatus,
    pub owner: String,
    /// Completion percentage, clamped to `0..=100`.
    pub progress: u8,
    /// `YYYY-MM-DD`, empty when unset.
    pub due: String,
    pub note: String,
}

impl Project {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            title: title.into(),
            status: ProjectStatus::Planning,
            owner: String::new(),
            progress: 0,
            due: String::new(),
            note: String::new(),
        }
    }

    pub(crate) fn from_value(raw: &Map<String, Value>, ids: &mut IdLedger) -> Self {
        Self {
            id: ids.claim(EntityId::from_value(raw.get("id"))),
            title: string_field(raw, "title"),
            status: raw
                .get("status")
                .and_then(Value::as_str)
                .and_then(ProjectStatus::parse)
                .unwrap_or_default(),
            owner: string_field(raw, "owner"),
            progress: progress_field(raw.get("progress")),
            due: string_field(raw, "due"),
            note: string_field(raw, "note"),
        }
    }
}

impl ItemAccess for Project {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> String {
        display_or_untitled(&self.title)
    }

    fn subtitle(&self) -> String {
        if self.owner.trim().is_empty() {
            self.status.as_str().to_string()
        } else {
            format!("{} · {}", self.status.as_str(), self.owner.trim())
        }
    }
}

/// Actionable step tracked in a `tasks` module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub done: bool,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            title: title.into(),
            done: false,
        }
    }

    pub(crate) fn from_value(raw: &Map<String, Value>, ids: &mut IdLedger) -> Self {
        Self {
            id: ids.claim(EntityId::from_value(raw.get("id"))),
            title: string_field(raw, "title"),
            done: truthy(raw.get("done")),
        }
    }
}

impl ItemAccess for Task {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> String {
        display_or_untitled(&self.title)
    }

    fn subtitle(&self) -> String {
        let label = if self.done { "Done" } else { "Open" };
        label.to_string()
    }
}

/// Free-form note card in a `notes` module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: EntityId,
    pub title: String,
    pub body: String,
}

impl Note {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            title: title.into(),
            body: body.into(),
        }
    }

    pub(crate) fn from_value(raw: &Map<String, Value>, ids: &mut IdLedger) -> Self {
        Self {
            id: ids.claim(EntityId::from_value(raw.get("id"))),
            title: string_field(raw, "title"),
            body: string_field(raw, "body"),
        }
    }
}

impl ItemAccess for Note {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> String {
        display_or_untitled(&self.title)
    }

    fn subtitle(&self) -> String {
        let flattened = self.body.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut summary = flattened
            .chars()
            .take(NOTE_SUBTITLE_MAX_CHARS)
            .collect::<String>();
        if flattened.chars().count() > NOTE_SUBTITLE_MAX_CHARS {
            summary.push_str("...");
        }
        summary
    }
}

/// Client relationship tracked in a `clients` module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Client {
    pub id: EntityId,
    pub name: String,
    pub company: String,
    pub email: String,
    pub status: String,
}

impl Client {
    pub const DEFAULT_STATUS: &'static str = "Active";

    pub fn new(name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.into(),
            company: company.into(),
            email: String::new(),
            status: Self::DEFAULT_STATUS.to_string(),
        }
    }

    pub(crate) fn from_value(raw: &Map<String, Value>, ids: &mut IdLedger) -> Self {
        let status = string_field(raw, "status");
        Self {
            id: ids.claim(EntityId::from_value(raw.get("id"))),
            name: string_field(raw, "name"),
            company: string_field(raw, "company"),
            email: string_field(raw, "email"),
            status: if status.trim().is_empty() {
                Self::DEFAULT_STATUS.to_string()
            } else {
                status
            },
        }
    }
}

impl ItemAccess for Client {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> String {
        display_or_untitled(&self.name)
    }

    fn subtitle(&self) -> String {
        if self.company.trim().is_empty() {
            self.status.clone()
        } else {
            self.company.trim().to_string()
        }
    }
}

/// Dated reflection in a `journal` module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub id: EntityId,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub body: String,
}

impl JournalEntry {
    pub fn new(date: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            date: date.into(),
            body: body.into(),
        }
    }

    pub(crate) fn from_value(raw: &Map<String, Value>, ids: &mut IdLedger) -> Self {
        Self {
            id: ids.claim(EntityId::from_value(raw.get("id"))),
            date: string_field(raw, "date"),
            body: string_field(raw, "body"),
        }
    }
}

impl ItemAccess for JournalEntry {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn title(&self) -> String {
        display_or_untitled(&self.date)
    }

    fn subtitle(&self) -> String {
        self.body.lines().next().unwrap_or_default().trim().to_string()
    }
}

/// Reads a string field; non-string values coerce to empty.
pub(crate) fn string_field(raw: &Map<String, Value>, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}

/// Loose truthiness for legacy boolean-ish fields.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

pub(crate) fn clamp_progress(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn progress_field(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Number(number)) => number.as_f64().map_or(0, clamp_progress),
        Some(Value::String(text)) => text.trim().parse::<f64>().map_or(0, clamp_progress),
        _ => 0,
    }
}

fn display_or_untitled(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{clamp_progress, ItemAccess, Note, Project, ProjectStatus, Task};
    use crate::model::id::IdLedger;
    use serde_json::json;

    #[test]
    fn project_coercion_clamps_progress_and_defaults_status() {
        let raw = json!({
            "title": "Launch",
            "status": "Someday",
            "progress": 180,
            "owner": 7,
        });
        let mut ids = IdLedger::new();
        let project = Project::from_value(raw.as_object().unwrap(), &mut ids);

        assert_eq!(project.title, "Launch");
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.progress, 100);
        assert_eq!(project.owner, "7");
        assert!(ids.contains(&project.id));
    }

    #[test]
    fn project_status_round_trips_display_form() {
        for status in [
            ProjectStatus::Planning,
            ProjectStatus::InProgress,
            ProjectStatus::Blocked,
            ProjectStatus::Complete,
        ] {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(
            serde_json::to_string(&ProjectStatus::InProgress).unwrap(),
            "\"In progress\""
        );
    }

    #[test]
    fn task_done_uses_loose_truthiness() {
        let mut ids = IdLedger::new();
        let done = Task::from_value(json!({"title": "a", "done": 1}).as_object().unwrap(), &mut ids);
        let open = Task::from_value(json!({"title": "b", "done": null}).as_object().unwrap(), &mut ids);
        assert!(done.done);
        assert!(!open.done);
        assert_eq!(done.subtitle(), "Done");
        assert_eq!(open.subtitle(), "Open");
    }

    #[test]
    fn blank_titles_display_as_untitled() {
        let note = Note::new("  ", "body");
        assert_eq!(note.title(), "Untitled");
    }

    #[test]
    fn note_subtitle_flattens_and_truncates_body() {
        let body = format!("first line\nsecond {}", "x".repeat(100));
        let note = Note::new("n", body);
        let subtitle = note.subtitle();
        assert!(!subtitle.contains('\n'));
        assert!(subtitle.ends_with("..."));
    }

    #[test]
    fn clamp_progress_handles_non_finite_values() {
        assert_eq!(clamp_progress(f64::NAN), 0);
        assert_eq!(clamp_progress(-5.0), 0);
        assert_eq!(clamp_progress(64.4), 64);
    }
}
