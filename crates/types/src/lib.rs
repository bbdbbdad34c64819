// crates/types/src/lib.rs
//! Shared data model for taskboard: the row and value types that the
//! store, sync engine, view-model, and edit coordinator all pass around.
//!
//! Kept dependency-light (serde + chrono only) so every other crate in the
//! workspace can depend on it without pulling in sqlx or reqwest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One labelled entry of a single-select or iteration option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub id: String,
    pub name: String,
}

/// A date-valued project field: which field produced the value, its id
/// (resolved lazily, see `taskboard-coordinator`), and the ISO date string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateField {
    pub field_name: String,
    pub field_id: Option<String>,
    /// Empty string or a parseable `YYYY-MM-DD`. Never absent-as-null.
    pub date: String,
}

/// A single-select project field (`status`, `priority`, ...), with its
/// option list cached and a pending-write shadow for optimistic edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectField {
    pub field_id: Option<String>,
    pub option_id: Option<String>,
    pub option_name: String,
    pub options: Vec<OptionEntry>,
    pub dirty: bool,
    pub pending_option_id: Option<String>,
}

/// An iteration-valued project field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationField {
    pub field_name: String,
    pub field_id: Option<String>,
    pub iteration_id: Option<String>,
    pub title: String,
    pub start_date: String,
    pub duration_days: i64,
    pub options: Vec<IterationOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationOption {
    pub id: String,
    pub title: String,
    pub start_date: String,
    pub duration_days: i64,
}

/// The effective people assigned to a task: union of the project's people
/// field and the issue/PR's own assignee list (spec.md §4.3 step 3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeopleField {
    pub field_id: Option<String>,
    pub user_ids: Vec<String>,
    pub logins: Vec<String>,
}

/// One item (issue, PR, or draft) from one project board.
///
/// The unique key is `(owner_type, owner, project_number, title, url,
/// start_field, start_date)` per spec.md §3 — re-ingesting the same
/// logical row updates mutable columns only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    // Key tuple
    pub owner_type: OwnerType,
    pub owner: String,
    pub project_number: i64,
    pub title: String,
    pub url: String,
    pub start_field: String,
    pub start_date: String,

    // Identifying
    pub project_id: String,
    pub project_title: String,
    /// The `ProjectV2Item` node id — the target of project-field
    /// mutations (status, priority, dates, iteration).
    pub item_id: String,
    /// The underlying Issue/PullRequest node id — the target of label,
    /// assignee, and comment mutations. Empty for draft issues, which
    /// support none of those.
    pub content_id: String,
    pub repository: String,

    // Schedule (start is carried redundantly via the key tuple fields above
    // for SQL indexing; `start` also exists as a full DateField so the
    // coordinator has a field_id to mutate through).
    pub start: DateField,
    pub end: DateField,
    pub focus: DateField,

    // Iteration
    pub iteration: IterationField,

    // Single-select fields
    pub status: SelectField,
    pub priority: SelectField,

    // People
    pub people: PeopleField,
    pub assigned_to_me: bool,
    pub created_by_me: bool,

    // Labels
    pub labels: Vec<String>,

    // Bookkeeping
    pub updated_at: DateTime<Utc>,
    pub is_done: bool,
    /// Set by every sync run that observes this row; used for tombstone-
    /// style reconciliation per SPEC_FULL.md's resolved Open Question 1.
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Org,
    User,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Org => "org",
            OwnerType::User => "user",
        }
    }
}

impl std::fmt::Display for OwnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OwnerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "org" => Ok(OwnerType::Org),
            "user" => Ok(OwnerType::User),
            other => Err(format!("unknown owner type: {other}")),
        }
    }
}

/// The fixed, case-insensitive word set that marks a status as "done"
/// per spec.md §3 invariants, interpreted as substring containment per
/// SPEC_FULL.md's reading of `original_source`.
pub const DONE_WORDS: &[&str] = &[
    "done",
    "complete",
    "closed",
    "merged",
    "finished",
    "\u{2705}", // ✅
    "\u{2714}", // ✔
];

/// Whether a status string counts as "done" (case-insensitive substring
/// match against `DONE_WORDS`).
pub fn is_done_status(status: &str) -> bool {
    let lower = status.to_lowercase();
    DONE_WORDS.iter().any(|w| lower.contains(&w.to_lowercase()))
}

/// A half-open work interval `[started_at, ended_at)` attributed to one
/// task URL. `ended_at == None` means the session is currently running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: i64,
    pub task_url: String,
    pub project_title: String,
    pub labels: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl WorkSession {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerEventType {
    Start,
    Stop,
}

impl TimerEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerEventType::Start => "start",
            TimerEventType::Stop => "stop",
        }
    }
}

/// Append-only audit record of a timer start/stop, used for traceability
/// only — duration math always goes through `WorkSession`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEvent {
    pub id: i64,
    pub task_url: String,
    pub at: DateTime<Utc>,
    pub event_type: TimerEventType,
}

/// The mutable field classes that have their own pending-write shadow
/// (spec.md §4.4). Used as a map key by the edit coordinator and as a
/// dispatch tag by the store's per-class `update_*`/`reset_*` functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    Status,
    Priority,
    StartDate,
    EndDate,
    FocusDate,
    Iteration,
    Labels,
    Assignees,
}

impl FieldClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldClass::Status => "status",
            FieldClass::Priority => "priority",
            FieldClass::StartDate => "start_date",
            FieldClass::EndDate => "end_date",
            FieldClass::FocusDate => "focus_date",
            FieldClass::Iteration => "iteration",
            FieldClass::Labels => "labels",
            FieldClass::Assignees => "assignees",
        }
    }

    pub const ALL: [FieldClass; 8] = [
        FieldClass::Status,
        FieldClass::Priority,
        FieldClass::StartDate,
        FieldClass::EndDate,
        FieldClass::FocusDate,
        FieldClass::Iteration,
        FieldClass::Labels,
        FieldClass::Assignees,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_status_matches_substring_case_insensitively() {
        assert!(is_done_status("Done"));
        assert!(is_done_status("✅ Done"));
        assert!(is_done_status("Closed (duplicate)"));
        assert!(is_done_status("MERGED"));
        assert!(!is_done_status("In Progress"));
        assert!(!is_done_status(""));
    }

    #[test]
    fn owner_type_round_trips_through_str() {
        assert_eq!("org".parse::<OwnerType>().unwrap(), OwnerType::Org);
        assert_eq!("user".parse::<OwnerType>().unwrap(), OwnerType::User);
        assert!("nope".parse::<OwnerType>().is_err());
        assert_eq!(OwnerType::Org.to_string(), "org");
    }

    #[test]
    fn work_session_open_iff_no_end() {
        let s = WorkSession {
            id: 1,
            task_url: "https://example/1".into(),
            project_title: "Roadmap".into(),
            labels: vec![],
            started_at: Utc::now(),
            ended_at: None,
        };
        assert!(s.is_open());
    }
}
