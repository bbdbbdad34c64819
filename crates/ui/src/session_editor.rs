// crates/ui/src/session_editor.rs
//! Browsing and editing the work-session log for a single task (spec.md
//! §4.3 "Timer"). A flat list keyed by session id, since sessions have no
//! natural nesting.

use chrono::{DateTime, Utc};
use taskboard_types::WorkSession;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEditorState {
    pub task_url: String,
    pub sessions: Vec<WorkSession>,
    pub cursor: usize,
    pub editing: Option<SessionEdit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEdit {
    pub session_id: i64,
    pub started_buffer: String,
    pub ended_buffer: String,
    pub field: EditField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Started,
    Ended,
}

impl SessionEditorState {
    pub fn new(task_url: impl Into<String>, sessions: Vec<WorkSession>) -> Self {
        Self { task_url: task_url.into(), sessions, cursor: 0, editing: None }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.sessions.is_empty() {
            return;
        }
        let len = self.sessions.len() as isize;
        let next = ((self.cursor as isize + delta) % len + len) % len;
        self.cursor = next as usize;
    }

    pub fn selected(&self) -> Option<&WorkSession> {
        self.sessions.get(self.cursor)
    }

    pub fn remove_selected(&mut self) -> Option<WorkSession> {
        if self.cursor >= self.sessions.len() {
            return None;
        }
        let removed = self.sessions.remove(self.cursor);
        if self.cursor > 0 && self.cursor >= self.sessions.len() {
            self.cursor = self.sessions.len().saturating_sub(1);
        }
        Some(removed)
    }

    pub fn begin_edit(&mut self) {
        let Some(session) = self.selected() else { return };
        self.editing = Some(SessionEdit {
            session_id: session.id,
            started_buffer: session.started_at.to_rfc3339(),
            ended_buffer: session.ended_at.map(|e| e.to_rfc3339()).unwrap_or_default(),
            field: EditField::Started,
        });
    }
}

/// Parses the buffer `SessionEdit` collects back into a timestamp,
/// accepting RFC3339 only — the session editor doesn't try to guess
/// looser formats the way the date filter does.
pub fn parse_timestamp(buffer: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(buffer).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: i64) -> WorkSession {
        WorkSession {
            id,
            task_url: "https://x/1".into(),
            project_title: "Roadmap".into(),
            labels: vec![],
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    #[test]
    fn remove_selected_clamps_cursor_to_new_last_row() {
        let mut s = SessionEditorState::new("https://x/1", vec![session(1), session(2)]);
        s.cursor = 1;
        let removed = s.remove_selected();
        assert_eq!(removed.unwrap().id, 2);
        assert_eq!(s.cursor, 0);
    }

    #[test]
    fn parse_timestamp_rejects_non_rfc3339_input() {
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2026-03-01T10:00:00Z").is_some());
    }
}
