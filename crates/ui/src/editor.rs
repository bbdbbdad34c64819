// crates/ui/src/editor.rs
//! The task-editor sub-state-machine: a field list that drills into one
//! per-field-class editor, mirroring the coordinator's own per-field-class
//! split (`FieldClass::ALL`) rather than one monolithic edit form.

use taskboard_types::FieldClass;

/// Rows shown by `TaskEditorState::List`, in display order.
pub const TASK_EDITOR_FIELDS: &[&str] = &[
    "Status",
    "Priority",
    "Start date",
    "End date",
    "Focus date",
    "Iteration",
    "Labels",
    "Assignees",
    "Comment",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEditorState {
    List {
        url: String,
        field_index: usize,
    },
    EditDate {
        url: String,
        class: FieldClass,
        buffer: String,
    },
    StatusSelect {
        url: String,
        index: usize,
    },
    PrioritySelect {
        url: String,
        index: usize,
    },
    IterationSelect {
        url: String,
        index: usize,
    },
    EditLabels(ChoiceEditorState),
    EditAssignees(ChoiceEditorState),
    EditComment {
        url: String,
        buffer: String,
    },
}

impl TaskEditorState {
    pub fn list(url: impl Into<String>) -> Self {
        TaskEditorState::List { url: url.into(), field_index: 0 }
    }

    pub fn url(&self) -> &str {
        match self {
            TaskEditorState::List { url, .. }
            | TaskEditorState::EditDate { url, .. }
            | TaskEditorState::StatusSelect { url, .. }
            | TaskEditorState::PrioritySelect { url, .. }
            | TaskEditorState::IterationSelect { url, .. }
            | TaskEditorState::EditComment { url, .. } => url,
            TaskEditorState::EditLabels(s) | TaskEditorState::EditAssignees(s) => &s.url,
        }
    }
}

/// Shared shape for the label/assignee multi-choice editors: a
/// cancellable async fetch populates `choices`, then arrow keys move a
/// cursor and space toggles membership in `selected`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceEditorState {
    pub url: String,
    pub loading: bool,
    /// `(id, display name)` pairs once the fetch resolves.
    pub choices: Vec<(String, String)>,
    pub selected: Vec<String>,
    pub cursor: usize,
    pub error: Option<String>,
}

impl ChoiceEditorState {
    pub fn loading(url: impl Into<String>, selected: Vec<String>) -> Self {
        Self {
            url: url.into(),
            loading: true,
            choices: Vec::new(),
            selected,
            cursor: 0,
            error: None,
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.choices.is_empty() {
            return;
        }
        let len = self.choices.len() as isize;
        let next = ((self.cursor as isize + delta) % len + len) % len;
        self.cursor = next as usize;
    }

    pub fn toggle_at_cursor(&mut self) {
        let Some((_, name)) = self.choices.get(self.cursor) else { return };
        if let Some(pos) = self.selected.iter().position(|s| s == name) {
            self.selected.remove(pos);
        } else {
            self.selected.push(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_editor_toggles_membership() {
        let mut s = ChoiceEditorState::loading("https://x/1", vec![]);
        s.choices = vec![("L1".into(), "bug".into()), ("L2".into(), "docs".into())];
        s.toggle_at_cursor();
        assert_eq!(s.selected, vec!["bug".to_string()]);
        s.toggle_at_cursor();
        assert!(s.selected.is_empty());
    }

    #[test]
    fn choice_editor_cursor_wraps() {
        let mut s = ChoiceEditorState::loading("https://x/1", vec![]);
        s.choices = vec![("L1".into(), "bug".into()), ("L2".into(), "docs".into())];
        s.move_cursor(-1);
        assert_eq!(s.cursor, 1);
        s.move_cursor(1);
        assert_eq!(s.cursor, 0);
    }
}
