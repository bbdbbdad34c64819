// crates/ui/src/state.rs
//! The top-level UI state machine: a single `Mode` enum gates which keymap
//! is active, layered over the `AppState` that every mode shares (the row
//! set, filters, sort, selection).

use chrono::NaiveDate;
use taskboard_types::Task;
use taskboard_viewmodel::{visible_rows, Filters, Selection, SortKey};

use crate::add::AddState;
use crate::editor::TaskEditorState;
use crate::report::ReportState;
use crate::session_editor::SessionEditorState;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Browse,
    Search(String),
    DateFilter(String),
    Detail,
    Help,
    Add(AddState),
    TaskEditor(TaskEditorState),
    SessionEditor(SessionEditorState),
    Report(ReportState),
}

pub struct AppState {
    pub tasks: Vec<Task>,
    pub filters: Filters,
    pub sort_key: SortKey,
    pub selection: Selection,
    pub mode: Mode,
    pub status_line: String,
    pub theme_index: usize,
    pub today: NaiveDate,
    pub quit: bool,
}

impl AppState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            tasks: Vec::new(),
            filters: Filters::default(),
            sort_key: SortKey::default(),
            selection: Selection::new(),
            mode: Mode::Browse,
            status_line: String::new(),
            theme_index: 0,
            today,
            quit: false,
        }
    }

    pub fn visible(&self) -> Vec<&Task> {
        visible_rows(&self.tasks, &self.filters, self.today, self.sort_key)
    }

    pub fn selected(&self) -> Option<&Task> {
        let rows = self.visible();
        let idx = self.selection.index_in(&rows)?;
        rows.into_iter().nth(idx)
    }

    /// Replaces the row set after a load or sync, then re-derives the
    /// selection against the new visible set so it never points at a row
    /// that no longer exists.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        let rows = self.visible();
        self.selection.reconcile(&rows);
    }

    pub fn move_selection(&mut self, delta: isize) {
        let rows = self.visible();
        self.selection.move_by(&rows, delta);
    }

    pub fn enter_browse(&mut self) {
        self.mode = Mode::Browse;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_types::{DateField, IterationField, OwnerType, PeopleField, SelectField};

    fn task(url: &str, title: &str) -> Task {
        Task {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            title: title.into(),
            url: url.into(),
            start_field: String::new(),
            start_date: String::new(),
            project_id: String::new(),
            project_title: "Roadmap".into(),
            item_id: String::new(),
            content_id: String::new(),
            repository: String::new(),
            start: DateField::default(),
            end: DateField::default(),
            focus: DateField::default(),
            iteration: IterationField::default(),
            status: SelectField::default(),
            priority: SelectField::default(),
            people: PeopleField::default(),
            assigned_to_me: true,
            created_by_me: false,
            labels: vec![],
            updated_at: chrono::Utc::now(),
            is_done: false,
            last_seen_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn set_tasks_reconciles_selection_onto_first_visible_row() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut state = AppState::new(today);
        state.set_tasks(vec![task("https://x/1", "a"), task("https://x/2", "b")]);
        assert_eq!(state.selected().map(|t| t.url.as_str()), Some("https://x/1"));
    }

    #[test]
    fn move_selection_wraps_through_visible_rows() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut state = AppState::new(today);
        state.set_tasks(vec![task("https://x/1", "a"), task("https://x/2", "b")]);
        state.move_selection(-1);
        assert_eq!(state.selected().map(|t| t.url.as_str()), Some("https://x/2"));
    }
}
