// crates/ui/src/add.rs
//! The multi-step "create project item" flow behind `Mode::Add`: project
//! -> repo -> title -> labels -> priority -> assignees -> confirm, mirroring
//! the original's add-metadata workflow. Project choices are derived from
//! the already-synced rows rather than a fresh discovery call; labels and
//! assignees reuse the task editor's `ChoiceEditorState` fetch-and-toggle
//! shape.

use taskboard_types::{OptionEntry, OwnerType, Task};

use crate::editor::ChoiceEditorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStep {
    Project,
    Repo,
    Title,
    Labels,
    Priority,
    Assignees,
    Confirm,
}

impl AddStep {
    fn next(self) -> Self {
        match self {
            AddStep::Project => AddStep::Repo,
            AddStep::Repo => AddStep::Title,
            AddStep::Title => AddStep::Labels,
            AddStep::Labels => AddStep::Priority,
            AddStep::Priority => AddStep::Assignees,
            AddStep::Assignees => AddStep::Confirm,
            AddStep::Confirm => AddStep::Confirm,
        }
    }
}

/// One project a new item can be filed against.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectChoice {
    pub project_id: String,
    pub project_title: String,
    pub project_number: i64,
    pub owner_type: OwnerType,
    pub owner: String,
}

/// Distinct projects represented among the already-synced tasks, in
/// first-seen order. The Add flow files new items only against a project
/// the user has already synced into view, rather than running a fresh
/// project-discovery query.
pub fn derive_projects(tasks: &[Task]) -> Vec<ProjectChoice> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for t in tasks {
        if seen.insert(t.project_id.clone()) {
            out.push(ProjectChoice {
                project_id: t.project_id.clone(),
                project_title: t.project_title.clone(),
                project_number: t.project_number,
                owner_type: t.owner_type,
                owner: t.owner.clone(),
            });
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddState {
    pub step: AddStep,
    pub projects: Vec<ProjectChoice>,
    pub project_cursor: usize,
    pub repo_buffer: String,
    pub title_buffer: String,
    pub labels: ChoiceEditorState,
    pub priority_options: Vec<OptionEntry>,
    pub priority_field_id: Option<String>,
    pub priority_cursor: usize,
    pub assignees: ChoiceEditorState,
}

impl AddState {
    pub fn new(projects: Vec<ProjectChoice>) -> Self {
        Self {
            step: AddStep::Project,
            projects,
            project_cursor: 0,
            repo_buffer: String::new(),
            title_buffer: String::new(),
            labels: ChoiceEditorState::loading(String::new(), Vec::new()),
            priority_options: Vec::new(),
            priority_field_id: None,
            priority_cursor: 0,
            assignees: ChoiceEditorState::loading(String::new(), Vec::new()),
        }
    }

    pub fn selected_project(&self) -> Option<&ProjectChoice> {
        self.projects.get(self.project_cursor)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        match self.step {
            AddStep::Project => {
                if !self.projects.is_empty() {
                    let len = self.projects.len() as isize;
                    let next = ((self.project_cursor as isize + delta) % len + len) % len;
                    self.project_cursor = next as usize;
                }
            }
            AddStep::Labels => self.labels.move_cursor(delta),
            AddStep::Priority => {
                if !self.priority_options.is_empty() {
                    let len = self.priority_options.len() as isize;
                    let next = ((self.priority_cursor as isize + delta) % len + len) % len;
                    self.priority_cursor = next as usize;
                }
            }
            AddStep::Assignees => self.assignees.move_cursor(delta),
            _ => {}
        }
    }

    pub fn toggle_choice(&mut self) {
        match self.step {
            AddStep::Labels => self.labels.toggle_at_cursor(),
            AddStep::Assignees => self.assignees.toggle_at_cursor(),
            _ => {}
        }
    }

    /// Advance past the current step. The caller (`tui::submit_add`) is
    /// responsible for validating the step and running whatever fetch the
    /// next step needs before calling this.
    pub fn advance(&mut self) {
        self.step = self.step.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_types::{DateField, IterationField, PeopleField, SelectField};

    fn task(project_id: &str, project_title: &str) -> Task {
        Task {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            title: "t".into(),
            url: "https://x/1".into(),
            start_field: String::new(),
            start_date: String::new(),
            project_id: project_id.into(),
            project_title: project_title.into(),
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
            assigned_to_me: false,
            created_by_me: false,
            labels: vec![],
            updated_at: chrono::Utc::now(),
            is_done: false,
            last_seen_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn derive_projects_dedupes_by_project_id_in_first_seen_order() {
        let tasks = vec![task("PVT_1", "Roadmap"), task("PVT_2", "Backlog"), task("PVT_1", "Roadmap")];
        let projects = derive_projects(&tasks);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].project_title, "Roadmap");
        assert_eq!(projects[1].project_title, "Backlog");
    }

    #[test]
    fn advance_walks_the_full_step_sequence_and_stops_at_confirm() {
        let mut add = AddState::new(vec![]);
        let steps = [
            AddStep::Repo,
            AddStep::Title,
            AddStep::Labels,
            AddStep::Priority,
            AddStep::Assignees,
            AddStep::Confirm,
            AddStep::Confirm,
        ];
        for expected in steps {
            add.advance();
            assert_eq!(add.step, expected);
        }
    }

    #[test]
    fn project_cursor_wraps() {
        let mut add = AddState::new(vec![
            ProjectChoice { project_id: "a".into(), project_title: "A".into(), project_number: 1, owner_type: OwnerType::Org, owner: "acme".into() },
            ProjectChoice { project_id: "b".into(), project_title: "B".into(), project_number: 2, owner_type: OwnerType::Org, owner: "acme".into() },
        ]);
        add.move_cursor(-1);
        assert_eq!(add.project_cursor, 1);
        add.move_cursor(1);
        assert_eq!(add.project_cursor, 0);
    }
}
