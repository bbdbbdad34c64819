// crates/ui/src/render.rs
//! Renders `AppState` into plain text lines. Deliberately minimal: no
//! layout engine, no styling spans, just the fragments a fixed-width
//! terminal needs — literal widget rendering is out of scope (spec.md §9
//! Non-goals), so this stops at "a line per row plus a status bar".

use taskboard_types::Task;

use crate::state::{AppState, Mode};

/// Renders the full frame as a list of lines, topmost first, with the
/// status bar always last. Callers are responsible for actually drawing
/// them (via `tui::run`'s crossterm calls).
pub fn render_frame(state: &AppState) -> Vec<String> {
    let mut lines = match &state.mode {
        Mode::Help => render_help(),
        Mode::Report(report) => render_report_placeholder(report),
        _ => render_browse(state),
    };
    lines.push(render_status_line(state));
    lines
}

fn render_browse(state: &AppState) -> Vec<String> {
    let rows = state.visible();
    let selected_url = state.selection.selected_url();
    rows.iter().map(|task| render_row(task, Some(task.url.as_str()) == selected_url)).collect()
}

fn render_row(task: &Task, selected: bool) -> String {
    let marker = if selected { ">" } else { " " };
    let done = if task.is_done { "x" } else { " " };
    let date = if task.start_date.is_empty() { "----------" } else { task.start_date.as_str() };
    format!("{marker} [{done}] {date}  {:<24}  {}", truncate(&task.project_title, 24), task.title)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max.saturating_sub(1)).collect::<String>() + "…"
    }
}

fn render_help() -> Vec<String> {
    vec![
        "j/k move   Enter detail   e edit   s sessions   r report".to_string(),
        "/ search   d date filter  a add    S sync       ? close help".to_string(),
        "h hide done   t today only   x show stale   c include created   o sort".to_string(),
    ]
}

fn render_report_placeholder(report: &crate::report::ReportState) -> Vec<String> {
    vec![format!("report: {:?} (Tab to cycle)", report.period)]
}

fn render_add_status(add: &crate::add::AddState) -> String {
    use crate::add::AddStep;
    match add.step {
        AddStep::Project => match add.projects.is_empty() {
            true => "add: no synced project to file into yet".to_string(),
            false => format!("add: project {}/{} ({})", add.project_cursor + 1, add.projects.len(), add.projects[add.project_cursor].project_title),
        },
        AddStep::Repo => format!("add: repo> {}", add.repo_buffer),
        AddStep::Title => format!("add: title> {}", add.title_buffer),
        AddStep::Labels => format!("add: labels ({} selected, space toggles)", add.labels.selected.len()),
        AddStep::Priority => match add.priority_options.is_empty() {
            true => "add: priority (none known for this project, Enter to skip)".to_string(),
            false => format!("add: priority {}/{}", add.priority_cursor + 1, add.priority_options.len()),
        },
        AddStep::Assignees => format!("add: assignees ({} selected, space toggles)", add.assignees.selected.len()),
        AddStep::Confirm => "add: Enter to create, Esc to cancel".to_string(),
    }
}

fn render_status_line(state: &AppState) -> String {
    if !state.status_line.is_empty() {
        return state.status_line.clone();
    }
    match &state.mode {
        Mode::Browse => format!("{} tasks", state.visible().len()),
        Mode::Search(q) => format!("/{q}"),
        Mode::DateFilter(q) => format!("date: {q}"),
        Mode::Add(add) => render_add_status(add),
        Mode::Detail => "detail".to_string(),
        Mode::Help => "help".to_string(),
        Mode::TaskEditor(_) => "editing".to_string(),
        Mode::SessionEditor(_) => "sessions".to_string(),
        Mode::Report(_) => "report".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use taskboard_types::{DateField, IterationField, OwnerType, PeopleField, SelectField};

    fn task(url: &str, title: &str) -> Task {
        Task {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            title: title.into(),
            url: url.into(),
            start_field: String::new(),
            start_date: "2026-03-01".into(),
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
    fn render_frame_marks_the_selected_row() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut state = AppState::new(today);
        state.set_tasks(vec![task("https://x/1", "a"), task("https://x/2", "b")]);
        let lines = render_frame(&state);
        assert!(lines[0].starts_with('>'));
        assert!(lines[1].starts_with(' '));
    }

    #[test]
    fn truncate_adds_ellipsis_only_when_over_the_limit() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long project title", 10), "a very lo…");
    }

    #[test]
    fn status_line_falls_back_to_mode_summary_when_empty() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let state = AppState::new(today);
        let lines = render_frame(&state);
        assert_eq!(lines.last().unwrap(), "0 tasks");
    }
}
