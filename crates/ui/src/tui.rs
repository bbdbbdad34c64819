// crates/ui/src/tui.rs
//! The terminal event loop. Enables raw mode and the alternate screen on
//! entry and guarantees both are torn down on exit — including on panic,
//! the same concern the teacher's server binary handles for its listener
//! via `with_graceful_shutdown`, here applied to terminal state instead.
//!
//! No async `EventStream`: the workspace's crossterm dependency carries no
//! `event-stream` feature, so key reads happen on a dedicated blocking
//! thread and cross into the async world over a channel.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{self, Event, KeyEvent};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use taskboard_coordinator::{EditCoordinator, UpdateEvent};
use taskboard_db::Database;
use tokio::sync::{mpsc, watch};

use crate::actions::Action;
use crate::keymap;
use crate::persist;
use crate::state::{AppState, Mode};
use crate::sync_progress::SyncProgress;

/// RAII guard that restores the terminal on drop, including the panic
/// path (a panic still runs destructors during unwind).
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Spawns the blocking key-read thread, forwarding every key press onto
/// `tx`. Exits quietly once the receiver is dropped.
fn spawn_key_reader(tx: mpsc::UnboundedSender<KeyEvent>) {
    std::thread::spawn(move || loop {
        match event::poll(Duration::from_millis(200)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => {
                    if tx.send(key).is_err() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(_) => return,
            },
            Ok(false) => {}
            Err(_) => return,
        }
    });
}

pub struct Services {
    pub coordinator: EditCoordinator,
    pub db: Arc<Database>,
    /// Receives progress from the app layer's background sync loop; `tui`
    /// only watches it, it never runs a sync itself.
    pub sync_progress: watch::Receiver<SyncProgress>,
    /// Signals the background sync loop to run a pass now (`S` in browse
    /// mode), rather than waiting for its periodic timer.
    pub sync_trigger: mpsc::UnboundedSender<()>,
}

/// Runs the UI until `Action::Quit` or the key thread dies. Owns nothing
/// about how the services were constructed — that's `taskboard_app`'s job.
pub async fn run(services: Services, ui_state_path: std::path::PathBuf) -> io::Result<()> {
    let _guard = TerminalGuard::enter()?;
    std::panic::set_hook(Box::new(|info| {
        let _ = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
        eprintln!("{info}");
    }));

    let (key_tx, mut key_rx) = mpsc::unbounded_channel();
    spawn_key_reader(key_tx);

    let mut events = services.coordinator.subscribe();
    let mut sync_rx = services.sync_progress.clone();

    let today = Utc::now().date_naive();
    let mut state = AppState::new(today);

    let persisted = persist::load(&ui_state_path);
    persisted.apply(&mut state.filters);
    state.theme_index = persisted.theme_index;
    state.sort_key = persisted.sort_key.into();

    state.set_tasks(services.coordinator.snapshot().await);

    loop {
        let frame = crate::render::render_frame(&state);
        draw(&frame)?;

        if state.quit {
            break;
        }

        tokio::select! {
            key = key_rx.recv() => {
                let Some(key) = key else { break };
                let action = keymap::dispatch(&state.mode, key);
                apply_action(&services, &mut state, action).await;
            }
            Ok(event) = events.recv() => {
                apply_update_event(&mut state, event);
            }
            _ = sync_rx.changed() => {
                let progress = sync_rx.borrow().clone();
                state.status_line = progress.status_line;
                if progress.finished {
                    state.set_tasks(services.coordinator.snapshot().await);
                }
            }
        }
    }

    let to_save = persist::UiState::capture(state.theme_index, &state.filters, state.sort_key);
    let _ = persist::save(&ui_state_path, &to_save);

    Ok(())
}

fn draw(lines: &[String]) -> io::Result<()> {
    let mut out = io::stdout();
    queue!(out, cursor::MoveTo(0, 0))?;
    for line in lines {
        queue!(out, crossterm::terminal::Clear(crossterm::terminal::ClearType::CurrentLine))?;
        write!(out, "{line}\r\n")?;
    }
    out.flush()
}

fn apply_update_event(state: &mut AppState, event: UpdateEvent) {
    match event {
        UpdateEvent::RowChanged(_) => {
            // Row content is re-pulled via snapshot() on the next sync tick
            // or editor close; nothing to do for an in-flight single edit
            // beyond clearing a stale status line.
        }
        UpdateEvent::StatusLine(line) => state.status_line = line,
        UpdateEvent::ProgressTick(done, total, line) => {
            state.status_line = format!("{line} ({done}/{total})");
        }
    }
}

async fn apply_action(services: &Services, state: &mut AppState, action: Action) {
    match action {
        Action::Quit => state.quit = true,
        Action::None => {}
        Action::MoveSelection(delta) => state.move_selection(delta),
        Action::OpenDetail => state.mode = Mode::Detail,
        Action::CloseDetail => state.enter_browse(),
        Action::OpenHelp => state.mode = Mode::Help,
        Action::CloseHelp => state.enter_browse(),
        Action::OpenSearch => state.mode = Mode::Search(String::new()),
        Action::OpenDateFilter => state.mode = Mode::DateFilter(String::new()),
        Action::OpenAdd => {
            state.mode = Mode::Add(crate::add::AddState::new(crate::add::derive_projects(&state.tasks)));
        }
        Action::OpenReport => state.mode = Mode::Report(crate::report::ReportState::default()),
        Action::OpenTaskEditor => {
            if let Some(task) = state.selected() {
                state.mode = Mode::TaskEditor(crate::editor::TaskEditorState::list(task.url.clone()));
            }
        }
        Action::OpenSessionEditor => {
            if let Some(task) = state.selected() {
                let url = task.url.clone();
                let sessions: Vec<_> = services
                    .db
                    .all_sessions()
                    .await
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|s| s.task_url == url)
                    .collect();
                state.mode = Mode::SessionEditor(crate::session_editor::SessionEditorState::new(url, sessions));
            }
        }
        Action::ToggleHideDone => state.filters.hide_done = !state.filters.hide_done,
        Action::ToggleTodayOnly => state.filters.today_only = !state.filters.today_only,
        Action::ToggleShowStale => state.filters.show_stale = !state.filters.show_stale,
        Action::ToggleIncludeCreated => state.filters.include_created = !state.filters.include_created,
        Action::CycleSort => {
            state.sort_key = match state.sort_key {
                taskboard_viewmodel::SortKey::Date => taskboard_viewmodel::SortKey::Title,
                taskboard_viewmodel::SortKey::Title => taskboard_viewmodel::SortKey::Project,
                taskboard_viewmodel::SortKey::Project => taskboard_viewmodel::SortKey::Status,
                taskboard_viewmodel::SortKey::Status => taskboard_viewmodel::SortKey::Date,
            };
        }
        Action::TriggerSync => {
            let _ = services.sync_trigger.send(());
            state.status_line = "sync requested".to_string();
        }
        Action::StartTimer => {
            if let Some(task) = state.selected() {
                let _ = services
                    .db
                    .start_session(&task.url, &task.project_title, &task.labels, Utc::now())
                    .await;
                state.status_line = format!("timer started: {}", task.title);
            }
        }
        Action::StopTimer => {
            if let Some(task) = state.selected() {
                let _ = services.db.stop_session(&task.url, Utc::now()).await;
                state.status_line = format!("timer stopped: {}", task.title);
            }
        }
        Action::InputChar(c) => push_input_char(state, c),
        Action::InputBackspace => pop_input_char(state),
        Action::InputSubmit => submit_input(services, state).await,
        Action::InputCancel => state.enter_browse(),
        Action::EditorMoveCursor(delta) => move_editor_cursor(state, delta),
        Action::EditorEnterField => enter_editor_field(services, state).await,
        Action::EditorBack => editor_back(state),
        Action::EditorToggleChoice => {
            if let Mode::TaskEditor(editor) = &mut state.mode {
                use crate::editor::TaskEditorState as T;
                match editor {
                    T::EditLabels(choice) | T::EditAssignees(choice) => choice.toggle_at_cursor(),
                    _ => {}
                }
            }
        }
        Action::EditorConfirmChoices => confirm_choices(services, state).await,
        Action::AddMoveCursor(delta) => {
            if let Mode::Add(add) = &mut state.mode {
                add.move_cursor(delta);
            }
        }
        Action::AddToggleChoice => {
            if let Mode::Add(add) = &mut state.mode {
                add.toggle_choice();
            }
        }
        Action::SessionEditorMoveCursor(delta) => {
            if let Mode::SessionEditor(editor) = &mut state.mode {
                editor.move_cursor(delta);
            }
        }
        Action::SessionEditorDelete => {
            if let Mode::SessionEditor(editor) = &mut state.mode {
                if let Some(removed) = editor.remove_selected() {
                    let _ = services.db.delete_session(removed.id).await;
                }
            }
        }
        Action::SessionEditorEdit => {
            if let Mode::SessionEditor(editor) = &mut state.mode {
                editor.begin_edit();
            }
        }
        Action::SessionEditorToggleField => {
            if let Mode::SessionEditor(editor) = &mut state.mode {
                if let Some(edit) = &mut editor.editing {
                    edit.field = match edit.field {
                        crate::session_editor::EditField::Started => crate::session_editor::EditField::Ended,
                        crate::session_editor::EditField::Ended => crate::session_editor::EditField::Started,
                    };
                }
            }
        }
        Action::SessionEditorCancelEdit => {
            if let Mode::SessionEditor(editor) = &mut state.mode {
                editor.editing = None;
            }
        }
        Action::ReportCyclePeriod => {
            if let Mode::Report(report) = &mut state.mode {
                report.cycle_period();
            }
        }
    }
}

fn push_input_char(state: &mut AppState, c: char) {
    use crate::add::AddStep;
    use crate::editor::TaskEditorState as T;
    use crate::session_editor::EditField;
    match &mut state.mode {
        Mode::Search(buf) | Mode::DateFilter(buf) => buf.push(c),
        Mode::Add(add) => match add.step {
            AddStep::Repo => add.repo_buffer.push(c),
            AddStep::Title => add.title_buffer.push(c),
            _ => {}
        },
        Mode::TaskEditor(T::EditDate { buffer, .. } | T::EditComment { buffer, .. }) => buffer.push(c),
        Mode::SessionEditor(editor) => {
            if let Some(edit) = &mut editor.editing {
                match edit.field {
                    EditField::Started => edit.started_buffer.push(c),
                    EditField::Ended => edit.ended_buffer.push(c),
                }
            }
        }
        _ => {}
    }
}

fn pop_input_char(state: &mut AppState) {
    use crate::add::AddStep;
    use crate::editor::TaskEditorState as T;
    use crate::session_editor::EditField;
    match &mut state.mode {
        Mode::Search(buf) | Mode::DateFilter(buf) => {
            buf.pop();
        }
        Mode::Add(add) => match add.step {
            AddStep::Repo => {
                add.repo_buffer.pop();
            }
            AddStep::Title => {
                add.title_buffer.pop();
            }
            _ => {}
        },
        Mode::TaskEditor(T::EditDate { buffer, .. } | T::EditComment { buffer, .. }) => {
            buffer.pop();
        }
        Mode::SessionEditor(editor) => {
            if let Some(edit) = &mut editor.editing {
                match edit.field {
                    EditField::Started => edit.started_buffer.pop(),
                    EditField::Ended => edit.ended_buffer.pop(),
                };
            }
        }
        _ => {}
    }
}

async fn submit_input(services: &Services, state: &mut AppState) {
    use crate::editor::TaskEditorState as T;

    if let Mode::TaskEditor(editor) = state.mode.clone() {
        match editor {
            T::StatusSelect { url, index } => commit_select(services, state, &url, index, true).await,
            T::PrioritySelect { url, index } => commit_select(services, state, &url, index, false).await,
            T::IterationSelect { url, index } => commit_iteration(services, state, &url, index).await,
            T::EditDate { url, class, buffer } => commit_date(services, state, &url, class, &buffer).await,
            T::EditComment { url, buffer } => commit_comment(services, state, &url, &buffer).await,
            _ => {}
        }
        return;
    }

    if let Mode::SessionEditor(editor) = &mut state.mode {
        if let Some(edit) = editor.editing.take() {
            let result = taskboard_coordinator::validation::validate_session_times(
                &edit.started_buffer,
                &edit.ended_buffer,
            );
            match result {
                Ok((started, ended)) => {
                    let _ = services.db.update_session_times(edit.session_id, started, ended).await;
                    if let Some(s) = editor.sessions.iter_mut().find(|s| s.id == edit.session_id) {
                        s.started_at = started;
                        s.ended_at = ended;
                    }
                }
                Err(e) => {
                    editor.editing = Some(edit);
                    state.status_line = e.to_string();
                }
            }
        }
        return;
    }

    if let Mode::Add(add) = state.mode.clone() {
        submit_add(services, state, add).await;
        return;
    }

    match std::mem::replace(&mut state.mode, Mode::Browse) {
        Mode::Search(text) => {
            state.filters.search = if text.is_empty() { None } else { Some(text) };
        }
        Mode::DateFilter(text) => {
            state.filters.date_max = text.parse().ok();
        }
        other => state.mode = other,
    }
    let rows = state.visible();
    state.selection.reconcile(&rows);
}

/// Splits an `owner/repo` buffer, tolerating a still-invalid buffer (the
/// Repo step already refuses to advance past an unparseable one, but
/// later steps reuse this rather than re-deriving owner/repo themselves).
fn split_repo_buffer(buf: &str) -> (String, String) {
    buf.split_once('/')
        .map(|(owner, repo)| (owner.to_string(), repo.to_string()))
        .unwrap_or_default()
}

/// Advances the Add flow's step machine by one step, per
/// project -> repo -> title -> labels -> priority -> assignees -> confirm
/// (the "add" modal state, spec.md §9). Each step validates its own input
/// before advancing; the label/assignee steps additionally kick off the
/// same cancellable choice fetch the task editor uses.
async fn submit_add(services: &Services, state: &mut AppState, mut add: crate::add::AddState) {
    use crate::add::AddStep;
    use crate::editor::ChoiceEditorState;

    match add.step {
        AddStep::Project => {
            if add.selected_project().is_some() {
                add.advance();
            } else {
                state.status_line = "no synced project to add into yet".to_string();
            }
            state.mode = Mode::Add(add);
        }
        AddStep::Repo => {
            match taskboard_coordinator::validation::validate_repository(&add.repo_buffer) {
                Ok(_) => add.advance(),
                Err(e) => state.status_line = e.to_string(),
            }
            state.mode = Mode::Add(add);
        }
        AddStep::Title => {
            match taskboard_coordinator::validation::validate_title(&add.title_buffer) {
                Ok(_) => {
                    let (owner, repo) = split_repo_buffer(&add.repo_buffer);
                    let (_, rx) = services.coordinator.fetch_label_choices(owner, repo);
                    let mut labels = ChoiceEditorState::loading(String::new(), Vec::new());
                    if let Ok(Ok(choices)) = rx.await {
                        labels.choices = choices;
                    }
                    labels.loading = false;
                    add.labels = labels;
                    add.advance();
                }
                Err(e) => state.status_line = e.to_string(),
            }
            state.mode = Mode::Add(add);
        }
        AddStep::Labels => {
            if let Some(project) = add.selected_project() {
                let project_id = project.project_id.clone();
                add.priority_field_id = state
                    .tasks
                    .iter()
                    .find(|t| t.project_id == project_id && t.priority.field_id.is_some())
                    .and_then(|t| t.priority.field_id.clone());
                add.priority_options = state
                    .tasks
                    .iter()
                    .find(|t| t.project_id == project_id && !t.priority.options.is_empty())
                    .map(|t| t.priority.options.clone())
                    .unwrap_or_default();
            }
            add.advance();
            state.mode = Mode::Add(add);
        }
        AddStep::Priority => {
            let (owner, repo) = split_repo_buffer(&add.repo_buffer);
            let (_, rx) = services.coordinator.fetch_assignee_choices(owner, repo);
            let mut assignees = ChoiceEditorState::loading(String::new(), Vec::new());
            if let Ok(Ok(choices)) = rx.await {
                assignees.choices = choices;
            }
            assignees.loading = false;
            add.assignees = assignees;
            add.advance();
            state.mode = Mode::Add(add);
        }
        AddStep::Assignees => {
            add.advance();
            state.mode = Mode::Add(add);
        }
        AddStep::Confirm => {
            let Some(project) = add.selected_project().cloned() else {
                state.status_line = "no project selected".to_string();
                state.mode = Mode::Add(add);
                return;
            };
            let priority = if add.priority_options.is_empty() {
                None
            } else {
                add.priority_options
                    .get(add.priority_cursor)
                    .cloned()
                    .zip(add.priority_field_id.clone())
                    .map(|(option, field_id)| (field_id, option))
            };
            let result = services
                .coordinator
                .create_item(
                    &project.project_id,
                    &project.project_title,
                    project.project_number,
                    project.owner_type,
                    &project.owner,
                    &add.repo_buffer,
                    &add.title_buffer,
                    &add.labels.selected,
                    &add.assignees.selected,
                    priority,
                )
                .await;
            match result {
                Ok(task) => {
                    state.set_tasks(services.coordinator.snapshot().await);
                    state.status_line = format!("created {}", task.title);
                    state.enter_browse();
                }
                Err(e) => {
                    state.status_line = format!("create failed: {e}");
                    state.mode = Mode::Add(add);
                }
            }
        }
    }
}

async fn commit_select(services: &Services, state: &mut AppState, url: &str, index: usize, is_status: bool) {
    let Some(task) = state.tasks.iter().find(|t| t.url == url) else { return };
    let options = if is_status { &task.status.options } else { &task.priority.options };
    let Some(option) = options.get(index).cloned() else { return };
    let result = if is_status {
        services.coordinator.edit_status(url, option).await
    } else {
        services.coordinator.edit_priority(url, option).await
    };
    refresh_after_edit(services, state, url, result).await;
}

async fn commit_iteration(services: &Services, state: &mut AppState, url: &str, index: usize) {
    let Some(task) = state.tasks.iter().find(|t| t.url == url) else { return };
    let Some(option) = task.iteration.options.get(index) else { return };
    let iteration_id = option.id.clone();
    let result = services.coordinator.edit_iteration(url, &iteration_id).await;
    refresh_after_edit(services, state, url, result).await;
}

async fn commit_date(services: &Services, state: &mut AppState, url: &str, class: taskboard_types::FieldClass, buffer: &str) {
    let result = match class {
        taskboard_types::FieldClass::StartDate => services.coordinator.edit_start_date(url, buffer).await,
        taskboard_types::FieldClass::EndDate => services.coordinator.edit_end_date(url, buffer).await,
        taskboard_types::FieldClass::FocusDate => services.coordinator.edit_focus_date(url, buffer).await,
        _ => return,
    };
    refresh_after_edit(services, state, url, result).await;
}

async fn commit_comment(services: &Services, state: &mut AppState, url: &str, buffer: &str) {
    let result = services.coordinator.add_comment(url, buffer).await;
    refresh_after_edit(services, state, url, result).await;
}

async fn confirm_choices(services: &Services, state: &mut AppState) {
    use crate::editor::TaskEditorState as T;
    let Mode::TaskEditor(editor) = state.mode.clone() else { return };
    let (url, selected, is_labels) = match editor {
        T::EditLabels(choice) => (choice.url, choice.selected, true),
        T::EditAssignees(choice) => (choice.url, choice.selected, false),
        _ => return,
    };
    let result = if is_labels {
        services.coordinator.edit_labels(&url, &selected).await
    } else {
        services.coordinator.edit_assignees(&url, &selected).await
    };
    refresh_after_edit(services, state, &url, result).await;
}

async fn refresh_after_edit(
    services: &Services,
    state: &mut AppState,
    url: &str,
    result: taskboard_coordinator::EditResult<()>,
) {
    state.set_tasks(services.coordinator.snapshot().await);
    state.mode = Mode::TaskEditor(crate::editor::TaskEditorState::list(url.to_string()));
    if let Err(e) = result {
        state.status_line = format!("edit failed: {e}");
    }
}

fn move_editor_cursor(state: &mut AppState, delta: isize) {
    use crate::editor::TaskEditorState as T;
    let Mode::TaskEditor(editor) = &mut state.mode else { return };
    match editor {
        T::List { field_index, .. } => {
            let len = crate::editor::TASK_EDITOR_FIELDS.len() as isize;
            let next = ((*field_index as isize + delta) % len + len) % len;
            *field_index = next as usize;
        }
        T::StatusSelect { index, .. } | T::PrioritySelect { index, .. } | T::IterationSelect { index, .. } => {
            *index = (*index as isize + delta).max(0) as usize;
        }
        T::EditLabels(choice) | T::EditAssignees(choice) => choice.move_cursor(delta),
        _ => {}
    }
}

async fn enter_editor_field(services: &Services, state: &mut AppState) {
    use crate::editor::{ChoiceEditorState, TaskEditorState as T};
    let Mode::TaskEditor(T::List { url, field_index }) = state.mode.clone() else { return };
    let Some(field_name) = crate::editor::TASK_EDITOR_FIELDS.get(field_index) else { return };
    let Some(task) = state.tasks.iter().find(|t| t.url == url).cloned() else { return };

    state.mode = match *field_name {
        "Status" => Mode::TaskEditor(T::StatusSelect { url, index: 0 }),
        "Priority" => Mode::TaskEditor(T::PrioritySelect { url, index: 0 }),
        "Start date" => Mode::TaskEditor(T::EditDate {
            url,
            class: taskboard_types::FieldClass::StartDate,
            buffer: task.start.date.clone(),
        }),
        "End date" => Mode::TaskEditor(T::EditDate {
            url,
            class: taskboard_types::FieldClass::EndDate,
            buffer: task.end.date.clone(),
        }),
        "Focus date" => Mode::TaskEditor(T::EditDate {
            url,
            class: taskboard_types::FieldClass::FocusDate,
            buffer: task.focus.date.clone(),
        }),
        "Iteration" => Mode::TaskEditor(T::IterationSelect { url, index: 0 }),
        "Labels" => {
            let Some((owner, repo)) = task.repository.split_once('/') else { return };
            let (_, rx) = services.coordinator.fetch_label_choices(owner.to_string(), repo.to_string());
            let mut choice = ChoiceEditorState::loading(url, task.labels.clone());
            if let Ok(Ok(choices)) = rx.await {
                choice.choices = choices;
            }
            choice.loading = false;
            Mode::TaskEditor(T::EditLabels(choice))
        }
        "Assignees" => {
            let Some((owner, repo)) = task.repository.split_once('/') else { return };
            let (_, rx) = services.coordinator.fetch_assignee_choices(owner.to_string(), repo.to_string());
            let selected: Vec<String> = task.people.logins.clone();
            let mut choice = ChoiceEditorState::loading(url, selected);
            if let Ok(Ok(choices)) = rx.await {
                choice.choices = choices;
            }
            choice.loading = false;
            Mode::TaskEditor(T::EditAssignees(choice))
        }
        "Comment" => Mode::TaskEditor(T::EditComment { url, buffer: String::new() }),
        _ => Mode::TaskEditor(T::List { url, field_index }),
    };
}

fn editor_back(state: &mut AppState) {
    use crate::editor::TaskEditorState as T;
    let Mode::TaskEditor(editor) = &state.mode else { return };
    state.mode = match editor {
        T::List { .. } => Mode::Detail,
        other => Mode::TaskEditor(T::list(other.url().to_string())),
    };
}
