// crates/ui/src/keymap.rs
//! Pure key-to-action dispatch. No I/O and no `AppState` mutation happens
//! here; `dispatch` only needs to know the current `Mode` (which keymap is
//! active) and the raw key event. Kept pure so it's fully unit-testable
//! without a terminal.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::actions::Action;
use crate::add::{AddState, AddStep};
use crate::editor::TaskEditorState;
use crate::session_editor::SessionEditorState;
use crate::state::Mode;

pub fn dispatch(mode: &Mode, key: KeyEvent) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match mode {
        Mode::Browse => dispatch_browse(key),
        Mode::Search(_) => dispatch_text_entry(key),
        Mode::DateFilter(_) => dispatch_text_entry(key),
        Mode::Add(add) => dispatch_add(add, key),
        Mode::Detail => dispatch_detail(key),
        Mode::Help => dispatch_help(key),
        Mode::TaskEditor(editor) => dispatch_task_editor(editor, key),
        Mode::SessionEditor(editor) => dispatch_session_editor(editor, key),
        Mode::Report(_) => dispatch_report(key),
    }
}

fn dispatch_browse(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => Action::MoveSelection(-1),
        KeyCode::Down | KeyCode::Char('j') => Action::MoveSelection(1),
        KeyCode::Enter => Action::OpenDetail,
        KeyCode::Char('e') => Action::OpenTaskEditor,
        KeyCode::Char('s') => Action::OpenSessionEditor,
        KeyCode::Char('r') => Action::OpenReport,
        KeyCode::Char('/') => Action::OpenSearch,
        KeyCode::Char('d') => Action::OpenDateFilter,
        KeyCode::Char('a') => Action::OpenAdd,
        KeyCode::Char('?') => Action::OpenHelp,
        KeyCode::Char('h') => Action::ToggleHideDone,
        KeyCode::Char('t') => Action::ToggleTodayOnly,
        KeyCode::Char('x') => Action::ToggleShowStale,
        KeyCode::Char('c') => Action::ToggleIncludeCreated,
        KeyCode::Char('o') => Action::CycleSort,
        KeyCode::Char('S') => Action::TriggerSync,
        KeyCode::Char('T') => Action::StartTimer,
        KeyCode::Char('P') => Action::StopTimer,
        _ => Action::None,
    }
}

fn dispatch_text_entry(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Esc => Action::InputCancel,
        KeyCode::Enter => Action::InputSubmit,
        KeyCode::Backspace => Action::InputBackspace,
        KeyCode::Char(c) => Action::InputChar(c),
        _ => Action::None,
    }
}

fn dispatch_detail(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Action::CloseDetail,
        KeyCode::Char('e') => Action::OpenTaskEditor,
        KeyCode::Char('s') => Action::OpenSessionEditor,
        _ => Action::None,
    }
}

fn dispatch_help(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Action::CloseHelp,
        _ => Action::None,
    }
}

fn dispatch_report(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Action::CloseDetail,
        KeyCode::Tab | KeyCode::Char('o') => Action::ReportCyclePeriod,
        _ => Action::None,
    }
}

fn dispatch_session_editor(editor: &SessionEditorState, key: KeyEvent) -> Action {
    if editor.editing.is_some() {
        return match key.code {
            KeyCode::Esc => Action::SessionEditorCancelEdit,
            KeyCode::Tab => Action::SessionEditorToggleField,
            KeyCode::Enter => Action::InputSubmit,
            KeyCode::Backspace => Action::InputBackspace,
            KeyCode::Char(c) => Action::InputChar(c),
            _ => Action::None,
        };
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Action::CloseDetail,
        KeyCode::Up | KeyCode::Char('k') => Action::SessionEditorMoveCursor(-1),
        KeyCode::Down | KeyCode::Char('j') => Action::SessionEditorMoveCursor(1),
        KeyCode::Char('d') => Action::SessionEditorDelete,
        KeyCode::Enter => Action::SessionEditorEdit,
        _ => Action::None,
    }
}

fn dispatch_task_editor(editor: &TaskEditorState, key: KeyEvent) -> Action {
    match editor {
        TaskEditorState::List { .. } => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Action::EditorBack,
            KeyCode::Up | KeyCode::Char('k') => Action::EditorMoveCursor(-1),
            KeyCode::Down | KeyCode::Char('j') => Action::EditorMoveCursor(1),
            KeyCode::Enter => Action::EditorEnterField,
            _ => Action::None,
        },
        TaskEditorState::EditDate { .. } | TaskEditorState::EditComment { .. } => {
            dispatch_text_entry_with_back(key)
        }
        TaskEditorState::StatusSelect { .. }
        | TaskEditorState::PrioritySelect { .. }
        | TaskEditorState::IterationSelect { .. } => match key.code {
            KeyCode::Esc => Action::EditorBack,
            KeyCode::Up | KeyCode::Char('k') => Action::EditorMoveCursor(-1),
            KeyCode::Down | KeyCode::Char('j') => Action::EditorMoveCursor(1),
            KeyCode::Enter => Action::InputSubmit,
            _ => Action::None,
        },
        TaskEditorState::EditLabels(_) | TaskEditorState::EditAssignees(_) => match key.code {
            KeyCode::Esc => Action::EditorBack,
            KeyCode::Up | KeyCode::Char('k') => Action::EditorMoveCursor(-1),
            KeyCode::Down | KeyCode::Char('j') => Action::EditorMoveCursor(1),
            KeyCode::Char(' ') => Action::EditorToggleChoice,
            KeyCode::Enter => Action::EditorConfirmChoices,
            _ => Action::None,
        },
    }
}

fn dispatch_add(add: &AddState, key: KeyEvent) -> Action {
    match add.step {
        AddStep::Project | AddStep::Priority => match key.code {
            KeyCode::Esc => Action::InputCancel,
            KeyCode::Up | KeyCode::Char('k') => Action::AddMoveCursor(-1),
            KeyCode::Down | KeyCode::Char('j') => Action::AddMoveCursor(1),
            KeyCode::Enter => Action::InputSubmit,
            _ => Action::None,
        },
        AddStep::Repo | AddStep::Title => dispatch_text_entry(key),
        AddStep::Labels | AddStep::Assignees => match key.code {
            KeyCode::Esc => Action::InputCancel,
            KeyCode::Up | KeyCode::Char('k') => Action::AddMoveCursor(-1),
            KeyCode::Down | KeyCode::Char('j') => Action::AddMoveCursor(1),
            KeyCode::Char(' ') => Action::AddToggleChoice,
            KeyCode::Enter => Action::InputSubmit,
            _ => Action::None,
        },
        AddStep::Confirm => match key.code {
            KeyCode::Esc => Action::InputCancel,
            KeyCode::Enter => Action::InputSubmit,
            _ => Action::None,
        },
    }
}

fn dispatch_text_entry_with_back(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Esc => Action::EditorBack,
        _ => dispatch_text_entry(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn ctrl_c_always_quits_regardless_of_mode() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(dispatch(&Mode::Browse, ctrl_c), Action::Quit);
        assert_eq!(dispatch(&Mode::Help, ctrl_c), Action::Quit);
    }

    #[test]
    fn browse_mode_maps_vim_style_navigation() {
        assert_eq!(dispatch(&Mode::Browse, key(KeyCode::Char('j'))), Action::MoveSelection(1));
        assert_eq!(dispatch(&Mode::Browse, key(KeyCode::Char('k'))), Action::MoveSelection(-1));
        assert_eq!(dispatch(&Mode::Browse, key(KeyCode::Enter)), Action::OpenDetail);
    }

    #[test]
    fn search_mode_routes_typed_chars_into_input_char() {
        let mode = Mode::Search(String::new());
        assert_eq!(dispatch(&mode, key(KeyCode::Char('a'))), Action::InputChar('a'));
        assert_eq!(dispatch(&mode, key(KeyCode::Esc)), Action::InputCancel);
    }

    #[test]
    fn add_flow_project_step_routes_navigation_and_repo_step_routes_text() {
        use crate::add::AddState;

        let project_step = Mode::Add(AddState::new(vec![]));
        assert_eq!(dispatch(&project_step, key(KeyCode::Char('j'))), Action::AddMoveCursor(1));
        assert_eq!(dispatch(&project_step, key(KeyCode::Enter)), Action::InputSubmit);

        let mut add = AddState::new(vec![]);
        add.step = crate::add::AddStep::Repo;
        let repo_step = Mode::Add(add);
        assert_eq!(dispatch(&repo_step, key(KeyCode::Char('a'))), Action::InputChar('a'));
    }

    #[test]
    fn task_editor_list_enter_opens_the_field_under_cursor() {
        let editor = TaskEditorState::list("https://x/1");
        let mode = Mode::TaskEditor(editor);
        assert_eq!(dispatch(&mode, key(KeyCode::Enter)), Action::EditorEnterField);
    }

    #[test]
    fn ignores_kind_on_constructed_keyevent_default() {
        let k = key(KeyCode::Char('j'));
        assert_eq!(k.kind, KeyEventKind::Press);
    }
}
