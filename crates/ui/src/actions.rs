// crates/ui/src/actions.rs
//! The vocabulary the key dispatcher emits. `keymap::dispatch` maps a
//! `KeyEvent` plus the current `Mode` onto one of these; `tui::run` is the
//! only place that actually performs them (most require an `await`).

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    None,

    // Browse
    MoveSelection(isize),
    OpenDetail,
    CloseDetail,
    OpenHelp,
    CloseHelp,
    OpenSearch,
    OpenDateFilter,
    OpenAdd,
    OpenTaskEditor,
    OpenSessionEditor,
    OpenReport,
    ToggleHideDone,
    ToggleTodayOnly,
    ToggleShowStale,
    ToggleIncludeCreated,
    CycleSort,
    TriggerSync,
    StartTimer,
    StopTimer,

    // Text-entry modes (search / date-filter / add / comment buffers)
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,

    // Task editor
    EditorMoveCursor(isize),
    EditorEnterField,
    EditorBack,
    EditorToggleChoice,
    EditorConfirmChoices,

    // Add flow
    AddMoveCursor(isize),
    AddToggleChoice,

    // Session editor
    SessionEditorMoveCursor(isize),
    SessionEditorDelete,
    SessionEditorEdit,
    SessionEditorToggleField,
    SessionEditorCancelEdit,

    // Report
    ReportCyclePeriod,
}
