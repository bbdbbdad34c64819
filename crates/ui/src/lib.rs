// crates/ui/src/lib.rs
//! The UI driver (spec.md §2 "UI driver (C8)"): a `crossterm` event loop,
//! a finite set of modal states, and a minimal fragment renderer.
//!
//! Per spec.md §1's out-of-scope boundary, the literal widget layout is
//! not specified — this crate implements the event loop, the modal state
//! machine, and a plain-text renderer sufficient to drive and test the
//! state machine end to end. `taskboard_app` owns `main.rs` and hands
//! this crate a [`tui::Services`] bundle to run against.

pub mod actions;
pub mod add;
pub mod editor;
pub mod keymap;
pub mod persist;
pub mod render;
pub mod report;
pub mod session_editor;
pub mod state;
pub mod sync_progress;
pub mod tui;

pub use state::{AppState, Mode};
pub use sync_progress::{SyncProgress, SyncProgressSender};
pub use tui::{run, Services};
