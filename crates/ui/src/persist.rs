// crates/ui/src/persist.rs
//! Small JSON file that remembers filter toggles and theme across restarts
//! (spec.md §4 "UI state persists across restarts"), written the same
//! atomic write-temp-then-rename way `taskboard_sync::discovery_cache`
//! writes its cache.

use std::path::Path;

use serde::{Deserialize, Serialize};
use taskboard_viewmodel::{Filters, IterationMode, SortKey};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiState {
    pub theme_index: usize,
    pub hide_done: bool,
    pub today_only: bool,
    pub include_created: bool,
    pub show_stale: bool,
    pub sort_key: PersistedSortKey,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            theme_index: 0,
            hide_done: false,
            today_only: false,
            include_created: true,
            show_stale: false,
            sort_key: PersistedSortKey::Date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistedSortKey {
    Date,
    Title,
    Project,
    Status,
}

impl From<SortKey> for PersistedSortKey {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Date => PersistedSortKey::Date,
            SortKey::Title => PersistedSortKey::Title,
            SortKey::Project => PersistedSortKey::Project,
            SortKey::Status => PersistedSortKey::Status,
        }
    }
}

impl From<PersistedSortKey> for SortKey {
    fn from(key: PersistedSortKey) -> Self {
        match key {
            PersistedSortKey::Date => SortKey::Date,
            PersistedSortKey::Title => SortKey::Title,
            PersistedSortKey::Project => SortKey::Project,
            PersistedSortKey::Status => SortKey::Status,
        }
    }
}

impl UiState {
    pub fn capture(theme_index: usize, filters: &Filters, sort_key: SortKey) -> Self {
        Self {
            theme_index,
            hide_done: filters.hide_done,
            today_only: filters.today_only,
            include_created: filters.include_created,
            show_stale: filters.show_stale,
            sort_key: sort_key.into(),
        }
    }

    /// Applies the persisted toggles onto a freshly constructed `Filters`,
    /// leaving session-only fields (search text, date cutoff, project,
    /// iteration mode, sync epoch) at their defaults — those don't survive
    /// a restart.
    pub fn apply(&self, filters: &mut Filters) {
        filters.hide_done = self.hide_done;
        filters.today_only = self.today_only;
        filters.include_created = self.include_created;
        filters.show_stale = self.show_stale;
        filters.iteration_mode = IterationMode::All;
    }
}

/// Loads the persisted state, falling back to defaults on a missing or
/// malformed file rather than failing startup over it.
pub fn load(path: &Path) -> UiState {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
        Err(_) => UiState::default(),
    }
}

pub fn save(path: &Path, state: &UiState) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut tmp, json.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui-state.json");

        let mut state = UiState::default();
        state.theme_index = 2;
        state.hide_done = true;
        save(&path, &state).unwrap();

        let loaded = load(&path);
        assert_eq!(loaded.theme_index, 2);
        assert!(loaded.hide_done);
    }

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let loaded = load(&path);
        assert_eq!(loaded.theme_index, 0);
        assert!(loaded.include_created);
    }

    #[test]
    fn apply_leaves_session_only_fields_untouched() {
        let state = UiState::default();
        let mut filters = Filters::default();
        filters.search = Some("carried over".to_string());
        state.apply(&mut filters);
        assert_eq!(filters.search, Some("carried over".to_string()));
    }
}
