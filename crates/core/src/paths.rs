// crates/core/src/paths.rs
//! Default filesystem locations, resolved through `dirs` the same way the
//! teacher resolves its own data/cache directories rather than hard-coding
//! `$HOME` paths.

use std::path::PathBuf;

/// Default sqlite database path: `~/.taskboard/taskboard.db`.
pub fn default_db_path() -> PathBuf {
    data_dir().join("taskboard.db")
}

/// Path to the discovery cache written by the sync engine when a config
/// project source resolves to `numbers = "all"` (spec.md §4 discovery
/// fallback).
pub fn discovery_cache_path() -> PathBuf {
    data_dir().join("discovery-cache.json")
}

/// Path to the small JSON file that persists UI cursor/filter state across
/// restarts.
pub fn ui_state_path() -> PathBuf {
    data_dir().join("ui-state.json")
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".taskboard")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_share_the_same_directory() {
        assert_eq!(default_db_path().parent(), discovery_cache_path().parent());
        assert_eq!(default_db_path().parent(), ui_state_path().parent());
    }

    #[test]
    fn db_path_has_expected_filename() {
        assert_eq!(default_db_path().file_name().unwrap(), "taskboard.db");
    }
}
