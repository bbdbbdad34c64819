// crates/app/src/env.rs
//! Minimal `.env` loading: per spec.md §1, the mechanics of this are an
//! external collaborator this spec doesn't pin, so this is a thin
//! `std::env` wrapper rather than a dependency on a dotenv crate. Looks in
//! the current directory first, then alongside the running executable,
//! and never overrides a variable already set in the process environment.

use std::path::{Path, PathBuf};

/// Populate `std::env` from the first `.env` file found, if any.
pub fn load_dotenv() {
    for candidate in candidate_paths() {
        if candidate.is_file() {
            apply_file(&candidate);
            return;
        }
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut out = vec![PathBuf::from(".env")];
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            out.push(dir.join(".env"));
        }
    }
    out
}

fn apply_file(path: &Path) {
    let Ok(text) = std::fs::read_to_string(path) else { return };
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else { continue };
        let key = key.trim();
        let mut value = value.trim();
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }
        if key.is_empty() || std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
    }
}

/// Resolve the bearer token per spec.md §6: `GITHUB_TOKEN`, falling back
/// to `TOKEN`.
pub fn resolve_token() -> Option<String> {
    std::env::var("GITHUB_TOKEN")
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("TOKEN").ok().filter(|s| !s.is_empty()))
}

/// `MOCK_FETCH=1` bypasses the network with synthetic rows (spec.md §6).
pub fn mock_fetch_enabled() -> bool {
    std::env::var("MOCK_FETCH").map(|v| v == "1").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn resolve_token_prefers_github_token_over_token() {
        std::env::set_var("GITHUB_TOKEN", "gh-token");
        std::env::set_var("TOKEN", "fallback-token");
        assert_eq!(resolve_token(), Some("gh-token".to_string()));
        std::env::remove_var("GITHUB_TOKEN");
        assert_eq!(resolve_token(), Some("fallback-token".to_string()));
        std::env::remove_var("TOKEN");
        assert_eq!(resolve_token(), None);
    }

    #[test]
    #[serial]
    fn mock_fetch_enabled_requires_exact_literal_one() {
        std::env::remove_var("MOCK_FETCH");
        assert!(!mock_fetch_enabled());
        std::env::set_var("MOCK_FETCH", "1");
        assert!(mock_fetch_enabled());
        std::env::set_var("MOCK_FETCH", "true");
        assert!(!mock_fetch_enabled());
        std::env::remove_var("MOCK_FETCH");
    }

    #[test]
    fn apply_file_never_overrides_an_already_set_variable() {
        std::env::set_var("TASKBOARD_TEST_ALREADY_SET", "original");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "TASKBOARD_TEST_ALREADY_SET=overwritten\n").unwrap();
        apply_file(&path);
        assert_eq!(
            std::env::var("TASKBOARD_TEST_ALREADY_SET").unwrap(),
            "original"
        );
        std::env::remove_var("TASKBOARD_TEST_ALREADY_SET");
    }
}
