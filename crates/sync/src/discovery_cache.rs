// crates/sync/src/discovery_cache.rs
//! On-disk cache of the last successful `numbers = "all"` project
//! discovery, used as a fallback when a scan can't reach GitHub at all
//! (spec.md §4.2 "discovery" Non-goal carve-out: never block the UI on a
//! live discovery call when a previous result exists).

use std::path::Path;

use serde::{Deserialize, Serialize};
use taskboard_remote::ProjectSummary;
use tempfile::NamedTempFile;

use crate::error::SyncResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDiscovery {
    pub owner: String,
    pub projects: Vec<CachedProject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedProject {
    pub number: i64,
    pub title: String,
}

impl From<&ProjectSummary> for CachedProject {
    fn from(p: &ProjectSummary) -> Self {
        CachedProject {
            number: p.number,
            title: p.title.clone(),
        }
    }
}

/// Load the cache file, if any. A missing or malformed file is treated as
/// an empty cache rather than a hard error — the caller falls back to
/// nothing discovered for that owner.
pub fn load(path: &Path) -> Vec<CachedDiscovery> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

/// Atomically replace the cache file: write to a sibling temp file, then
/// rename over the target, so a crash mid-write never leaves a truncated
/// or partially-written cache behind.
pub fn save(path: &Path, cache: &[CachedDiscovery]) -> SyncResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(cache)?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut tmp, json.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Merge a freshly discovered project list for `owner` into the cache,
/// replacing any prior entry for the same owner.
pub fn upsert(cache: &mut Vec<CachedDiscovery>, owner: &str, projects: &[ProjectSummary]) {
    cache.retain(|c| c.owner != owner);
    cache.push(CachedDiscovery {
        owner: owner.to_string(),
        projects: projects.iter().map(CachedProject::from).collect(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery-cache.json");

        let mut cache = Vec::new();
        upsert(
            &mut cache,
            "acme",
            &[ProjectSummary {
                number: 7,
                title: "Roadmap".into(),
                url: "https://github.com/orgs/acme/projects/7".into(),
                closed: false,
            }],
        );
        save(&path, &cache).unwrap();

        let loaded = load(&path);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].owner, "acme");
        assert_eq!(loaded[0].projects[0].number, 7);
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load(&path).is_empty());
    }
}
