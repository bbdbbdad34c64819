// crates/core/src/config.rs
//! Declarative configuration document (spec.md §6 "Configuration document").
//!
//! Parsed with `toml` rather than hand-rolled parsing, matching the
//! teacher's practice of reaching for a real deserializer for every
//! boundary format instead of ad-hoc string splitting.

use std::path::Path;

use regex_lite::Regex;
use serde::Deserialize;

use crate::error::ConfigError;

/// One entry of the `projects` list: an owner plus which project numbers
/// under that owner to track.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSourceDoc {
    /// Exactly one of `org` / `user` must be set.
    pub org: Option<String>,
    pub user: Option<String>,
    pub numbers: ProjectNumbers,
}

/// `numbers: list[int] | "all"` from spec.md §6.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProjectNumbers {
    Explicit(Vec<i64>),
    All(AllKeyword),
}

/// Deserializes only the literal string `"all"`.
#[derive(Debug, Clone)]
pub struct AllKeyword;

impl<'de> Deserialize<'de> for AllKeyword {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "all" {
            Ok(AllKeyword)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected the literal string \"all\", got \"{s}\""
            )))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    user: String,
    date_field_regex: Option<String>,
    date_field_names: Option<Vec<String>>,
    iteration_field_regex: Option<String>,
    projects: Vec<ProjectSourceDoc>,
}

/// A fully validated, owner-resolved project source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSource {
    pub owner_type: taskboard_types::OwnerType,
    pub owner: String,
    pub numbers: ResolvedNumbers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedNumbers {
    Explicit(Vec<i64>),
    All,
}

/// The validated, ready-to-use configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub user: String,
    pub date_field_regex: Regex,
    pub iteration_field_regex: Option<Regex>,
    pub projects: Vec<ProjectSource>,
}

impl Config {
    /// Load and validate the configuration document at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::parse(&text)
    }

    /// Parse and validate a configuration document already read into memory.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|e| ConfigError::Malformed {
                path: "<config>".into(),
                source: Box::new(e),
            })?;

        if raw.user.trim().is_empty() {
            return Err(ConfigError::MissingUser);
        }
        if raw.projects.is_empty() {
            return Err(ConfigError::EmptyProjects);
        }

        let date_field_regex = match (raw.date_field_regex, raw.date_field_names) {
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousDateField),
            (None, None) => return Err(ConfigError::AmbiguousDateField),
            (Some(pattern), None) => {
                // Matches date_field_names below: the original always
                // compiles with re.IGNORECASE regardless of which config
                // key supplied the pattern.
                Regex::new(&format!("(?i){pattern}")).map_err(|source| ConfigError::InvalidRegex {
                    field: "date_field_regex",
                    source,
                })?
            }
            (None, Some(names)) => {
                let pattern = anchored_alternation(&names);
                Regex::new(&pattern).map_err(|source| ConfigError::InvalidRegex {
                    field: "date_field_names",
                    source,
                })?
            }
        };

        let iteration_field_regex = raw
            .iteration_field_regex
            .map(|p| {
                Regex::new(&p).map_err(|source| ConfigError::InvalidRegex {
                    field: "iteration_field_regex",
                    source,
                })
            })
            .transpose()?;

        let mut projects = Vec::with_capacity(raw.projects.len());
        for p in raw.projects {
            let (owner_type, owner) = match (p.org, p.user) {
                (Some(org), None) => (taskboard_types::OwnerType::Org, org),
                (None, Some(user)) => (taskboard_types::OwnerType::User, user),
                _ => return Err(ConfigError::EmptyProjects),
            };
            let numbers = match p.numbers {
                ProjectNumbers::Explicit(v) => ResolvedNumbers::Explicit(v),
                ProjectNumbers::All(_) => ResolvedNumbers::All,
            };
            projects.push(ProjectSource {
                owner_type,
                owner,
                numbers,
            });
        }

        Ok(Config {
            user: raw.user,
            date_field_regex,
            iteration_field_regex,
            projects,
        })
    }
}

/// Compile a list of exact field names into a single anchored
/// case-insensitive alternation, e.g. `["Target date", "Due"]` becomes
/// `(?i)^(Target date|Due)$`, per spec.md §6.
fn anchored_alternation(names: &[String]) -> String {
    let escaped: Vec<String> = names.iter().map(|n| regex_lite_escape(n)).collect();
    format!("(?i)^({})$", escaped.join("|"))
}

/// `regex-lite` has no `regex::escape` helper; escape metacharacters by hand.
fn regex_lite_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
user = "octocat"
date_field_regex = "(?i)target date|due"

[[projects]]
org = "acme"
numbers = [1, 2]

[[projects]]
user = "octocat"
numbers = "all"
"#;

    #[test]
    fn parses_valid_config() {
        let cfg = Config::parse(VALID).expect("should parse");
        assert_eq!(cfg.user, "octocat");
        assert_eq!(cfg.projects.len(), 2);
        assert_eq!(cfg.projects[0].owner_type, taskboard_types::OwnerType::Org);
        assert_eq!(
            cfg.projects[1].numbers,
            ResolvedNumbers::All
        );
        assert!(cfg.date_field_regex.is_match("Target Date"));
    }

    #[test]
    fn date_field_names_compiles_to_anchored_alternation() {
        let text = r#"
user = "octocat"
date_field_names = ["Target date", "Due"]

[[projects]]
org = "acme"
numbers = [1]
"#;
        let cfg = Config::parse(text).unwrap();
        assert!(cfg.date_field_regex.is_match("target date"));
        assert!(cfg.date_field_regex.is_match("Due"));
        // Anchored: must not match a field that merely contains the word.
        assert!(!cfg.date_field_regex.is_match("Due Diligence"));
    }

    #[test]
    fn date_field_regex_matches_case_insensitively_without_an_explicit_flag() {
        let text = r#"
user = "octocat"
date_field_regex = "due"

[[projects]]
org = "acme"
numbers = [1]
"#;
        let cfg = Config::parse(text).unwrap();
        assert!(cfg.date_field_regex.is_match("DUE"));
        assert!(cfg.date_field_regex.is_match("Due Diligence"));
    }

    #[test]
    fn missing_user_is_rejected() {
        let text = r#"
user = ""
date_field_regex = "due"

[[projects]]
org = "acme"
numbers = [1]
"#;
        assert!(matches!(
            Config::parse(text),
            Err(ConfigError::MissingUser)
        ));
    }

    #[test]
    fn ambiguous_date_field_is_rejected() {
        let text = r#"
user = "octocat"
date_field_regex = "due"
date_field_names = ["Due"]

[[projects]]
org = "acme"
numbers = [1]
"#;
        assert!(matches!(
            Config::parse(text),
            Err(ConfigError::AmbiguousDateField)
        ));
    }

    #[test]
    fn empty_projects_is_rejected() {
        let text = r#"
user = "octocat"
date_field_regex = "due"
projects = []
"#;
        assert!(matches!(Config::parse(text), Err(ConfigError::EmptyProjects)));
    }
}
