// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading and validating the configuration
/// document (spec.md §6, §7 `ConfigInvalid`).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("Config is missing required key `user`")]
    MissingUser,

    #[error("Config must set exactly one of `date_field_regex` or `date_field_names`")]
    AmbiguousDateField,

    #[error("Config's `projects` list must not be empty")]
    EmptyProjects,

    #[error("Invalid regex in config field `{field}`: {source}")]
    InvalidRegex {
        field: &'static str,
        #[source]
        source: regex_lite::Error,
    },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_contains_path() {
        let err = ConfigError::NotFound {
            path: "/tmp/missing.toml".into(),
        };
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }
}
