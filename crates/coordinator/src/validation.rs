// crates/coordinator/src/validation.rs
//! Input validation for edits before they're applied optimistically or
//! sent to the remote (spec.md §4.4 "Validation").

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{EditError, EditResult};

/// Validate and normalize a date string; empty clears the field.
pub fn validate_date(input: &str) -> EditResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|_| trimmed.to_string())
        .map_err(|_| EditError::InvalidDate(trimmed.to_string()))
}

/// Trim whitespace, drop empties, and deduplicate while preserving the
/// first occurrence's ordering.
pub fn normalize_labels(input: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for raw in input {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

pub fn validate_comment(body: &str) -> EditResult<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        Err(EditError::EmptyComment)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Validate a new item's title (Add flow, spec.md §4.3 `create_project_item`).
pub fn validate_title(title: &str) -> EditResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(EditError::EmptyTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Split and validate an `owner/repo` string typed in the Add flow's repo
/// step.
pub fn validate_repository(repository: &str) -> EditResult<(String, String)> {
    let trimmed = repository.trim();
    let Some((owner, name)) = trimmed.split_once('/') else {
        return Err(EditError::InvalidRepository(trimmed.to_string()));
    };
    if owner.is_empty() || name.is_empty() {
        return Err(EditError::InvalidRepository(trimmed.to_string()));
    }
    Ok((owner.to_string(), name.to_string()))
}

/// Validate a manual work-session edit (spec.md §8 scenario 6): both
/// timestamps must parse as RFC3339, and when an end is given it must be
/// strictly after the start. An empty `ended_at` leaves the session open.
pub fn validate_session_times(
    started_at: &str,
    ended_at: &str,
) -> EditResult<(DateTime<Utc>, Option<DateTime<Utc>>)> {
    let started = DateTime::parse_from_rfc3339(started_at.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| EditError::InvalidSessionStart)?;

    let ended = if ended_at.trim().is_empty() {
        None
    } else {
        Some(
            DateTime::parse_from_rfc3339(ended_at.trim())
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| EditError::InvalidSessionEnd)?,
        )
    };

    if let Some(e) = ended {
        if e <= started {
            return Err(EditError::SessionEndBeforeStart);
        }
    }

    Ok((started, ended))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_date_accepts_iso_and_empty() {
        assert_eq!(validate_date("2026-03-05").unwrap(), "2026-03-05");
        assert_eq!(validate_date("").unwrap(), "");
        assert_eq!(validate_date("   ").unwrap(), "");
    }

    #[test]
    fn validate_date_rejects_garbage() {
        assert!(validate_date("not-a-date").is_err());
        assert!(validate_date("03/05/2026").is_err());
    }

    #[test]
    fn normalize_labels_trims_dedupes_preserves_order() {
        let input = vec!["bug".into(), " bug ".into(), "".into(), "enhancement".into()];
        assert_eq!(normalize_labels(&input), vec!["bug".to_string(), "enhancement".to_string()]);
    }

    #[test]
    fn validate_comment_rejects_blank() {
        assert!(validate_comment("   ").is_err());
        assert_eq!(validate_comment(" hello ").unwrap(), "hello");
    }

    #[test]
    fn validate_session_times_rejects_end_before_start() {
        let err = validate_session_times("2026-03-05T09:00:00Z", "2026-03-05T08:30:00Z").unwrap_err();
        assert!(matches!(err, EditError::SessionEndBeforeStart));
    }

    #[test]
    fn validate_session_times_rejects_unparseable_start() {
        let err = validate_session_times("not-a-timestamp", "").unwrap_err();
        assert!(matches!(err, EditError::InvalidSessionStart));
    }

    #[test]
    fn validate_session_times_accepts_open_session() {
        let (started, ended) = validate_session_times("2026-03-05T09:00:00Z", "").unwrap();
        assert_eq!(started.to_rfc3339(), "2026-03-05T09:00:00+00:00");
        assert!(ended.is_none());
    }

    #[test]
    fn validate_title_rejects_blank() {
        assert!(matches!(validate_title("   "), Err(EditError::EmptyTitle)));
        assert_eq!(validate_title(" Fix the thing ").unwrap(), "Fix the thing");
    }

    #[test]
    fn validate_repository_requires_owner_and_name() {
        assert_eq!(validate_repository("acme/widgets").unwrap(), ("acme".to_string(), "widgets".to_string()));
        assert!(matches!(validate_repository("widgets"), Err(EditError::InvalidRepository(_))));
        assert!(matches!(validate_repository("acme/"), Err(EditError::InvalidRepository(_))));
        assert!(matches!(validate_repository("/widgets"), Err(EditError::InvalidRepository(_))));
    }
}
