// crates/remote/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GraphQL response carried errors: {0}")]
    GraphQl(String),

    #[error("response body did not match the expected shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("rate limited; retried {attempts} times and gave up")]
    RateLimited { attempts: u32 },

    /// Repeated 5xx responses or transport-level failures (timeouts,
    /// connection resets) with no rate-limit signal from GitHub — distinct
    /// from `RateLimited` so callers can tell a transient network blip
    /// apart from an actual rate-limit abort (spec.md §7).
    #[error("network transient failure; retried {attempts} times and gave up")]
    NetworkTransient { attempts: u32 },

    #[error("field `{0}` not found on project")]
    FieldNotFound(String),

    /// A `NOT_FOUND` GraphQL error scoped to a `projectV2` path — the
    /// sync engine swallows this for the one target instead of aborting
    /// the whole run (spec.md §4.3 step 2, §7 `ProjectNotFound`).
    #[error("project not found: {0}")]
    ProjectNotFound(String),
}

impl RemoteError {
    pub fn is_project_not_found(&self) -> bool {
        matches!(self, RemoteError::ProjectNotFound(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
