// crates/sync/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] taskboard_remote::RemoteError),

    #[error("failed to read/write discovery cache: {0}")]
    Cache(#[from] std::io::Error),

    #[error("discovery cache was malformed: {0}")]
    CacheDecode(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] taskboard_db::DbError),
}

pub type SyncResult<T> = Result<T, SyncError>;
