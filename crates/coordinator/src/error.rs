// crates/coordinator/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("`{0}` is not a valid date; expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("comment body must not be empty")]
    EmptyComment,

    #[error("labels are still loading; try again once they finish")]
    LabelsLoading,

    #[error("unknown option `{0}` for this field")]
    UnknownOption(String),

    #[error("an edit for this field is already in progress")]
    Busy,

    #[error("no field id")]
    NoFieldId,

    #[error("draft issues do not support this edit")]
    UnsupportedForDraft,

    #[error("no such task")]
    UnknownTask,

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("`{0}` is not a valid `owner/repo` repository")]
    InvalidRepository(String),

    #[error("Invalid start timestamp")]
    InvalidSessionStart,

    #[error("Invalid end timestamp")]
    InvalidSessionEnd,

    #[error("End must be after start")]
    SessionEndBeforeStart,

    #[error(transparent)]
    Remote(#[from] taskboard_remote::RemoteError),

    #[error(transparent)]
    Db(#[from] taskboard_db::DbError),
}

pub type EditResult<T> = Result<T, EditError>;
