// crates/sync/src/lib.rs
//! Pulls tasks from GitHub Projects v2 into the local store
//! (spec.md §2 "Sync engine", §4 "Sync semantics").

mod discovery_cache;
mod engine;
mod error;
mod extract;

pub use engine::{FetchResult, SyncEngine, SyncTarget};
pub use error::{SyncError, SyncResult};
pub use extract::{extract_rows, placeholder_row, ExtractContext};
