// crates/app/src/lib.rs
//! Binary-crate-only concerns that don't belong in the library crates:
//! `.env`/token resolution, `MOCK_FETCH` row synthesis, and the background
//! sync loop that bridges `taskboard-sync` to the UI's progress channel.

pub mod env;
pub mod mock;
pub mod sync_loop;
