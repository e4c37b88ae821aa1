//! Command handlers.
//!
//! Each sub-module groups related commands by domain. Commands take the
//! shared [`AppState`](crate::state::AppState) and refresh its case snapshot
//! before returning from any mutation.

pub mod cases;
pub mod dashboard;
pub mod identity;
pub mod sync;
