//! # lexcase-store
//!
//! Per-device case storage for Lexcase, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides the case table operations (add,
//! put, get, get-all, delete, clear) plus the persisted sign-in session.

pub mod cases;
pub mod database;
pub mod hearings;
pub mod migrations;
pub mod session;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use hearings::AdvanceReport;
