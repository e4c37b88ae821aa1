//! # lexcase-sync
//!
//! Reconciles the local case table with a per-account remote directory.
//!
//! - [`SyncEngine`]: pull (remote into local, merged by id), push (local
//!   into remote, relaying pending attachments first) and hearing advance,
//!   all serialized behind a single-flight lock
//! - [`remote`]: the contracts of the external collaborators (identity
//!   provider, remote directory, file relay)
//! - [`script`]: HTTP binding of the identity provider and remote directory
//!   to the spreadsheet script endpoint
//! - [`relay`]: HTTP file relay client
//! - [`offline`]: stand-in backend when no endpoint is configured

pub mod engine;
pub mod offline;
pub mod relay;
pub mod remote;
pub mod script;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

mod error;

use std::sync::{Arc, Mutex};

use lexcase_store::Database;

pub use engine::{AdvanceReport, PullReport, PushReport, SyncEngine};
pub use error::{Result, SyncError};
pub use remote::{FileRelay, IdentityProvider, RelayPath, RemoteDirectory};

/// Local store handle shared between the engine and the application.
pub type SharedDatabase = Arc<Mutex<Database>>;
