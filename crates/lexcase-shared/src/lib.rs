//! # lexcase-shared
//!
//! Domain types shared by every Lexcase crate: case records, attachment
//! descriptors, account identities, and the hearing-date advancer.

pub mod attachment;
pub mod case;
pub mod constants;
pub mod error;
pub mod hearing;
pub mod types;

pub use attachment::{Attachment, DataUrl};
pub use case::{CasePatch, CaseRecord};
pub use error::SharedError;
pub use hearing::HearingUpdate;
pub use types::{Account, CaseId};
