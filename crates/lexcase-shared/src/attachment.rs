//! Case attachments.
//!
//! An attachment is either waiting to be relayed (it carries its bytes
//! inline as a data URL) or already relayed (it carries only the reference
//! returned by the file relay). Push code matches on the variant, so a
//! relayed reference can never be re-uploaded or lost by accident.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::SharedError;

/// Inline file content encoded as an RFC 2397 `data:` URL
/// (`data:<mime>;base64,<payload>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DataUrl(String);

impl DataUrl {
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// Validate and wrap an existing data URL string.
    pub fn parse(s: impl Into<String>) -> Result<Self, SharedError> {
        let url = Self(s.into());
        url.split()?;
        Ok(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mime(&self) -> Result<&str, SharedError> {
        self.split().map(|(mime, _)| mime)
    }

    /// Decode the payload back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, SharedError> {
        let (_, payload) = self.split()?;
        Ok(STANDARD.decode(payload)?)
    }

    fn split(&self) -> Result<(&str, &str), SharedError> {
        let rest = self
            .0
            .strip_prefix("data:")
            .ok_or_else(|| SharedError::InvalidDataUrl("missing data: prefix".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| SharedError::InvalidDataUrl("missing ',' separator".into()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| SharedError::InvalidDataUrl("only base64 payloads are supported".into()))?;
        Ok((mime, payload))
    }
}

/// One file attached to a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Attachment {
    /// Not yet relayed; bytes are carried inline.
    Pending { name: String, data: DataUrl },
    /// Stored by the file relay; `url` is the retrieval reference.
    Relayed { name: String, url: String },
}

impl Attachment {
    pub fn pending(name: impl Into<String>, data: DataUrl) -> Self {
        Self::Pending {
            name: name.into(),
            data,
        }
    }

    pub fn relayed(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Relayed {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Pending { name, .. } | Self::Relayed { name, .. } => name,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}
