//! HTTP file relay client.
//!
//! `POST {base}/upload` with `{path, data}` where `data` is the attachment's
//! data URL; the relay answers `{url}` with the retrieval reference.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lexcase_shared::DataUrl;

use crate::error::{Result, SyncError};
use crate::remote::{FileRelay, RelayPath};

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    path: String,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

pub struct HttpFileRelay {
    client: reqwest::Client,
    upload_url: String,
}

impl HttpFileRelay {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            upload_url: upload_url(base_url),
        })
    }
}

fn upload_url(base_url: &str) -> String {
    format!("{}/upload", base_url.trim_end_matches('/'))
}

#[async_trait]
impl FileRelay for HttpFileRelay {
    async fn upload(&self, path: &RelayPath, data: &DataUrl) -> Result<String> {
        let body = UploadRequest {
            path: path.to_string(),
            data: data.as_str(),
        };

        let resp = self.client.post(&self.upload_url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(SyncError::Relay(format!(
                "relay answered {} for {path}",
                resp.status()
            )));
        }

        let uploaded: UploadResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::Relay(format!("invalid relay response for {path}: {e}")))?;

        debug!(path = %path, url = %uploaded.url, "uploaded to relay");
        Ok(uploaded.url)
    }
}

/// Relay used when none is configured: every upload fails, so attachments
/// stay pending locally until a relay is set up.
pub struct NoRelay;

#[async_trait]
impl FileRelay for NoRelay {
    async fn upload(&self, path: &RelayPath, _data: &DataUrl) -> Result<String> {
        Err(SyncError::Relay(format!("no file relay configured for {path}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexcase_shared::{Account, CaseId};

    #[test]
    fn upload_url_trims_trailing_slash() {
        assert_eq!(upload_url("https://relay.example/"), "https://relay.example/upload");
        assert_eq!(upload_url("https://relay.example"), "https://relay.example/upload");
    }

    #[test]
    fn request_body_shape() {
        let path = RelayPath::new(&Account::new("a@b.c"), &CaseId::from("1"), "x.pdf");
        let data = DataUrl::from_bytes("application/pdf", b"x");
        let body = serde_json::to_value(UploadRequest {
            path: path.to_string(),
            data: data.as_str(),
        })
        .unwrap();
        assert_eq!(body["path"], "cases/a@b.c/1/x.pdf");
        assert_eq!(body["data"], data.as_str());
    }

    #[tokio::test]
    async fn no_relay_always_fails() {
        let path = RelayPath::new(&Account::new("a@b.c"), &CaseId::from("1"), "x.pdf");
        let data = DataUrl::from_bytes("text/plain", b"x");
        assert!(matches!(
            NoRelay.upload(&path, &data).await,
            Err(SyncError::Relay(_))
        ));
    }
}
