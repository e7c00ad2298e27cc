//! HTTP transport seam.
//!
//! The portal client only ever needs "GET this URL with these query
//! parameters and give me JSON back". Keeping that behind a trait lets the
//! service run against canned responses offline.

use std::time::Duration;

use async_trait::async_trait;

use crate::SourceError;

/// Maximum time allowed to establish a connection, independent of the
/// overall request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 200;

/// Issues JSON GET requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a GET request to `url` with `query` appended and parses the
    /// body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] on transport failure or
    /// timeout, [`SourceError::Status`] on a non-success status, and
    /// [`SourceError::MalformedResponse`] if the body is not JSON.
    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, SourceError>;
}

/// [`HttpTransport`] backed by a `reqwest` client with a fixed timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, SourceError> {
        log::debug!("GET {url} {query:?}");

        let resp = self.client.get(url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: resp.url().to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
            SourceError::malformed(format!(
                "Failed to parse JSON from {url}: {e} (body starts with {preview:?})"
            ))
        })
    }
}
