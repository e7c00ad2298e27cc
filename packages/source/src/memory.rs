//! In-memory [`HttpTransport`] serving canned JSON.
//!
//! Responses are matched by URL substring, first registration wins.
//! Every request is recorded so callers can assert which datasets were
//! (or were not) contacted.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::SourceError;
use crate::transport::HttpTransport;

enum Canned {
    Json(serde_json::Value),
    Status(u16),
}

/// Canned-response transport.
#[derive(Default)]
pub struct MemoryTransport {
    routes: Vec<(String, Canned)>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    /// Creates a transport with no routes; every request answers 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests whose URL contains `url_part` with `body`.
    #[must_use]
    pub fn with_json(mut self, url_part: &str, body: serde_json::Value) -> Self {
        self.routes.push((url_part.to_string(), Canned::Json(body)));
        self
    }

    /// Answers requests whose URL contains `url_part` with `status`.
    #[must_use]
    pub fn with_status(mut self, url_part: &str, status: u16) -> Self {
        self.routes.push((url_part.to_string(), Canned::Status(status)));
        self
    }

    /// Every request seen so far, as `url?key=value&...`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests whose URL contains `url_part`.
    #[must_use]
    pub fn request_count(&self, url_part: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.contains(url_part))
            .count()
    }
}

#[async_trait]
impl HttpTransport for MemoryTransport {
    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, SourceError> {
        let params: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let line = if params.is_empty() {
            url.to_string()
        } else {
            format!("{url}?{}", params.join("&"))
        };
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(line);
        }

        match self.routes.iter().find(|(part, _)| url.contains(part.as_str())) {
            Some((_, Canned::Json(body))) => Ok(body.clone()),
            Some((_, Canned::Status(status))) => Err(SourceError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(SourceError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
