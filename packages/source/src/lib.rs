#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Open data portal client for building footprints and join datasets.
//!
//! Resolves which schema field of a dataset carries its geometry, then
//! issues one spatially filtered, row-capped request per dataset and
//! returns the raw features. All requests go through the
//! [`transport::HttpTransport`] seam and are bounded by a timeout; there
//! is no retry loop: a timeout surfaces as
//! [`SourceError::Unavailable`].

pub mod fetch;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod registry;
pub mod resolver;
pub mod socrata;
pub mod transport;

/// Errors that can occur while talking to the open data portal.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport failure, including timeouts.
    #[error("Source unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// The portal answered with a non-success status.
    #[error("Source returned HTTP {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response did not have the expected structure.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Description of what was missing or invalid.
        message: String,
    },

    /// The dataset configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether this error means the portal could not be reached or refused
    /// the request, as opposed to answering with something unusable.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Status { .. })
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }
}
