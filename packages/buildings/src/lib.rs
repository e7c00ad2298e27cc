#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building assembly pipeline.
//!
//! Fetches footprints inside a bounding window, normalizes each to an
//! outer ring, and enriches it with zoning and assessed value joined from
//! the land use district and parcel assessment datasets by containment of
//! the footprint centroid. [`service::BuildingService`] owns the join
//! index cache and the latest assembled payload.

pub mod assemble;
pub mod fields;
pub mod service;

use building_map_building_models::{BoundingWindow, InvalidWindowError};
use building_map_source::SourceError;
use thiserror::Error;

/// Errors that can occur while producing a building payload.
#[derive(Debug, Error)]
pub enum BuildingError {
    /// Fetching, resolving, or joining failed. No partial payload is
    /// produced.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The fetch produced no building with a valid footprint. Usually a
    /// misconfigured window or a source outage.
    #[error("No valid buildings from {dataset} within {window}")]
    EmptyResult {
        /// Building dataset id.
        dataset: String,
        /// Requested window.
        window: BoundingWindow,
    },

    /// The requested window is not a valid bounding window.
    #[error(transparent)]
    InvalidWindow(#[from] InvalidWindowError),

    /// A join index build task panicked or was cancelled.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BuildingError {
    /// Whether this is [`BuildingError::EmptyResult`].
    #[must_use]
    pub const fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult { .. })
    }
}
