#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Footprint normalization and in-memory spatial join indexes.
//!
//! Raw `GeoJSON` footprints are reduced to a validated outer ring with a
//! centroid ([`normalize::Polygon`]). Join datasets (land use districts,
//! parcel assessments) are loaded into R-tree indexes
//! ([`index::JoinIndex`]) for fast point-in-polygon lookups of building
//! centroids, and kept per window in an LRU ([`cache::IndexCache`]).

pub mod cache;
pub mod index;
pub mod normalize;

pub use cache::IndexCache;
pub use index::{Handle, JoinIndex};
pub use normalize::Polygon;
