#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw source shapes and dataset configuration.
//!
//! [`RawFeature`] is what the geometry service hands back per fetch, and
//! [`ColumnMetadata`] is one entry of a dataset's schema listing. The
//! remaining types form the TOML schema describing which datasets to
//! query and how to read their inconsistently named properties.

use building_map_building_models::BoundingWindow;
use serde::{Deserialize, Serialize};

/// One feature from a geometry service response.
///
/// Transient: produced per fetch and consumed by normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Parsed geometry, or `None` when absent or not valid `GeoJSON`.
    pub geometry: Option<geojson::Geometry>,
    /// Open-ended property map. Empty when the source sent `null`.
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl RawFeature {
    /// Creates a feature from its parts.
    #[must_use]
    pub const fn new(
        geometry: Option<geojson::Geometry>,
        properties: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            geometry,
            properties,
        }
    }
}

/// Walks a fallback chain: returns the value of the first key in `keys`
/// that is present, not `null`, and not a blank string.
#[must_use]
pub fn first_present<'a, S: AsRef<str>>(
    properties: &'a serde_json::Map<String, serde_json::Value>,
    keys: &[S],
) -> Option<&'a serde_json::Value> {
    keys.iter()
        .filter_map(|key| properties.get(key.as_ref()))
        .find(|value| is_set(value))
}

/// Whether a property value counts as set: not `null` and not a blank
/// string.
#[must_use]
pub fn is_set(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// One column of a dataset's schema metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    /// API field name (e.g., `"the_geom"`).
    pub field_name: String,
    /// Declared type name (e.g., `"multipolygon"`, `"text"`).
    pub data_type_name: String,
}

/// Top-level configuration for one open data portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Portal base URL (e.g., `"https://data.calgary.ca"`).
    pub domain: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of join indexes kept per join dataset.
    #[serde(default = "default_index_cache_capacity")]
    pub index_cache_capacity: usize,
    /// Window used when the caller does not supply one.
    pub default_window: BoundingWindow,
    /// The building footprint dataset.
    pub buildings: DatasetConfig,
    /// Land use districts, joined into [`building_map_building_models::Building::zoning`].
    pub zoning: JoinConfig,
    /// Parcel assessments, joined into
    /// [`building_map_building_models::Building::assessed_value`].
    pub assessment: JoinConfig,
    /// Property name fallbacks for the building dataset.
    #[serde(default)]
    pub fields: FieldChains,
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_index_cache_capacity() -> usize {
    16
}

/// A dataset on the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset identifier (e.g., `"cchr-krqg"`).
    pub id: String,
    /// Geometry field to use instead of consulting schema metadata.
    #[serde(default)]
    pub geometry_field: Option<String>,
    /// Geometry field to use when metadata lists no geometry column.
    #[serde(default = "default_geometry_field")]
    pub default_geometry_field: String,
    /// Maximum number of features per fetch.
    pub limit: u32,
}

fn default_geometry_field() -> String {
    "the_geom".to_string()
}

/// A dataset joined onto buildings by point-in-polygon containment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinConfig {
    /// The dataset itself.
    #[serde(flatten)]
    pub dataset: DatasetConfig,
    /// Property names holding the joined value, tried in order.
    pub attribute: Vec<String>,
}

/// Ordered candidate property names per semantic building field.
///
/// Upstream schemas name the same attribute differently between datasets
/// and releases; the first candidate with a non-null value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldChains {
    /// Identifier candidates.
    pub id: Vec<String>,
    /// Height candidates (meters).
    pub height: Vec<String>,
    /// Zoning / land use district candidates.
    pub zoning: Vec<String>,
    /// Assessed value candidates.
    pub assessed_value: Vec<String>,
    /// Civic address candidates.
    pub address: Vec<String>,
}

impl Default for FieldChains {
    fn default() -> Self {
        fn owned(keys: &[&str]) -> Vec<String> {
            keys.iter().map(|k| (*k).to_string()).collect()
        }

        Self {
            id: owned(&[
                "id",
                "bldg_id",
                "building_id",
                "struct_id",
                "objectid",
                "OBJECTID",
                ":id",
            ]),
            height: owned(&[
                "height",
                "bldg_height",
                "building_height",
                "max_height",
                "roof_height",
            ]),
            zoning: owned(&["land_use_district", "lu_code", "zoning", "district"]),
            assessed_value: owned(&[
                "assessed_value",
                "re_assessed_value",
                "total_assessed_value",
                "nr_assessed_value",
            ]),
            address: owned(&["address", "full_address", "civic_address"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_present_skips_null_and_blank() {
        let props = serde_json::json!({ "a": null, "b": "  ", "c": 0, "d": "x" });
        let props = props.as_object().unwrap();
        assert_eq!(first_present(props, &["a", "b", "c", "d"]), Some(&serde_json::json!(0)));
        assert_eq!(first_present(props, &["missing", "d"]), Some(&serde_json::json!("x")));
        assert_eq!(first_present(props, &["a", "b"]), None);
    }

    #[test]
    fn partial_field_chains_keep_defaults() {
        let chains: FieldChains = toml::from_str("height = [\"hgt\"]").unwrap();
        assert_eq!(chains.height, vec!["hgt".to_string()]);
        assert_eq!(chains.id, FieldChains::default().id);
    }

    #[test]
    fn join_config_flattens_dataset() {
        let join: JoinConfig = toml::from_str(
            "id = \"qe6k-p9nh\"\nlimit = 5000\nattribute = [\"lu_code\"]\n",
        )
        .unwrap();
        assert_eq!(join.dataset.id, "qe6k-p9nh");
        assert_eq!(join.dataset.limit, 5000);
        assert_eq!(join.dataset.default_geometry_field, "the_geom");
        assert!(join.dataset.geometry_field.is_none());
    }

    #[test]
    fn column_metadata_reads_socrata_names() {
        let column: ColumnMetadata = serde_json::from_value(serde_json::json!({
            "fieldName": "multipolygon",
            "dataTypeName": "multipolygon",
            "name": "Shape"
        }))
        .unwrap();
        assert_eq!(column.field_name, "multipolygon");
    }
}
