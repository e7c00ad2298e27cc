//! Geometry field resolution.
//!
//! Socrata datasets name their geometry column inconsistently (`the_geom`,
//! `geom`, `multipolygon`, `shape`, ...). The resolver checks an explicit
//! per-dataset override, then the dataset's schema metadata, and caches
//! the answer for the life of the resolver.

use std::collections::BTreeMap;
use std::sync::RwLock;

use building_map_source_models::{ColumnMetadata, DatasetConfig};

use crate::SourceError;
use crate::socrata::SocrataClient;
use crate::transport::HttpTransport;

/// Declared column types that carry geometry, most preferred first.
const GEOMETRY_TYPES: &[&str] = &[
    "multipolygon",
    "polygon",
    "multiline",
    "line",
    "multipoint",
    "point",
    "location",
];

/// Resolves and caches geometry field names per dataset id.
#[derive(Debug, Default)]
pub struct GeometryFieldResolver {
    cache: RwLock<BTreeMap<String, String>>,
}

impl GeometryFieldResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the geometry field for `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the metadata request fails or the
    /// metadata has no `columns` array. Failures are not cached.
    pub async fn resolve<T: HttpTransport>(
        &self,
        client: &SocrataClient<T>,
        dataset: &DatasetConfig,
    ) -> Result<String, SourceError> {
        if let Some(field) = &dataset.geometry_field {
            return Ok(field.clone());
        }

        if let Some(field) = self.cached(&dataset.id) {
            log::debug!("Geometry field for {} (cached): {field}", dataset.id);
            return Ok(field);
        }

        let metadata = client.metadata(&dataset.id).await?;
        let columns = parse_columns(&metadata)?;

        let field = if let Some(field) = pick_geometry_field(&columns) {
            log::debug!("Geometry field for {} (metadata): {field}", dataset.id);
            field.to_string()
        } else {
            log::warn!(
                "No geometry-typed column in metadata for {}, using {}",
                dataset.id,
                dataset.default_geometry_field
            );
            dataset.default_geometry_field.clone()
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(dataset.id.clone(), field.clone());
        }

        Ok(field)
    }

    fn cached(&self, dataset_id: &str) -> Option<String> {
        self.cache.read().ok()?.get(dataset_id).cloned()
    }
}

/// Extracts the column list from a view metadata document.
///
/// # Errors
///
/// Returns [`SourceError::MalformedResponse`] if there is no `columns`
/// array or an entry lacks `fieldName`/`dataTypeName`.
pub fn parse_columns(metadata: &serde_json::Value) -> Result<Vec<ColumnMetadata>, SourceError> {
    let columns = metadata
        .get("columns")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SourceError::malformed("No columns array in dataset metadata"))?;

    columns
        .iter()
        .map(|column| {
            serde_json::from_value(column.clone())
                .map_err(|e| SourceError::malformed(format!("Invalid column metadata: {e}")))
        })
        .collect()
}

/// Picks the geometry-bearing column by [`GEOMETRY_TYPES`] preference.
///
/// Ties within a type go to the first column listed.
#[must_use]
pub fn pick_geometry_field(columns: &[ColumnMetadata]) -> Option<&str> {
    GEOMETRY_TYPES.iter().find_map(|geometry_type| {
        columns
            .iter()
            .find(|c| c.data_type_name.eq_ignore_ascii_case(geometry_type))
            .map(|c| c.field_name.as_str())
    })
}
