//! Bounding-window feature fetch.
//!
//! One request per dataset: resolve the geometry field, ask the portal for
//! at most `limit` features inside the window, and parse the
//! `FeatureCollection`. An empty `features` array is a valid answer; a
//! response without one is not.

use building_map_building_models::BoundingWindow;
use building_map_source_models::{DatasetConfig, RawFeature};

use crate::SourceError;
use crate::resolver::GeometryFieldResolver;
use crate::socrata::SocrataClient;
use crate::transport::HttpTransport;

/// Fetches the features of `dataset` inside `window`, capped at `limit`.
///
/// # Errors
///
/// Returns [`SourceError`] if geometry field resolution or the request
/// fails, or if the response is not a `FeatureCollection`.
pub async fn fetch_window<T: HttpTransport>(
    client: &SocrataClient<T>,
    resolver: &GeometryFieldResolver,
    dataset: &DatasetConfig,
    window: &BoundingWindow,
    limit: u32,
) -> Result<Vec<RawFeature>, SourceError> {
    let field = resolver.resolve(client, dataset).await?;
    let body = client
        .geojson_within(&dataset.id, &field, window, limit)
        .await?;
    let features = parse_feature_collection(&body)?;

    log::info!(
        "Fetched {} features from {} within {window}",
        features.len(),
        dataset.id
    );

    Ok(features)
}

/// Parses a `GeoJSON` `FeatureCollection` document into raw features.
///
/// A feature whose geometry is missing or not valid `GeoJSON` is kept with
/// `geometry: None` so the caller decides what to do with it.
///
/// # Errors
///
/// Returns [`SourceError::MalformedResponse`] if there is no `features`
/// array or an element is not an object.
pub fn parse_feature_collection(body: &serde_json::Value) -> Result<Vec<RawFeature>, SourceError> {
    if body.get("error").is_some() {
        let message = body
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error");
        return Err(SourceError::malformed(format!("Portal error: {message}")));
    }

    let features = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SourceError::malformed("No features array in GeoJSON response"))?;

    features
        .iter()
        .enumerate()
        .map(|(i, feature)| parse_feature(i, feature))
        .collect()
}

fn parse_feature(index: usize, feature: &serde_json::Value) -> Result<RawFeature, SourceError> {
    let obj = feature
        .as_object()
        .ok_or_else(|| SourceError::malformed(format!("Feature {index} is not an object")))?;

    let geometry = match obj.get("geometry") {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => match serde_json::from_value::<geojson::Geometry>(value.clone()) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                log::debug!("Feature {index} has unreadable geometry: {e}");
                None
            }
        },
    };

    let properties = obj
        .get("properties")
        .and_then(serde_json::Value::as_object)
        .cloned()
        .unwrap_or_default();

    Ok(RawFeature::new(geometry, properties))
}
