//! Socrata portal endpoints.
//!
//! Two endpoints are used: the view metadata (`/api/views/{id}.json`),
//! which lists each column's declared type, and the `GeoJSON` resource
//! export (`/resource/{id}.geojson`), which accepts `$limit` and a
//! `$where` clause with the `within_box` spatial predicate.

use building_map_building_models::BoundingWindow;

use crate::SourceError;
use crate::transport::HttpTransport;

/// A Socrata portal reached through an [`HttpTransport`].
pub struct SocrataClient<T> {
    domain: String,
    transport: T,
}

impl<T: HttpTransport> SocrataClient<T> {
    /// Creates a client for the portal at `domain`
    /// (e.g., `"https://data.calgary.ca"`).
    #[must_use]
    pub fn new(domain: &str, transport: T) -> Self {
        Self {
            domain: domain.trim_end_matches('/').to_string(),
            transport,
        }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Metadata URL for `dataset`.
    #[must_use]
    pub fn metadata_url(&self, dataset: &str) -> String {
        format!("{}/api/views/{dataset}.json", self.domain)
    }

    /// `GeoJSON` export URL for `dataset`.
    #[must_use]
    pub fn resource_url(&self, dataset: &str) -> String {
        format!("{}/resource/{dataset}.geojson", self.domain)
    }

    /// Fetches the view metadata document for `dataset`.
    ///
    /// # Errors
    ///
    /// Propagates any transport error.
    pub async fn metadata(&self, dataset: &str) -> Result<serde_json::Value, SourceError> {
        self.transport.get_json(&self.metadata_url(dataset), &[]).await
    }

    /// Fetches at most `limit` features of `dataset` whose `field` lies in
    /// `window`, as a raw `FeatureCollection` document.
    ///
    /// # Errors
    ///
    /// Propagates any transport error.
    pub async fn geojson_within(
        &self,
        dataset: &str,
        field: &str,
        window: &BoundingWindow,
        limit: u32,
    ) -> Result<serde_json::Value, SourceError> {
        let query = [
            ("$limit", limit.to_string()),
            ("$where", within_box(field, window)),
        ];
        self.transport
            .get_json(&self.resource_url(dataset), &query)
            .await
    }
}

/// Builds the `within_box` predicate for `field`.
///
/// Socrata expects the top-left corner (north, west) followed by the
/// bottom-right corner (south, east).
#[must_use]
pub fn within_box(field: &str, window: &BoundingWindow) -> String {
    format!(
        "within_box({field}, {}, {}, {}, {})",
        window.north, window.west, window.south, window.east
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    fn window() -> BoundingWindow {
        BoundingWindow::new(51.049, 51.046, -114.065, -114.071).unwrap()
    }

    #[test]
    fn builds_within_box_top_left_first() {
        assert_eq!(
            within_box("geom", &window()),
            "within_box(geom, 51.049, -114.071, 51.046, -114.065)"
        );
    }

    #[test]
    fn trims_trailing_slash_from_domain() {
        let client = SocrataClient::new("https://data.calgary.ca/", MemoryTransport::new());
        assert_eq!(
            client.metadata_url("cchr-krqg"),
            "https://data.calgary.ca/api/views/cchr-krqg.json"
        );
        assert_eq!(
            client.resource_url("cchr-krqg"),
            "https://data.calgary.ca/resource/cchr-krqg.geojson"
        );
    }

    #[tokio::test]
    async fn sends_limit_and_where() {
        let transport = MemoryTransport::new()
            .with_json("/resource/abcd-1234", serde_json::json!({ "features": [] }));
        let client = SocrataClient::new("https://portal", transport);

        client
            .geojson_within("abcd-1234", "the_geom", &window(), 75)
            .await
            .unwrap();

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("$limit=75"));
        assert!(requests[0].contains("$where=within_box(the_geom, 51.049"));
    }
}
