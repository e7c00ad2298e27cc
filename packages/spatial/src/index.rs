//! R-tree join index over one dataset's polygons.
//!
//! Lookups are two-phase: the R-tree narrows to polygons whose bounding
//! box contains the point, then exact containment runs on those
//! candidates only. Each indexed polygon gets an integer handle at
//! insertion time; the side table of source properties is keyed by that
//! handle.

use building_map_source_models::{RawFeature, first_present};
use rstar::{AABB, RTree, RTreeObject};

use crate::normalize::Polygon;

/// Stable identifier of an indexed polygon within one [`JoinIndex`].
pub type Handle = usize;

/// A polygon stored in the R-tree with its handle.
struct IndexedPolygon {
    handle: Handle,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Read-only point-in-polygon index with a handle → properties table.
pub struct JoinIndex {
    tree: RTree<IndexedPolygon>,
    properties: Vec<serde_json::Map<String, serde_json::Value>>,
    discarded: usize,
}

impl JoinIndex {
    /// Normalizes each feature and indexes the valid ones.
    ///
    /// Handles are assigned `0..n` in input order over the valid
    /// polygons. Features without a usable ring are counted in
    /// [`JoinIndex::discarded`].
    #[must_use]
    pub fn build(features: Vec<RawFeature>) -> Self {
        let mut entries = Vec::with_capacity(features.len());
        let mut properties = Vec::with_capacity(features.len());
        let mut discarded = 0;

        for feature in features {
            let Some(polygon) = feature.geometry.as_ref().and_then(Polygon::from_geometry) else {
                discarded += 1;
                continue;
            };

            let handle = properties.len();
            properties.push(feature.properties);
            entries.push(IndexedPolygon {
                handle,
                envelope: polygon.envelope(),
                polygon,
            });
        }

        Self {
            tree: RTree::bulk_load(entries),
            properties,
            discarded,
        }
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no polygon was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Number of input features rejected during the build.
    #[must_use]
    pub const fn discarded(&self) -> usize {
        self.discarded
    }

    /// Handle of the polygon containing `point`.
    ///
    /// Where polygons overlap, the smallest handle wins.
    #[must_use]
    pub fn lookup(&self, point: [f64; 2]) -> Option<Handle> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point(point))
            .filter(|entry| entry.polygon.contains(point))
            .map(|entry| entry.handle)
            .min()
    }

    /// Source properties of the polygon with `handle`.
    #[must_use]
    pub fn properties(&self, handle: Handle) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.properties.get(handle)
    }

    /// Joined attribute at `point`: the first present value among
    /// `candidates` on the containing polygon. `None` when no polygon
    /// contains the point or none of the candidates is set.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(
        &self,
        point: [f64; 2],
        candidates: &[S],
    ) -> Option<&serde_json::Value> {
        let handle = self.lookup(point)?;
        first_present(self.properties(handle)?, candidates)
    }
}
