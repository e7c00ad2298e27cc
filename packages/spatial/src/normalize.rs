//! Footprint ring extraction, centroids, and local planar projection.
//!
//! Only the outer ring survives normalization: the first ring of a
//! `Polygon`, or the first ring of the first part of a `MultiPolygon`.
//! Holes and additional parts are dropped. Coordinates are assumed to be
//! locally planar over a window, so projection is a plain translation to
//! the window center with no geodesic reprojection.

use building_map_building_models::Origin;
use geo::{Area, BoundingRect, Centroid, Contains};
use rstar::AABB;

/// A validated outer ring of at least three distinct points.
#[derive(Debug, Clone)]
pub struct Polygon {
    ring: Vec<[f64; 2]>,
    shape: geo::Polygon<f64>,
    centroid: [f64; 2],
}

impl Polygon {
    /// Normalizes a `GeoJSON` geometry. Returns `None` for non-polygonal
    /// geometries and for rings that fail [`Polygon::from_positions`].
    #[must_use]
    pub fn from_geometry(geometry: &geojson::Geometry) -> Option<Self> {
        Self::from_positions(outer_ring(geometry)?)
    }

    /// Builds a polygon from `GeoJSON` positions.
    ///
    /// Consecutive duplicates and the closing point are removed first.
    /// Returns `None` if a position has fewer than two ordinates or a
    /// non-finite one, or if fewer than three distinct points remain.
    #[must_use]
    pub fn from_positions(positions: &[geojson::Position]) -> Option<Self> {
        let mut ring: Vec<[f64; 2]> = Vec::with_capacity(positions.len());

        for position in positions {
            let (&x, &y) = (position.first()?, position.get(1)?);
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            if ring.last() != Some(&[x, y]) {
                ring.push([x, y]);
            }
        }

        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }

        Self::from_ring(ring)
    }

    fn from_ring(ring: Vec<[f64; 2]>) -> Option<Self> {
        let mut distinct = ring.clone();
        distinct.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
        distinct.dedup();
        if distinct.len() < 3 {
            return None;
        }

        let exterior: geo::LineString<f64> = ring.iter().map(|&[x, y]| (x, y)).collect();
        let shape = geo::Polygon::new(exterior, Vec::new());
        let centroid = centroid(&shape, &distinct);

        Some(Self {
            ring,
            shape,
            centroid,
        })
    }

    /// The open outer ring, in source units.
    #[must_use]
    pub fn ring(&self) -> &[[f64; 2]] {
        &self.ring
    }

    /// Representative point used for spatial joins.
    #[must_use]
    pub const fn centroid(&self) -> [f64; 2] {
        self.centroid
    }

    /// Axis-aligned bounding box of the ring.
    #[must_use]
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        self.shape.bounding_rect().map_or_else(
            || AABB::from_point(self.centroid),
            |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
        )
    }

    /// Whether `point` lies strictly inside the ring.
    #[must_use]
    pub fn contains(&self, point: [f64; 2]) -> bool {
        self.shape.contains(&geo::Point::new(point[0], point[1]))
    }

    /// The ring translated so that `origin` becomes `(0, 0)`.
    #[must_use]
    pub fn project(&self, origin: Origin) -> Vec<[f64; 2]> {
        self.ring
            .iter()
            .map(|&[x, y]| [x - origin.x, y - origin.y])
            .collect()
    }
}

/// The outer ring of a polygonal geometry, if it has one.
#[must_use]
pub fn outer_ring(geometry: &geojson::Geometry) -> Option<&[geojson::Position]> {
    match &geometry.value {
        geojson::Value::Polygon(rings) => rings.first().map(Vec::as_slice),
        geojson::Value::MultiPolygon(parts) => parts.first()?.first().map(Vec::as_slice),
        _ => None,
    }
}

/// Area-weighted centroid, or the vertex mean when the ring encloses no
/// area (collinear points).
fn centroid(shape: &geo::Polygon<f64>, distinct: &[[f64; 2]]) -> [f64; 2] {
    let extent = shape
        .bounding_rect()
        .map_or(0.0, |rect| rect.width().max(rect.height()));

    if shape.signed_area().abs() > f64::EPSILON * extent * extent {
        if let Some(point) = shape.centroid() {
            return [point.x(), point.y()];
        }
    }

    vertex_mean(distinct)
}

#[allow(clippy::cast_precision_loss)]
fn vertex_mean(points: &[[f64; 2]]) -> [f64; 2] {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), [x, y]| (sx + x, sy + y));
    [sx / n, sy / n]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(value: serde_json::Value) -> geojson::Geometry {
        serde_json::from_value(value).unwrap()
    }

    fn close(a: [f64; 2], b: [f64; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-9 && (a[1] - b[1]).abs() < 1e-9
    }

    #[test]
    fn takes_first_ring_of_polygon() {
        let polygon = Polygon::from_geometry(&geometry(serde_json::json!({
            "type": "Polygon",
            "coordinates": [
                [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]]
            ]
        })))
        .unwrap();

        assert_eq!(polygon.ring().len(), 4);
        assert!(close(polygon.centroid(), [2.0, 2.0]));
        // Holes are dropped, so the hole interior counts as inside.
        assert!(polygon.contains([1.5, 1.2]));
    }

    #[test]
    fn takes_first_ring_of_first_multipolygon_part() {
        let polygon = Polygon::from_geometry(&geometry(serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[10.0, 10.0], [12.0, 10.0], [12.0, 12.0], [10.0, 12.0], [10.0, 10.0]]],
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            ]
        })))
        .unwrap();

        assert!(close(polygon.centroid(), [11.0, 11.0]));
        assert!(!polygon.contains([0.5, 0.2]));
    }

    #[test]
    fn rejects_short_and_non_polygonal_rings() {
        assert!(Polygon::from_geometry(&geometry(serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]
        })))
        .is_none());

        assert!(Polygon::from_geometry(&geometry(serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 0.0]]]
        })))
        .is_none());

        assert!(Polygon::from_geometry(&geometry(serde_json::json!({
            "type": "Point",
            "coordinates": [0.0, 0.0]
        })))
        .is_none());

        assert!(Polygon::from_geometry(&geometry(serde_json::json!({
            "type": "Polygon",
            "coordinates": []
        })))
        .is_none());
    }

    #[test]
    fn area_weighted_centroid_differs_from_vertex_mean() {
        // Extra vertices bunched on one edge pull the vertex mean but not
        // the area-weighted centroid.
        let polygon = Polygon::from_positions(&[
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![4.0, 0.0],
            vec![4.0, 4.0],
            vec![0.0, 4.0],
        ])
        .unwrap();

        assert!(close(polygon.centroid(), [2.0, 2.0]));
    }

    #[test]
    fn degenerate_ring_uses_vertex_mean() {
        let polygon =
            Polygon::from_positions(&[vec![0.0, 0.0], vec![1.0, 1.0], vec![3.0, 3.0]]).unwrap();
        assert!(close(polygon.centroid(), [4.0 / 3.0, 4.0 / 3.0]));
    }

    #[test]
    fn projection_round_trips_through_origin() {
        let polygon = Polygon::from_positions(&[
            vec![-114.0701, 51.0471],
            vec![-114.0695, 51.0471],
            vec![-114.0695, 51.0476],
            vec![-114.0701, 51.0476],
        ])
        .unwrap();
        let origin = Origin {
            x: -114.068,
            y: 51.0475,
        };

        let projected = polygon.project(origin);
        for (xy, ll) in projected.iter().zip(polygon.ring()) {
            assert!((xy[0] + origin.x - ll[0]).abs() < 1e-9);
            assert!((xy[1] + origin.y - ll[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_non_finite_positions() {
        assert!(
            Polygon::from_positions(&[vec![0.0, 0.0], vec![f64::NAN, 1.0], vec![1.0, 1.0]])
                .is_none()
        );
        assert!(Polygon::from_positions(&[vec![0.0], vec![1.0, 1.0], vec![1.0, 0.0]]).is_none());
    }
}
