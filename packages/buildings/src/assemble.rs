//! Turns raw footprint features into [`Building`] records.
//!
//! Zoning and assessed value are read from the footprint's own
//! properties first. When joins are enabled, a usable join result
//! overrides the raw value: the district and assessment datasets are
//! treated as authoritative over whatever the footprint dataset carries.
//! Join indexes are only queried with centroids inside the window they
//! were built for; a footprint straddling the window edge keeps its raw
//! values.
//!
//! Per field, an absent value takes the fallback (default height,
//! positional id, `None`) silently. A present but unusable value takes the
//! same fallback and is logged at `warn`.

use std::collections::BTreeSet;
use std::sync::Arc;

use building_map_building_models::{BoundingWindow, Building};
use building_map_source_models::{FieldChains, RawFeature};
use building_map_spatial::{JoinIndex, Polygon};

use crate::BuildingError;
use crate::fields::{
    DEFAULT_HEIGHT, Lookup, as_number, as_text, id_from, number_from, text_from,
};

/// A join index together with the property chain to read from it.
#[derive(Clone)]
pub struct Join {
    /// Index over the join dataset's polygons.
    pub index: Arc<JoinIndex>,
    /// Candidate property names, in order.
    pub attribute: Vec<String>,
}

impl Join {
    fn value_at(&self, point: [f64; 2]) -> Option<&serde_json::Value> {
        self.index.resolve(point, &self.attribute)
    }
}

/// Both joins, resolved before any building is finalized.
#[derive(Clone)]
pub struct Joins {
    /// Land use districts.
    pub zoning: Join,
    /// Parcel assessments.
    pub assessment: Join,
}

/// Assembles buildings from `features` in source order.
///
/// Features without a valid outer ring are skipped. Ids are unique within
/// the returned list.
///
/// # Errors
///
/// Returns [`BuildingError::EmptyResult`] if no feature has a valid ring.
pub fn assemble(
    dataset: &str,
    features: Vec<RawFeature>,
    window: &BoundingWindow,
    chains: &FieldChains,
    joins: Option<&Joins>,
) -> Result<Vec<Building>, BuildingError> {
    let origin = window.center();
    let total = features.len();
    let mut ids = IdAllocator::default();
    let mut buildings = Vec::with_capacity(total);

    for (position, feature) in features.into_iter().enumerate() {
        let Some(polygon) = feature.geometry.as_ref().and_then(Polygon::from_geometry) else {
            log::debug!("Skipping feature {position} of {dataset}: no valid outer ring");
            continue;
        };

        let props = feature.properties;
        let centroid = polygon.centroid();
        let field = |name: &'static str| FieldContext {
            dataset,
            position,
            name,
        };

        let mut zoning = field("zoning").settle(text_from(&props, &chains.zoning));
        let mut assessed_value =
            field("assessed_value").settle(number_from(&props, &chains.assessed_value));

        match joins {
            Some(joins) if window.contains(centroid[0], centroid[1]) => {
                let joined_zoning = field("joined zoning").joined(&joins.zoning, centroid, as_text);
                let joined_value =
                    field("joined assessed_value").joined(&joins.assessment, centroid, as_number);
                zoning = joined_zoning.or(zoning);
                assessed_value = joined_value.or(assessed_value);
            }
            Some(_) => {
                log::debug!(
                    "Feature {position} of {dataset}: centroid {centroid:?} outside {window}, \
                     keeping raw zoning and assessed value"
                );
            }
            None => {}
        }

        let id = field("id")
            .settle(id_from(&props, &chains.id))
            .unwrap_or_else(|| format!("bldg-{position}"));
        let height = field("height")
            .settle(number_from(&props, &chains.height))
            .unwrap_or(DEFAULT_HEIGHT);
        let address = field("address").settle(text_from(&props, &chains.address));

        buildings.push(Building {
            id: ids.claim(id),
            height,
            zoning,
            assessed_value,
            address,
            footprint_ll: polygon.ring().to_vec(),
            footprint_xy: polygon.project(origin),
            properties: props,
        });
    }

    if buildings.is_empty() {
        return Err(BuildingError::EmptyResult {
            dataset: dataset.to_string(),
            window: *window,
        });
    }

    let skipped = total - buildings.len();
    if skipped > 0 {
        log::warn!("Skipped {skipped} of {total} {dataset} features without a valid footprint");
    }
    log::info!("Assembled {} buildings from {dataset}", buildings.len());

    Ok(buildings)
}

/// Where a looked-up value came from, for logging.
#[derive(Clone, Copy)]
struct FieldContext<'a> {
    dataset: &'a str,
    position: usize,
    name: &'static str,
}

impl FieldContext<'_> {
    /// Absent and unusable values both become `None`; unusable ones are
    /// logged.
    fn settle<T>(self, lookup: Lookup<'_, T>) -> Option<T> {
        match lookup {
            Lookup::Present(value) => Some(value),
            Lookup::Absent => None,
            Lookup::Invalid { key, value } => {
                log::warn!(
                    "Feature {} of {}: unusable {} value {value} in {key:?}",
                    self.position,
                    self.dataset,
                    self.name
                );
                None
            }
        }
    }

    /// The coerced join value at `point`. A miss is `None`; a hit whose
    /// value does not coerce is `None` and logged.
    fn joined<T>(
        self,
        join: &Join,
        point: [f64; 2],
        coerce: impl Fn(&serde_json::Value) -> Option<T>,
    ) -> Option<T> {
        let value = join.value_at(point)?;
        let coerced = coerce(value);
        if coerced.is_none() {
            log::warn!(
                "Feature {} of {}: unusable {} value {value}",
                self.position,
                self.dataset,
                self.name
            );
        }
        coerced
    }
}

/// Hands out ids, suffixing `-2`, `-3`, ... on collision.
#[derive(Default)]
struct IdAllocator {
    taken: BTreeSet<String>,
}

impl IdAllocator {
    fn claim(&mut self, id: String) -> String {
        if self.taken.insert(id.clone()) {
            return id;
        }

        let unique = (2..)
            .map(|n| format!("{id}-{n}"))
            .find(|candidate| !self.taken.contains(candidate))
            .unwrap_or_default();
        log::debug!("Duplicate building id {id}, using {unique}");
        self.taken.insert(unique.clone());
        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> BoundingWindow {
        BoundingWindow::new(4.0, 0.0, 4.0, 0.0).unwrap()
    }

    fn square(x: f64, y: f64, size: f64) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]]
        })
    }

    fn feature(geometry: serde_json::Value, props: serde_json::Value) -> RawFeature {
        RawFeature::new(
            serde_json::from_value(geometry).ok(),
            props.as_object().cloned().unwrap_or_default(),
        )
    }

    fn join(features: Vec<RawFeature>, attribute: &str) -> Join {
        Join {
            index: Arc::new(JoinIndex::build(features)),
            attribute: vec![attribute.to_string()],
        }
    }

    fn joins() -> Joins {
        Joins {
            zoning: join(
                vec![feature(square(0.0, 0.0, 2.0), serde_json::json!({ "lu_code": "RC-G" }))],
                "lu_code",
            ),
            assessment: join(
                vec![feature(
                    square(0.0, 0.0, 2.0),
                    serde_json::json!({ "assessed_value": "1,250,000" }),
                )],
                "assessed_value",
            ),
        }
    }

    #[test]
    fn applies_defaults_and_coerces_ids() {
        let buildings = assemble(
            "bldgs",
            vec![
                feature(square(0.5, 0.5, 0.5), serde_json::json!({ "objectid": 17 })),
                feature(square(2.5, 2.5, 0.5), serde_json::json!({ "height": "45.5" })),
            ],
            &window(),
            &FieldChains::default(),
            None,
        )
        .unwrap();

        assert_eq!(buildings[0].id, "17");
        assert!((buildings[0].height - DEFAULT_HEIGHT).abs() < f64::EPSILON);
        assert_eq!(buildings[1].id, "bldg-1");
        assert!((buildings[1].height - 45.5).abs() < f64::EPSILON);
    }

    #[test]
    fn skips_invalid_rings() {
        let buildings = assemble(
            "bldgs",
            vec![
                feature(serde_json::Value::Null, serde_json::json!({ "id": "a" })),
                feature(square(0.5, 0.5, 0.5), serde_json::json!({ "id": "b" })),
            ],
            &window(),
            &FieldChains::default(),
            None,
        )
        .unwrap();

        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].id, "b");
    }

    #[test]
    fn zero_valid_buildings_is_an_error() {
        let err = assemble(
            "bldgs",
            vec![feature(serde_json::Value::Null, serde_json::json!({}))],
            &window(),
            &FieldChains::default(),
            None,
        )
        .unwrap_err();
        assert!(err.is_empty_result());

        let err = assemble("bldgs", Vec::new(), &window(), &FieldChains::default(), None)
            .unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn join_result_overrides_raw_properties() {
        let buildings = assemble(
            "bldgs",
            vec![feature(
                square(0.5, 0.5, 0.5),
                serde_json::json!({ "zoning": "M-1", "assessed_value": 10 }),
            )],
            &window(),
            &FieldChains::default(),
            Some(&joins()),
        )
        .unwrap();

        assert_eq!(buildings[0].zoning.as_deref(), Some("RC-G"));
        assert_eq!(buildings[0].assessed_value, Some(1_250_000.0));
    }

    #[test]
    fn raw_properties_used_when_join_misses() {
        let buildings = assemble(
            "bldgs",
            vec![feature(
                square(3.0, 3.0, 0.5),
                serde_json::json!({ "zoning": "M-1", "assessed_value": 10 }),
            )],
            &window(),
            &FieldChains::default(),
            Some(&joins()),
        )
        .unwrap();

        assert_eq!(buildings[0].zoning.as_deref(), Some("M-1"));
        assert_eq!(buildings[0].assessed_value, Some(10.0));
    }

    #[test]
    fn centroid_outside_window_keeps_raw_values() {
        let wide = Joins {
            zoning: join(
                vec![feature(square(0.0, 0.0, 10.0), serde_json::json!({ "lu_code": "RC-G" }))],
                "lu_code",
            ),
            assessment: join(
                vec![feature(square(0.0, 0.0, 10.0), serde_json::json!({ "assessed_value": 5 }))],
                "assessed_value",
            ),
        };

        let buildings = assemble(
            "bldgs",
            vec![
                feature(
                    square(3.5, 1.0, 2.0),
                    serde_json::json!({ "zoning": "RAW", "assessed_value": 10 }),
                ),
                feature(square(1.0, 1.0, 1.0), serde_json::json!({ "zoning": "RAW" })),
            ],
            &window(),
            &FieldChains::default(),
            Some(&wide),
        )
        .unwrap();

        assert_eq!(buildings[0].zoning.as_deref(), Some("RAW"));
        assert_eq!(buildings[0].assessed_value, Some(10.0));
        assert_eq!(buildings[1].zoning.as_deref(), Some("RC-G"));
        assert_eq!(buildings[1].assessed_value, Some(5.0));
    }

    #[test]
    fn unusable_join_value_keeps_raw_value() {
        let joins = Joins {
            zoning: join(
                vec![feature(square(0.0, 0.0, 2.0), serde_json::json!({ "lu_code": ["R"] }))],
                "lu_code",
            ),
            assessment: join(
                vec![feature(
                    square(0.0, 0.0, 2.0),
                    serde_json::json!({ "assessed_value": "pending" }),
                )],
                "assessed_value",
            ),
        };

        let buildings = assemble(
            "bldgs",
            vec![feature(
                square(0.5, 0.5, 0.5),
                serde_json::json!({ "zoning": "M-1", "assessed_value": 10 }),
            )],
            &window(),
            &FieldChains::default(),
            Some(&joins),
        )
        .unwrap();

        assert_eq!(buildings[0].zoning.as_deref(), Some("M-1"));
        assert_eq!(buildings[0].assessed_value, Some(10.0));
    }

    #[test]
    fn unusable_raw_values_fall_back() {
        let buildings = assemble(
            "bldgs",
            vec![
                feature(
                    square(0.5, 0.5, 0.5),
                    serde_json::json!({ "height": "n/a", "bldg_height": "12" }),
                ),
                feature(
                    square(1.5, 0.5, 0.5),
                    serde_json::json!({ "height": "n/a", "id": { "nested": 1 } }),
                ),
                feature(square(2.5, 0.5, 0.5), serde_json::json!({})),
            ],
            &window(),
            &FieldChains::default(),
            None,
        )
        .unwrap();

        assert!((buildings[0].height - 12.0).abs() < f64::EPSILON);
        assert!((buildings[1].height - DEFAULT_HEIGHT).abs() < f64::EPSILON);
        assert_eq!(buildings[1].id, "bldg-1");
        assert!((buildings[2].height - DEFAULT_HEIGHT).abs() < f64::EPSILON);
        assert_eq!(buildings[2].id, "bldg-2");
    }

    #[test]
    fn ids_are_unique_strings() {
        let buildings = assemble(
            "bldgs",
            vec![
                feature(square(0.5, 0.5, 0.5), serde_json::json!({ "id": 7 })),
                feature(square(1.5, 0.5, 0.5), serde_json::json!({ "id": "7" })),
                feature(square(2.5, 0.5, 0.5), serde_json::json!({ "id": 7.0 })),
            ],
            &window(),
            &FieldChains::default(),
            None,
        )
        .unwrap();

        let ids: Vec<&str> = buildings.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["7", "7-2", "7-3"]);
    }

    #[test]
    fn footprints_share_window_origin() {
        let window = window();
        let buildings = assemble(
            "bldgs",
            vec![feature(square(0.5, 0.5, 0.5), serde_json::json!({}))],
            &window,
            &FieldChains::default(),
            None,
        )
        .unwrap();

        let origin = window.center();
        let building = &buildings[0];
        assert_eq!(building.footprint_ll.len(), 4);
        for (xy, ll) in building.footprint_xy.iter().zip(&building.footprint_ll) {
            assert!((xy[0] + origin.x - ll[0]).abs() < 1e-9);
            assert!((xy[1] + origin.y - ll[1]).abs() < 1e-9);
        }
    }
}
