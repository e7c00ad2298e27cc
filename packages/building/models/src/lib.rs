#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical building, bounding window, and filter types.
//!
//! These are the shapes exchanged with callers: the assembled
//! [`BuildingsPayload`] returned by a fetch, and the [`Filter`] list and
//! [`MatchResult`] used by the filter engine. Source-specific feature
//! shapes live in `building_map_source_models`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A rectangular query region in the source coordinate system.
///
/// Always satisfies `north > south` and `east > west`; deserialization
/// goes through the same validation as [`BoundingWindow::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct BoundingWindow {
    /// Northern latitude boundary.
    pub north: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Western longitude boundary.
    pub west: f64,
}

#[derive(Deserialize)]
struct WindowBounds {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

impl TryFrom<WindowBounds> for BoundingWindow {
    type Error = InvalidWindowError;

    fn try_from(bounds: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.north, bounds.south, bounds.east, bounds.west)
    }
}

impl BoundingWindow {
    /// Creates a window from its four bounds.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWindowError`] if any bound is not finite, or if the
    /// window is empty or inverted.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, InvalidWindowError> {
        let window = Self {
            north,
            south,
            east,
            west,
        };

        let finite = [north, south, east, west].iter().all(|v| v.is_finite());
        if !finite || north <= south || east <= west {
            return Err(InvalidWindowError { window });
        }

        Ok(window)
    }

    /// The geometric center of the window, used as the local planar origin
    /// for every building in one response.
    #[must_use]
    pub fn center(&self) -> Origin {
        Origin {
            x: f64::midpoint(self.west, self.east),
            y: f64::midpoint(self.south, self.north),
        }
    }

    /// Whether the point `(x, y)` lies inside or on the edge of the window.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.west && x <= self.east && y >= self.south && y <= self.north
    }
}

impl std::fmt::Display for BoundingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[N {}, S {}, E {}, W {}]",
            self.north, self.south, self.east, self.west
        )
    }
}

/// Error returned when bounds do not describe a valid [`BoundingWindow`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidWindowError {
    /// The rejected bounds.
    pub window: BoundingWindow,
}

impl std::fmt::Display for InvalidWindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid bounding window {}: expected finite bounds with north > south and east > west",
            self.window
        )
    }
}

impl std::error::Error for InvalidWindowError {}

/// Origin of the local planar frame (the window center), in source units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    /// Easting (longitude) of the origin.
    pub x: f64,
    /// Northing (latitude) of the origin.
    pub y: f64,
}

/// A normalized building footprint with its joined attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Identifier, unique within one payload. Always a string, even when
    /// the source supplied a number.
    pub id: String,
    /// Height in meters.
    pub height: f64,
    /// Land use district code.
    pub zoning: Option<String>,
    /// Assessed property value.
    pub assessed_value: Option<f64>,
    /// Civic address.
    pub address: Option<String>,
    /// Outer ring in source units.
    pub footprint_ll: Vec<[f64; 2]>,
    /// Outer ring relative to the payload [`Origin`].
    pub footprint_xy: Vec<[f64; 2]>,
    /// Properties exactly as the source returned them.
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// The result of one building fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingsPayload {
    /// Window the buildings were fetched for.
    pub window: BoundingWindow,
    /// Origin shared by every `footprint_xy` in this payload.
    pub origin: Origin,
    /// Assembled buildings, in source order.
    pub buildings: Vec<Building>,
    /// Number of buildings.
    pub count: usize,
}

impl BuildingsPayload {
    /// Creates a payload for `window`, deriving the origin and count.
    #[must_use]
    pub fn new(window: BoundingWindow, buildings: Vec<Building>) -> Self {
        Self {
            window,
            origin: window.center(),
            count: buildings.len(),
            buildings,
        }
    }
}

/// Parses a number the way sources and callers write it: surrounding
/// whitespace and `,` thousands separators are ignored. Non-finite
/// results are rejected.
#[must_use]
pub fn parse_numeric(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Top-level [`Building`] fields addressable by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BuildingField {
    /// [`Building::id`]
    Id,
    /// [`Building::height`]
    Height,
    /// [`Building::zoning`]
    Zoning,
    /// [`Building::assessed_value`]
    AssessedValue,
    /// [`Building::address`]
    Address,
}

impl BuildingField {
    /// The declared comparison kind of this field.
    #[must_use]
    pub const fn kind(self) -> AttributeKind {
        match self {
            Self::Height | Self::AssessedValue => AttributeKind::Numeric,
            Self::Id | Self::Zoning | Self::Address => AttributeKind::Text,
        }
    }
}

/// How an attribute's values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Compared as 64-bit floats.
    Numeric,
    /// Compared as case-insensitive strings.
    Text,
}

/// Filter comparison operators.
///
/// Parsed from either the operator name or its symbol (`gt` or `>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum Comparison {
    /// Strictly greater than.
    #[strum(serialize = "gt", serialize = ">")]
    Gt,
    /// Strictly less than.
    #[strum(serialize = "lt", serialize = "<")]
    Lt,
    /// Greater than or equal.
    #[strum(serialize = "ge", serialize = "gte", serialize = ">=")]
    Ge,
    /// Less than or equal.
    #[strum(serialize = "le", serialize = "lte", serialize = "<=")]
    Le,
    /// Equal.
    #[strum(serialize = "eq", serialize = "==", serialize = "=")]
    Eq,
    /// Not equal.
    #[strum(serialize = "neq", serialize = "ne", serialize = "!=")]
    Neq,
    /// Case-insensitive substring.
    #[strum(serialize = "contains")]
    Contains,
    /// Case-insensitive prefix.
    #[strum(serialize = "starts_with")]
    StartsWith,
    /// Case-insensitive suffix.
    #[strum(serialize = "ends_with")]
    EndsWith,
}

/// A filter operand as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A JSON number.
    Number(f64),
    /// A JSON string. Numeric comparisons still try to parse it.
    Text(String),
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One attribute predicate.
///
/// The operator is kept as the caller wrote it; an operator that does not
/// parse as a [`Comparison`] never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Building field name or raw property key.
    pub attribute: String,
    /// Operator name or symbol.
    pub operator: String,
    /// Right-hand operand.
    pub value: FilterValue,
}

impl Filter {
    /// Creates a filter.
    #[must_use]
    pub fn new(
        attribute: impl Into<String>,
        operator: impl Into<String>,
        value: FilterValue,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator: operator.into(),
            value,
        }
    }

    /// The parsed operator, or `None` if unrecognized.
    #[must_use]
    pub fn comparison(&self) -> Option<Comparison> {
        self.operator.trim().parse().ok()
    }
}

/// Identifiers of the buildings satisfying every filter in a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Matching building ids, in payload order.
    pub matched_ids: Vec<String>,
    /// Number of matching ids.
    pub count: usize,
}

impl MatchResult {
    /// Creates a result from the matching ids.
    #[must_use]
    pub fn new(matched_ids: Vec<String>) -> Self {
        Self {
            count: matched_ids.len(),
            matched_ids,
        }
    }
}
