#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Attribute filter evaluation.
//!
//! A building matches a filter list when it satisfies every filter in it.
//! Evaluation never fails: a filter that cannot be evaluated (unknown
//! operator, absent attribute, operand that does not coerce) simply does
//! not match.

use std::borrow::Cow;

use building_map_building_models::{
    AttributeKind, Building, BuildingField, Comparison, Filter, FilterValue, MatchResult,
    parse_numeric,
};
use thiserror::Error;

/// Errors that can occur while reading a caller-supplied filter list.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter input is not a list.
    #[error("Invalid filter spec: {message}")]
    InvalidFilterSpec {
        /// What was wrong with the input.
        message: String,
    },
}

/// A compiled filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Compares one attribute against an operand.
    Compare {
        /// Attribute name as written by the caller.
        attribute: String,
        /// Parsed operator.
        comparison: Comparison,
        /// Right-hand operand.
        value: FilterValue,
    },
    /// Matches nothing.
    Unmatchable,
}

impl Predicate {
    /// Whether `building` satisfies this predicate.
    #[must_use]
    pub fn matches(&self, building: &Building) -> bool {
        match self {
            Self::Compare {
                attribute,
                comparison,
                value,
            } => resolve(building, attribute)
                .is_some_and(|resolved| compare(&resolved, *comparison, value)),
            Self::Unmatchable => false,
        }
    }
}

impl From<&Filter> for Predicate {
    fn from(filter: &Filter) -> Self {
        if filter.attribute.trim().is_empty() {
            log::warn!("Filter with empty attribute never matches");
            return Self::Unmatchable;
        }
        let Some(comparison) = filter.comparison() else {
            log::warn!(
                "Unrecognized operator {:?} on {}, filter never matches",
                filter.operator,
                filter.attribute
            );
            return Self::Unmatchable;
        };

        Self::Compare {
            attribute: filter.attribute.trim().to_string(),
            comparison,
            value: filter.value.clone(),
        }
    }
}

/// Returns the ids of `buildings` matching every filter, in building order.
///
/// An empty filter list matches every building.
#[must_use]
pub fn apply_filters(buildings: &[Building], filters: &[Filter]) -> MatchResult {
    let predicates: Vec<Predicate> = filters.iter().map(Predicate::from).collect();
    apply_predicates(buildings, &predicates)
}

/// Like [`apply_filters`], for already compiled predicates.
#[must_use]
pub fn apply_predicates(buildings: &[Building], predicates: &[Predicate]) -> MatchResult {
    let matched_ids = buildings
        .iter()
        .filter(|building| predicates.iter().all(|p| p.matches(building)))
        .map(|building| building.id.clone())
        .collect::<Vec<_>>();

    log::debug!(
        "{} of {} buildings matched {} filters",
        matched_ids.len(),
        buildings.len(),
        predicates.len()
    );

    MatchResult::new(matched_ids)
}

/// Compiles a caller-supplied JSON filter list.
///
/// Entries that are not valid filters compile to
/// [`Predicate::Unmatchable`].
///
/// # Errors
///
/// Returns [`FilterError::InvalidFilterSpec`] if `input` is not a list.
pub fn parse_filters(input: &serde_json::Value) -> Result<Vec<Predicate>, FilterError> {
    let serde_json::Value::Array(entries) = input else {
        return Err(FilterError::InvalidFilterSpec {
            message: format!("expected a list of filters, got {}", json_kind(input)),
        });
    };

    Ok(entries
        .iter()
        .enumerate()
        .map(
            |(i, entry)| match serde_json::from_value::<Filter>(entry.clone()) {
                Ok(filter) => Predicate::from(&filter),
                Err(e) => {
                    log::warn!("Filter {i} is not a valid filter, never matches: {e}");
                    Predicate::Unmatchable
                }
            },
        )
        .collect())
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

/// An attribute value read from a building.
#[derive(Debug, Clone, PartialEq)]
enum Resolved<'a> {
    Number(f64),
    Text(Cow<'a, str>),
}

impl Resolved<'_> {
    const fn kind(&self) -> AttributeKind {
        match self {
            Self::Number(_) => AttributeKind::Numeric,
            Self::Text(_) => AttributeKind::Text,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_numeric(s),
        }
    }

    fn as_lower(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.to_lowercase(),
        }
    }
}

/// Top-level fields first, then raw properties. An unset optional field
/// falls through to a raw property of the same name. `None` when absent.
fn resolve<'a>(building: &'a Building, attribute: &str) -> Option<Resolved<'a>> {
    if let Ok(field) = attribute.parse::<BuildingField>() {
        let top = match field {
            BuildingField::Id => Some(Resolved::Text(Cow::Borrowed(building.id.as_str()))),
            BuildingField::Height => Some(Resolved::Number(building.height)),
            BuildingField::AssessedValue => building.assessed_value.map(Resolved::Number),
            BuildingField::Zoning => building
                .zoning
                .as_deref()
                .map(|s| Resolved::Text(Cow::Borrowed(s))),
            BuildingField::Address => building
                .address
                .as_deref()
                .map(|s| Resolved::Text(Cow::Borrowed(s))),
        };
        if top.is_some() {
            return top;
        }
    }

    let value = building.properties.get(attribute).or_else(|| {
        building
            .properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(attribute))
            .map(|(_, value)| value)
    })?;

    match value {
        serde_json::Value::Number(n) => n.as_f64().map(Resolved::Number),
        serde_json::Value::String(s) => Some(Resolved::Text(Cow::Borrowed(s))),
        serde_json::Value::Bool(b) => Some(Resolved::Text(Cow::Owned(b.to_string()))),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}

fn operand_number(value: &FilterValue) -> Option<f64> {
    match value {
        FilterValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        FilterValue::Text(s) => parse_numeric(s),
    }
}

fn operand_lower(value: &FilterValue) -> String {
    match value {
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Text(s) => s.to_lowercase(),
    }
}

#[allow(clippy::float_cmp)]
fn compare(resolved: &Resolved<'_>, comparison: Comparison, value: &FilterValue) -> bool {
    let numbers = || Some((resolved.as_number()?, operand_number(value)?));

    match comparison {
        Comparison::Gt => numbers().is_some_and(|(a, b)| a > b),
        Comparison::Lt => numbers().is_some_and(|(a, b)| a < b),
        Comparison::Ge => numbers().is_some_and(|(a, b)| a >= b),
        Comparison::Le => numbers().is_some_and(|(a, b)| a <= b),
        Comparison::Eq | Comparison::Neq => {
            let equal = match resolved.kind() {
                AttributeKind::Numeric => match numbers() {
                    Some((a, b)) => a == b,
                    None => return false,
                },
                AttributeKind::Text => resolved.as_lower() == operand_lower(value),
            };
            equal == (comparison == Comparison::Eq)
        }
        Comparison::Contains => resolved.as_lower().contains(&operand_lower(value)),
        Comparison::StartsWith => resolved.as_lower().starts_with(&operand_lower(value)),
        Comparison::EndsWith => resolved.as_lower().ends_with(&operand_lower(value)),
    }
}
