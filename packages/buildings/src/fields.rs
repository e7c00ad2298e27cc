//! Value coercion for fallback-chain lookups.
//!
//! A chain lookup has three outcomes: no candidate key is set
//! ([`Lookup::Absent`]), a candidate is set but none coerces
//! ([`Lookup::Invalid`], carrying the first offending key and value), or a
//! candidate coerces ([`Lookup::Present`]). Unusable candidates are skipped
//! so a later key in the chain can still supply the value. The fallback
//! policy for each outcome lives in [`crate::assemble`].

use building_map_building_models::parse_numeric;
use building_map_source_models::is_set;

/// Height used when no height property is present or usable.
pub const DEFAULT_HEIGHT: f64 = 10.0;

/// Numbers and numeric strings; anything else is `None`.
#[must_use]
pub fn as_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

/// Trimmed non-empty strings and numbers rendered as text.
#[must_use]
pub fn as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(number_to_string(n)),
        _ => None,
    }
}

/// Identifier rendering: like [`as_text`], plus booleans. Integral
/// floats lose their `.0` so `42` and `42.0` name the same building.
#[must_use]
pub fn as_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => as_text(other),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_string(n: &serde_json::Number) -> String {
    // 2^53: beyond this, f64 cannot represent every integer.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT => (v as i64).to_string(),
        _ => n.to_string(),
    }
}

/// Outcome of walking one fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a, T> {
    /// No candidate key holds a set value.
    Absent,
    /// At least one candidate is set, but none coerces.
    Invalid {
        /// First candidate key holding an unusable value.
        key: &'a str,
        /// The unusable value.
        value: &'a serde_json::Value,
    },
    /// The first candidate that coerces.
    Present(T),
}

/// Walks `keys` in order and returns the first set value that `coerce`
/// accepts.
#[must_use]
pub fn lookup<'a, S: AsRef<str>, T>(
    properties: &'a serde_json::Map<String, serde_json::Value>,
    keys: &'a [S],
    coerce: impl Fn(&serde_json::Value) -> Option<T>,
) -> Lookup<'a, T> {
    let mut invalid = None;

    for key in keys {
        let key = key.as_ref();
        let Some(value) = properties.get(key).filter(|v| is_set(v)) else {
            continue;
        };
        if let Some(coerced) = coerce(value) {
            return Lookup::Present(coerced);
        }
        if invalid.is_none() {
            invalid = Some(Lookup::Invalid { key, value });
        }
    }

    invalid.unwrap_or(Lookup::Absent)
}

/// First candidate that coerces to a non-negative number.
#[must_use]
pub fn number_from<'a, S: AsRef<str>>(
    properties: &'a serde_json::Map<String, serde_json::Value>,
    keys: &'a [S],
) -> Lookup<'a, f64> {
    lookup(properties, keys, |v| as_number(v).filter(|n| *n >= 0.0))
}

/// First candidate usable as text.
#[must_use]
pub fn text_from<'a, S: AsRef<str>>(
    properties: &'a serde_json::Map<String, serde_json::Value>,
    keys: &'a [S],
) -> Lookup<'a, String> {
    lookup(properties, keys, as_text)
}

/// First candidate usable as an identifier.
#[must_use]
pub fn id_from<'a, S: AsRef<str>>(
    properties: &'a serde_json::Map<String, serde_json::Value>,
    keys: &'a [S],
) -> Lookup<'a, String> {
    lookup(properties, keys, as_id)
}
