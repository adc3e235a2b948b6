//! Restriction engine: resolve symbolic operators and check records against them.
//!
//! A [`Restriction`] names its comparison (`"less than"`) instead of carrying
//! it. [`substitute_operators`] resolves each name through an
//! [`OperatorRegistry`] into a [`ResolvedRestriction`]; [`comply_with`] then
//! requires every record to satisfy every resolved restriction.

use std::collections::BTreeMap;

use serde_json::Value;

use conduit_types::{ConduitError, Restriction, Result};

/// Two-argument comparison: `operator(actual, expected)`.
pub type Comparator = fn(&Value, &Value) -> bool;

// ---------------------------------------------------------------------------
// OperatorRegistry
// ---------------------------------------------------------------------------

/// Immutable symbolic-name -> comparator table.
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: BTreeMap<&'static str, Comparator>,
}

impl OperatorRegistry {
    /// A registry with no operators.
    pub fn empty() -> Self {
        Self {
            operators: BTreeMap::new(),
        }
    }

    /// The built-in numeric comparisons.
    pub fn standard() -> Self {
        Self::empty()
            .with("less than", less_than)
            .with("greater than", greater_than)
            .with("at most", at_most)
            .with("at least", at_least)
            .with("equal to", equal_to)
    }

    /// Return a registry extended with one more entry.
    pub fn with(mut self, name: &'static str, comparator: Comparator) -> Self {
        self.operators.insert(name, comparator);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<Comparator> {
        self.operators.get(name).copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.operators.keys().copied().collect()
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.operators.keys()).finish()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Numeric coercion and comparators
// ---------------------------------------------------------------------------

/// Coerce a JSON value to a number.
///
/// Strings are trimmed and parsed (an empty string is `0`), booleans are
/// `1`/`0`, `null` is `0`. Anything unparsable, arrays and objects are `NaN`,
/// which fails every comparison.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_numeric(s),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Numeric string grammar: decimal with optional sign and exponent, the
/// spellings `Infinity`/`+Infinity`/`-Infinity`, and unsigned `0x`/`0o`/`0b`
/// integers. `inf`, `nan` and other words are `NaN`.
fn parse_numeric(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&s[2..], radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn less_than(a: &Value, b: &Value) -> bool {
    to_number(a) < to_number(b)
}

fn greater_than(a: &Value, b: &Value) -> bool {
    to_number(a) > to_number(b)
}

fn at_most(a: &Value, b: &Value) -> bool {
    to_number(a) <= to_number(b)
}

fn at_least(a: &Value, b: &Value) -> bool {
    to_number(a) >= to_number(b)
}

fn equal_to(a: &Value, b: &Value) -> bool {
    to_number(a) == to_number(b)
}

// ---------------------------------------------------------------------------
// ResolvedRestriction
// ---------------------------------------------------------------------------

/// A restriction whose operator name has been bound to a comparator.
#[derive(Clone)]
pub struct ResolvedRestriction {
    pub property: String,
    pub operator_name: String,
    pub operator: Comparator,
    pub value: Value,
}

impl ResolvedRestriction {
    /// Whether `record[property] operator value` holds.
    ///
    /// Non-record inputs and records without `property` never satisfy.
    pub fn holds(&self, record: &Value) -> bool {
        record
            .get(&self.property)
            .is_some_and(|actual| (self.operator)(actual, &self.value))
    }
}

impl std::fmt::Debug for ResolvedRestriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedRestriction")
            .field("property", &self.property)
            .field("operator", &self.operator_name)
            .field("value", &self.value)
            .finish()
    }
}

/// Resolve every restriction against the standard registry.
pub fn substitute_operators(restrictions: &[Restriction]) -> Result<Vec<ResolvedRestriction>> {
    substitute_operators_with(&OperatorRegistry::standard(), restrictions)
}

/// Resolve every restriction against `registry`.
///
/// The input slice is only borrowed; an unknown operator name is an error.
pub fn substitute_operators_with(
    registry: &OperatorRegistry,
    restrictions: &[Restriction],
) -> Result<Vec<ResolvedRestriction>> {
    restrictions
        .iter()
        .map(|r| {
            let operator =
                registry
                    .resolve(&r.operator)
                    .ok_or_else(|| ConduitError::UnknownOperator {
                        name: r.operator.clone(),
                    })?;
            Ok(ResolvedRestriction {
                property: r.property.clone(),
                operator_name: r.operator.clone(),
                operator,
                value: r.value.clone(),
            })
        })
        .collect()
}

/// Check that `input` (a record or a sequence of records) satisfies every restriction.
pub fn comply_with(input: &Value, restrictions: &[Restriction]) -> Result<bool> {
    let resolved = substitute_operators(restrictions)?;
    Ok(satisfies_all(input, &resolved))
}

/// [`comply_with`] for restrictions that are already resolved.
pub fn satisfies_all(input: &Value, resolved: &[ResolvedRestriction]) -> bool {
    let record_ok = |record: &Value| resolved.iter().all(|r| r.holds(record));
    match input {
        Value::Array(records) => records.iter().all(record_ok),
        record => record_ok(record),
    }
}
