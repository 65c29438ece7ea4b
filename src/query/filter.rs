//! Filter shapes accepted by `select`, `search` and `uid`.

use serde_json::Value;

use crate::error::{HarperError, Result, ValidationError};
use crate::types::Record;

/// What to search for.
///
/// | Variant | Search |
/// |---------|--------|
/// | `All` | none: the table is described instead |
/// | `Attributes` | `equals` per non-null attribute, combined with `and` |
/// | `Values` | `contains` per (table attribute × value), combined with `or` |
/// | `Any` | one `Attributes` search per map, run concurrently, results concatenated |
///
/// # Example
///
/// ```rust
/// use harperlink::Filter;
/// use serde_json::json;
///
/// let filter = Filter::from_json(json!({"name": "Rex", "age": 3})).unwrap();
/// assert!(matches!(filter, Filter::Attributes(_)));
///
/// let filter = Filter::values(["rex", "bo"]);
/// assert!(matches!(filter, Filter::Values(_)));
///
/// assert!(Filter::from_json(json!(42)).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Filter {
    /// No filter: introspect the table.
    #[default]
    All,
    /// Exact match on every non-null attribute.
    Attributes(Record),
    /// Substring-style match of every value against every table attribute.
    Values(Vec<Value>),
    /// Union of several attribute filters, in input order.
    Any(Vec<Record>),
}

impl Filter {
    /// Creates an exact-match filter.
    pub fn attributes(record: Record) -> Self {
        Self::Attributes(record)
    }

    /// Creates a scan filter from scalar values.
    pub fn values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Values(values.into_iter().map(Into::into).collect())
    }

    /// Reads a filter from a dynamic JSON value.
    ///
    /// - `null` → [`Filter::All`]
    /// - object → [`Filter::Attributes`]
    /// - array of scalars → [`Filter::Values`]
    /// - array of objects (or an empty array) → [`Filter::Any`]
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidFilter` for any other shape, e.g. a
    /// bare number or an array mixing scalars and objects.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::All),
            Value::Object(record) => Ok(Self::Attributes(record)),
            Value::Array(items) if items.iter().all(Value::is_object) => Ok(Self::Any(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(record) => Some(record),
                        _ => None,
                    })
                    .collect(),
            )),
            Value::Array(items) if items.iter().all(is_scalar) => Ok(Self::Values(items)),
            Value::Array(_) => Err(ValidationError::invalid_filter(
                "an array filter must contain either only scalars or only objects",
            )
            .into()),
            other => Err(ValidationError::invalid_filter(format!(
                "expected nothing, an object, or an array, got {}",
                other
            ))
            .into()),
        }
    }

    /// Checks the filter before anything is sent.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidFilter` if a `Values` filter contains
    /// objects or arrays.
    pub fn validate(&self) -> Result<()> {
        if let Self::Values(values) = self {
            if let Some(bad) = values.iter().find(|v| !is_scalar(v)) {
                return Err(ValidationError::invalid_filter(format!(
                    "scan values must be scalars, got {}",
                    bad
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Strings, numbers, booleans. `null` is accepted and skipped when building.
fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

impl From<Record> for Filter {
    fn from(record: Record) -> Self {
        Self::Attributes(record)
    }
}

impl From<Vec<Record>> for Filter {
    fn from(records: Vec<Record>) -> Self {
        Self::Any(records)
    }
}

impl From<Option<Record>> for Filter {
    fn from(record: Option<Record>) -> Self {
        record.map_or(Self::All, Self::Attributes)
    }
}

impl TryFrom<Value> for Filter {
    type Error = HarperError;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        Self::from_json(value)
    }
}
