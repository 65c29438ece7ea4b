//! Core value types: records, identifiers, and typed responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::normalize;
use crate::error::{HarperError, ValidationError};

/// One row: an open map of attribute names to JSON values.
pub type Record = Map<String, Value>;

/// One or more records, as accepted by `insert`, `update` and `upsert`.
///
/// Built from a single [`Record`], a `Vec<Record>`, or a dynamic JSON value
/// (an object or an array of objects) through `TryFrom<Value>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Records(pub Vec<Record>);

impl Records {
    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the wrapper.
    pub fn into_inner(self) -> Vec<Record> {
        self.0
    }
}

impl From<Record> for Records {
    fn from(record: Record) -> Self {
        Self(vec![record])
    }
}

impl From<Vec<Record>> for Records {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl TryFrom<Value> for Records {
    type Error = HarperError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        normalize(value)?
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(ValidationError::invalid_field(
                    "records",
                    format!("element {} is not a record: {}", i, other),
                )
                .into()),
            })
            .collect::<Result<Vec<_>, HarperError>>()
            .map(Self)
    }
}

/// One or more primary-key values, as accepted by `delete`.
///
/// Identifiers are scalars (strings or numbers), never full records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Identifiers(pub Vec<Value>);

impl Identifiers {
    /// Returns the number of identifiers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no identifiers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the wrapper.
    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl From<&str> for Identifiers {
    fn from(id: &str) -> Self {
        Self(vec![Value::from(id)])
    }
}

impl From<String> for Identifiers {
    fn from(id: String) -> Self {
        Self(vec![Value::from(id)])
    }
}

impl From<i64> for Identifiers {
    fn from(id: i64) -> Self {
        Self(vec![Value::from(id)])
    }
}

impl From<u64> for Identifiers {
    fn from(id: u64) -> Self {
        Self(vec![Value::from(id)])
    }
}

impl From<Vec<&str>> for Identifiers {
    fn from(ids: Vec<&str>) -> Self {
        Self(ids.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<String>> for Identifiers {
    fn from(ids: Vec<String>) -> Self {
        Self(ids.into_iter().map(Value::from).collect())
    }
}

impl TryFrom<Value> for Identifiers {
    type Error = HarperError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        normalize(value)?
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(_) | Value::Number(_) => Ok(item),
                other => Err(ValidationError::invalid_field(
                    "identifiers",
                    format!("element {} is not a primary-key value: {}", i, other),
                )
                .into()),
            })
            .collect::<Result<Vec<_>, HarperError>>()
            .map(Self)
    }
}

/// Response of a mutation command.
///
/// Every field is optional on the wire; fields the server adds beyond these
/// are kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteResult {
    /// Human-readable summary, e.g. `"inserted 1 of 1 records"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Primary keys of inserted records.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inserted_hashes: Vec<Value>,

    /// Primary keys of updated records.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_hashes: Vec<Value>,

    /// Primary keys of upserted records.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upserted_hashes: Vec<Value>,

    /// Primary keys of deleted records.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_hashes: Vec<Value>,

    /// Primary keys the server skipped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_hashes: Vec<Value>,

    /// Any other response fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of [`HarperDB::select`](crate::HarperDB::select).
///
/// Selecting without a filter describes the table instead of returning rows.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// Table description (no filter was given).
    Schema(Value),
    /// Matching records.
    Records(Vec<Record>),
}

impl Selection {
    /// Returns true if this is a table description.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Returns the matching records, or an empty slice for a description.
    pub fn records(&self) -> &[Record] {
        match self {
            Self::Records(records) => records,
            Self::Schema(_) => &[],
        }
    }

    /// Consumes the selection, returning the records (empty for a description).
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Records(records) => records,
            Self::Schema(_) => Vec::new(),
        }
    }
}
