//! Payload codec: argument normalization and request/response encoding.
//!
//! # Write Path
//!
//! ```text
//! HarperDB::insert(records)
//!     ├── Records::try_from / From      ← normalize(): one or many
//!     ├── strip_server_timestamps()     ← drop __createdtime__ & co.
//!     └── serialize(&Command)           ← JSON body, or None if unserializable
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::command::Command;
use crate::error::{HarperError, Result, ValidationError};
use crate::types::Record;

/// Server-managed timestamp attributes, e.g. `__createdtime__`, `__updatedtime__`.
static SERVER_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^__\w*time__$").expect("timestamp pattern is valid")
});

/// Read-only commands: searches, descriptions, and SQL selects.
static SEARCH_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(search|select)").expect("search pattern is valid"));

/// Normalizes a single value or a collection into a collection.
///
/// - array → its elements
/// - object → array of one
/// - bare string or number identifier → array of one
///
/// # Errors
/// Returns `ValidationError` for `null` and booleans, which are neither
/// records nor identifiers.
pub fn normalize(input: Value) -> Result<Vec<Value>> {
    match input {
        Value::Array(items) => Ok(items),
        Value::Object(_) | Value::String(_) | Value::Number(_) => Ok(vec![input]),
        other => Err(ValidationError::invalid_field(
            "records",
            format!("expected a record, an identifier, or an array of them, got {}", other),
        )
        .into()),
    }
}

/// Returns true if `attribute` is a server-managed timestamp.
pub fn is_server_timestamp(attribute: &str) -> bool {
    SERVER_TIMESTAMP.is_match(attribute)
}

/// Removes server-managed timestamp attributes from every record.
///
/// All other attributes are kept untouched. Never fails.
pub fn strip_server_timestamps(mut records: Vec<Record>) -> Vec<Record> {
    for record in &mut records {
        record.retain(|attribute, _| !is_server_timestamp(attribute));
    }
    records
}

/// Serializes a command into a JSON request body.
///
/// Returns `None` when the command cannot be represented as JSON; the caller
/// reports that as a protocol error instead of sending a broken body.
pub fn serialize(command: &Command) -> Option<String> {
    serde_json::to_string(command).ok()
}

/// Collapses indentation-formatted query text into one line.
///
/// Leading/trailing whitespace is trimmed, blank lines are dropped, and the
/// remaining lines are trimmed and joined with single spaces.
///
/// ```rust
/// use harperlink::codec::trim_query;
///
/// let sql = "
///     SELECT *
///
///     FROM dev.dogs
/// ";
/// assert_eq!(trim_query(sql), "SELECT * FROM dev.dogs");
/// ```
pub fn trim_query(query: &str) -> String {
    query
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if the command only reads.
///
/// Reads never trigger provisioning: a missing namespace or table makes
/// them return an empty result instead.
pub fn is_search_query(command: &Command) -> bool {
    match command {
        Command::Sql { sql } => SEARCH_QUERY.is_match(sql),
        Command::SearchByConditions(_)
        | Command::DescribeSchema { .. }
        | Command::DescribeTable { .. } => true,
        Command::Insert { .. }
        | Command::Update { .. }
        | Command::Upsert { .. }
        | Command::Delete { .. }
        | Command::CreateSchema { .. }
        | Command::CreateTable { .. } => false,
    }
}

/// Converts a search response body into records.
///
/// # Errors
/// Returns a protocol error if the body is not an array of objects.
pub fn records_from_body(body: Value) -> Result<Vec<Record>> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(HarperError::protocol(
                    None,
                    format!("expected a record in search response, got {}", other),
                )),
            })
            .collect(),
        other => Err(HarperError::protocol(
            None,
            format!("expected an array of records, got {}", other),
        )),
    }
}
