//! Query construction: filter shapes → `search_by_conditions` commands.
//!
//! The builders here are pure. Orchestration that needs the network
//! (describing the table for a value scan, fanning out an [`Filter::Any`])
//! lives on [`HarperDB`](crate::HarperDB).

mod filter;

pub use filter::Filter;

use serde_json::Value;

use crate::command::{Operator, SearchCondition, SearchQuery};
use crate::connection::TablePath;
use crate::types::Record;

/// Builds an exact-match search: one `equals` condition per attribute,
/// combined with `and`.
///
/// `null` values are dropped: the server cannot match null equality
/// reliably, so `{"owner": null}` does not restrict the result.
pub fn attribute_search(path: &TablePath, filter: &Record, limit: Option<u64>) -> SearchQuery {
    let mut query = SearchQuery::new(&path.namespace, &path.table);
    query.conditions = filter
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(attribute, value)| SearchCondition::equals(attribute, value.clone()))
        .collect();
    query.operator = Operator::And;
    query.limit = limit;
    query
}

/// Builds a scan: one `contains` condition per (attribute × value) pair,
/// combined with `or`.
///
/// Conditions are ordered attribute-major. `null` values are skipped.
pub fn value_search(
    path: &TablePath,
    attributes: &[String],
    values: &[Value],
    limit: Option<u64>,
) -> SearchQuery {
    let mut query = SearchQuery::new(&path.namespace, &path.table);
    query.conditions = attributes
        .iter()
        .flat_map(|attribute| {
            values
                .iter()
                .filter(|value| !value.is_null())
                .map(move |value| SearchCondition::contains(attribute, value.clone()))
        })
        .collect();
    query.operator = Operator::Or;
    query.limit = limit;
    query
}

/// Lists the attribute names of a `describe_table` response.
///
/// Returns an empty list if the description has no `attributes` array
/// (e.g. the table does not exist yet).
pub fn table_attributes(description: &Value) -> Vec<String> {
    description
        .get("attributes")
        .and_then(Value::as_array)
        .map(|attributes| {
            attributes
                .iter()
                .filter_map(|entry| entry.get("attribute").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Returns the hash (primary-key) attribute of a table description.
pub fn hash_attribute(description: &Value) -> Option<&str> {
    description
        .get("hash_attribute")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
}
