//! Search condition types for `search_by_conditions`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a condition compares an attribute with its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Exact match.
    Equals,
    /// Substring-style match.
    Contains,
}

/// How conditions are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Every condition must match.
    #[default]
    And,
    /// At least one condition must match.
    Or,
}

/// One attribute/value/match-type triple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchCondition {
    /// Attribute to compare.
    #[serde(rename = "search_attribute")]
    pub attribute: String,
    /// Value to compare with.
    #[serde(rename = "search_value")]
    pub value: Value,
    /// Match type.
    pub search_type: SearchType,
}

impl SearchCondition {
    /// Creates an `equals` condition.
    pub fn equals(attribute: impl Into<String>, value: Value) -> Self {
        Self {
            attribute: attribute.into(),
            value,
            search_type: SearchType::Equals,
        }
    }

    /// Creates a `contains` condition.
    pub fn contains(attribute: impl Into<String>, value: Value) -> Self {
        Self {
            attribute: attribute.into(),
            value,
            search_type: SearchType::Contains,
        }
    }
}

/// Body of a `search_by_conditions` command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Namespace.
    pub schema: String,
    /// Table.
    pub table: String,
    /// Projection; `["*"]` for every attribute.
    pub get_attributes: Vec<String>,
    /// Conditions, in order.
    pub conditions: Vec<SearchCondition>,
    /// Combinator.
    pub operator: Operator,
    /// Offset into the result set.
    pub offset: u64,
    /// Result cap. Omitted when `None`; the server rejects an explicit `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl SearchQuery {
    /// Creates an empty `and` search over every attribute.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            get_attributes: vec!["*".to_string()],
            conditions: Vec::new(),
            operator: Operator::And,
            offset: 0,
            limit: None,
        }
    }
}
