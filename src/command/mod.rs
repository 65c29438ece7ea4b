//! Commands of the JSON protocol.
//!
//! Every request body is one [`Command`], serialized with an `operation`
//! tag:
//!
//! ```text
//! {"operation": "insert", "schema": "dev", "table": "dogs", "records": [...]}
//! ```
//!
//! Commands are value objects: built fresh for each call and never changed
//! after being sent.

pub mod types;

pub use types::{Operator, SearchCondition, SearchQuery, SearchType};

use serde::Serialize;
use serde_json::Value;

use crate::codec::trim_query;
use crate::types::Record;

/// One database operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Command {
    /// Raw SQL.
    Sql {
        /// Query text (already trimmed).
        sql: String,
    },
    /// Insert new records.
    Insert {
        /// Namespace.
        schema: String,
        /// Table.
        table: String,
        /// Records to insert.
        records: Vec<Record>,
    },
    /// Update records identified by their primary key.
    Update {
        /// Namespace.
        schema: String,
        /// Table.
        table: String,
        /// Records to update.
        records: Vec<Record>,
    },
    /// Insert or update, matched by primary key on the server.
    Upsert {
        /// Namespace.
        schema: String,
        /// Table.
        table: String,
        /// Records to upsert.
        records: Vec<Record>,
    },
    /// Delete records by primary key.
    Delete {
        /// Namespace.
        schema: String,
        /// Table.
        table: String,
        /// Primary-key values.
        hash_values: Vec<Value>,
    },
    /// Condition-list search.
    SearchByConditions(SearchQuery),
    /// Describe a namespace (lists its tables).
    DescribeSchema {
        /// Namespace.
        schema: String,
    },
    /// Create a namespace.
    CreateSchema {
        /// Namespace.
        schema: String,
    },
    /// Describe a table (hash attribute, attributes, record count).
    DescribeTable {
        /// Namespace.
        schema: String,
        /// Table.
        table: String,
    },
    /// Create a table.
    CreateTable {
        /// Namespace.
        schema: String,
        /// Table.
        table: String,
        /// Primary-key attribute of the new table.
        hash_attribute: String,
    },
}

impl Command {
    /// Creates a raw SQL command; multiline text is trimmed to one line.
    ///
    /// ```rust
    /// use harperlink::Command;
    ///
    /// let cmd = Command::sql("
    ///     SELECT *
    ///     FROM dev.dogs
    /// ");
    /// assert_eq!(cmd, Command::Sql { sql: "SELECT * FROM dev.dogs".into() });
    /// ```
    pub fn sql(query: &str) -> Self {
        Self::Sql {
            sql: trim_query(query),
        }
    }

    /// Returns the wire name of the operation.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Sql { .. } => "sql",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Upsert { .. } => "upsert",
            Self::Delete { .. } => "delete",
            Self::SearchByConditions(_) => "search_by_conditions",
            Self::DescribeSchema { .. } => "describe_schema",
            Self::CreateSchema { .. } => "create_schema",
            Self::DescribeTable { .. } => "describe_table",
            Self::CreateTable { .. } => "create_table",
        }
    }
}

impl From<&str> for Command {
    fn from(query: &str) -> Self {
        Self::sql(query)
    }
}

impl From<String> for Command {
    fn from(query: String) -> Self {
        Self::sql(&query)
    }
}

impl From<SearchQuery> for Command {
    fn from(query: SearchQuery) -> Self {
        Self::SearchByConditions(query)
    }
}
