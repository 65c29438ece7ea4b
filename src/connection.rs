//! Connection state: which namespace/table a handle is mounted on and what
//! is known about their existence on the server.

use crate::error::ValidationError;

/// A namespace/table pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TablePath {
    /// Namespace (schema) name.
    pub namespace: String,
    /// Table name.
    pub table: String,
}

impl TablePath {
    /// Builds a path from a namespace and an optional table.
    ///
    /// When `table` is `None`, `namespace` is read as `"namespace.table"` and
    /// split on the first dot.
    ///
    /// # Errors
    /// Returns `ValidationError` if either part ends up empty.
    ///
    /// ```rust
    /// use harperlink::TablePath;
    ///
    /// let path = TablePath::parse("dev.dogs", None).unwrap();
    /// assert_eq!(path.namespace, "dev");
    /// assert_eq!(path.table, "dogs");
    ///
    /// let path = TablePath::parse("dev", Some("cats")).unwrap();
    /// assert_eq!(path.table, "cats");
    /// ```
    pub fn parse(namespace: &str, table: Option<&str>) -> Result<Self, ValidationError> {
        let (namespace, table) = match table {
            Some(table) => (namespace, table),
            None => namespace
                .split_once('.')
                .ok_or_else(|| ValidationError::required_field("table"))?,
        };

        let namespace = namespace.trim();
        let table = table.trim();
        if namespace.is_empty() {
            return Err(ValidationError::required_field("namespace"));
        }
        if table.is_empty() {
            return Err(ValidationError::required_field("table"));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            table: table.to_string(),
        })
    }
}

/// What the client knows about a remote structure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StructureState {
    /// Never confirmed; provisioning may still be needed.
    #[default]
    Unknown,
    /// Confirmed to exist (or provisioning already ran for it).
    Known,
}

impl StructureState {
    /// Returns true if the structure is known to exist.
    pub fn is_known(self) -> bool {
        matches!(self, Self::Known)
    }
}

/// Mutable state of one connection.
///
/// Owned by a single [`HarperDB`](crate::HarperDB) handle. Only the
/// provisioning state machine and `mount` change it.
#[derive(Clone, Debug)]
pub struct ConnectionState {
    /// Mounted namespace and table.
    pub path: TablePath,
    /// Primary-key attribute, possibly adopted from the remote table.
    pub primary_key: String,
    /// Provisioning state of the namespace.
    pub namespace: StructureState,
    /// Provisioning state of the table.
    pub table: StructureState,
}

impl ConnectionState {
    /// Creates a fresh state: both structures `Unknown`.
    pub fn new(path: TablePath, primary_key: impl Into<String>) -> Self {
        Self {
            path,
            primary_key: primary_key.into(),
            namespace: StructureState::Unknown,
            table: StructureState::Unknown,
        }
    }

    /// Marks both namespace and table as known.
    pub fn mark_known(&mut self) {
        self.namespace = StructureState::Known;
        self.table = StructureState::Known;
    }

    /// Returns true if nothing is left to provision.
    pub fn is_provisioned(&self) -> bool {
        self.namespace.is_known() && self.table.is_known()
    }
}
