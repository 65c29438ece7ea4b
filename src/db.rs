//! HarperDB handle and record operations.
//!
//! The [`HarperDB`] struct is the primary interface of the crate. It is
//! mounted on one namespace/table and provides:
//!
//! - Record operations (insert, update, upsert, delete)
//! - Searches (select, search, uid)
//! - Raw commands and SQL
//! - Batched, concurrent sub-requests through [`Pipeline`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use harperlink::{Config, Credentials, Filter, HarperDB};
//! use serde_json::json;
//!
//! let config = Config::for_path("http://localhost:9925", Credentials::basic("admin", "secret"), "dev.dogs")?;
//! let db = HarperDB::connect(config)?;
//!
//! // The first write creates `dev` and `dev.dogs` if needed
//! db.insert(Records::try_from(json!({"name": "Rex", "age": 3}))?).await?;
//!
//! let dogs = db.search(Filter::from_json(json!({"name": "Rex"}))?, None).await?;
//! ```
//!
//! # Concurrency
//!
//! `HarperDB` is `Send + Sync`; record operations take `&self` and can run
//! concurrently. Rebinding with [`HarperDB::mount`] takes `&mut self`, so it
//! needs exclusive access to the handle.

use std::sync::{Arc, RwLock};

use futures_util::lock::Mutex as AsyncMutex;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::codec::{records_from_body, serialize, strip_server_timestamps};
use crate::command::Command;
use crate::config::Config;
use crate::connection::{ConnectionState, TablePath};
use crate::error::{HarperError, Result, ValidationError};
use crate::pipeline::Pipeline;
use crate::query::{attribute_search, table_attributes, value_search, Filter};
use crate::transport::{Transport, TransportRequest};
use crate::types::{Identifiers, Record, Records, Selection, WriteResult};

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// A connection mounted on one namespace/table.
///
/// # Ownership
///
/// Each handle owns its [`ConnectionState`]. There is no global connection:
/// create handles explicitly with [`HarperDB::connect`],
/// [`HarperDB::with_transport`] or [`HarperDB::connect_or_reuse`].
pub struct HarperDB {
    /// Sends commands (reqwest or a test double).
    transport: Arc<dyn Transport>,

    /// Configuration used to open this connection.
    config: Config,

    /// Mounted path, primary key and provisioning flags.
    /// Never held across an `.await`.
    state: RwLock<ConnectionState>,

    /// Serializes provisioning so concurrent mutations describe/create once.
    provisioning: AsyncMutex<()>,
}

impl std::fmt::Debug for HarperDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarperDB")
            .field("url", &self.config.url)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Which mutation a record write sends.
#[derive(Clone, Copy, Debug)]
enum WriteKind {
    Insert,
    Update,
    Upsert,
}

impl HarperDB {
    /// Opens a connection using the default HTTP transport.
    ///
    /// No request is sent; the namespace and table are provisioned lazily
    /// by the first mutation that needs them.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configuration is invalid
    /// (see [`Config::validate`]).
    #[cfg(feature = "http")]
    pub fn connect(config: Config) -> Result<Self> {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// Opens a connection on a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configuration is invalid.
    #[instrument(skip_all, fields(url = %config.url, namespace = %config.namespace, table = %config.table))]
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let path = TablePath::parse(&config.namespace, Some(config.table.as_str()))?;
        let state = ConnectionState::new(path, config.primary_key.trim());

        info!(
            primary_key = %state.primary_key,
            timeout_ms = config.timeout.as_millis() as u64,
            "HarperDB connection ready"
        );

        Ok(Self {
            transport,
            config,
            state: RwLock::new(state),
            provisioning: AsyncMutex::new(()),
        })
    }

    /// Returns an existing handle or opens a new one.
    ///
    /// | `existing` | `config` | result |
    /// |------------|----------|--------|
    /// | `Some(db)` | `None` | `db` unchanged |
    /// | any | `Some(config)` | new handle (reusing `db`'s transport if given) |
    /// | `None` | `None` | `InvalidArgument` |
    ///
    /// # Errors
    ///
    /// Returns a validation error if neither a handle nor a configuration is
    /// given, or if the configuration is invalid.
    #[cfg(feature = "http")]
    pub fn connect_or_reuse(existing: Option<Self>, config: Option<Config>) -> Result<Self> {
        match (existing, config) {
            (Some(db), None) => Ok(db),
            (Some(db), Some(config)) => Self::with_transport(config, db.transport),
            (None, Some(config)) => Self::connect(config),
            (None, None) => Err(ValidationError::invalid_field(
                "credentials",
                "no existing connection and no configuration given",
            )
            .into()),
        }
    }

    /// Returns the configuration used to open this connection.
    ///
    /// `namespace`, `table` and `primary_key` here are the *initial* values;
    /// see [`HarperDB::path`] and [`HarperDB::primary_key`] for the current ones.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a snapshot of the connection state.
    pub fn state(&self) -> Result<ConnectionState> {
        self.state
            .read()
            .map(|state| state.clone())
            .map_err(|_| HarperError::internal("Connection state lock poisoned"))
    }

    /// Returns the mounted namespace/table.
    pub fn path(&self) -> Result<TablePath> {
        self.state().map(|state| state.path)
    }

    /// Returns the current primary-key attribute.
    ///
    /// This is the configured name until the remote table has been
    /// described, then the table's actual hash attribute.
    pub fn primary_key(&self) -> Result<String> {
        self.state().map(|state| state.primary_key)
    }

    /// Waits for any provisioning in flight and holds off others.
    pub(crate) async fn provisioning(&self) -> futures_util::lock::MutexGuard<'_, ()> {
        self.provisioning.lock().await
    }

    /// Applies a change to the connection state.
    pub(crate) fn update_state<R>(&self, change: impl FnOnce(&mut ConnectionState) -> R) -> Result<R> {
        let mut state = self
            .state
            .write()
            .map_err(|_| HarperError::internal("Connection state lock poisoned"))?;
        Ok(change(&mut state))
    }

    /// Rebinds this handle to another namespace/table.
    ///
    /// `namespace` may be a dot-joined `"namespace.table"` path when `table`
    /// is `None`. Provisioning flags are reset to `Unknown`. When
    /// `primary_key` is `None` the configured primary key is used.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty names or a blank primary key.
    #[instrument(skip(self))]
    pub fn mount(
        &mut self,
        namespace: &str,
        table: Option<&str>,
        primary_key: Option<&str>,
    ) -> Result<()> {
        let path = TablePath::parse(namespace, table)?;
        let primary_key = match primary_key {
            Some(key) if key.trim().is_empty() => {
                return Err(
                    ValidationError::invalid_field("primary_key", "must not be blank").into(),
                )
            }
            Some(key) => key.trim().to_string(),
            None => self.config.primary_key.trim().to_string(),
        };

        info!(namespace = %path.namespace, table = %path.table, %primary_key, "Mounting");

        let state = self
            .state
            .get_mut()
            .map_err(|_| HarperError::internal("Connection state lock poisoned"))?;
        *state = ConnectionState::new(path, primary_key);
        Ok(())
    }

    /// Creates an empty pipeline bound to this connection.
    pub fn pipeline<'a, T: Send + 'a>(&'a self) -> Pipeline<'a, T> {
        Pipeline::new()
    }

    // =========================================================================
    // Raw commands
    // =========================================================================

    /// Sends one command as-is: no provisioning, no retry.
    ///
    /// # Errors
    ///
    /// Returns a classified server error, a transport error, or a protocol
    /// error if the command cannot be serialized.
    pub async fn request(&self, command: &Command) -> Result<Value> {
        let body = serialize(command).ok_or_else(|| {
            HarperError::protocol(
                None,
                format!("'{}' command could not be serialized", command.operation()),
            )
        })?;

        let request = TransportRequest {
            url: self.config.url.clone(),
            body,
            headers: vec![
                ("Content-Type".into(), "application/json".into()),
                ("Accept".into(), "application/json".into()),
                ("Cache-Control".into(), "no-cache".into()),
                ("User-Agent".into(), self.config.user_agent.clone()),
                ("Authorization".into(), self.config.credentials.header_value()),
            ],
            timeout: self.config.timeout,
        };

        debug!(operation = command.operation(), "Sending command");
        let response = self.transport.send(request).await?;
        debug!(operation = command.operation(), status = response.status, "Command answered");
        response.into_result()
    }

    /// Runs raw SQL through the provisioning state machine.
    ///
    /// Multiline text is collapsed to one line. `SELECT` statements count as
    /// reads: a missing table yields `[]`.
    pub async fn sql(&self, query: &str) -> Result<Value> {
        self.execute(Command::sql(query)).await
    }

    /// Describes the mounted table (hash attribute, attributes, record count).
    ///
    /// The table's hash attribute becomes the primary key used by `uid`,
    /// `update` and `upsert_probed`. Returns `[]` if the table does not exist.
    pub async fn describe(&self) -> Result<Value> {
        let path = self.path()?;
        let description = self
            .execute(Command::DescribeTable {
                schema: path.namespace,
                table: path.table,
            })
            .await?;
        self.adopt_hash_attribute(&description)?;
        Ok(description)
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Inserts one or more records.
    ///
    /// Server-managed timestamp attributes are stripped before sending.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty batch, or the server error.
    #[instrument(skip_all)]
    pub async fn insert(&self, records: impl Into<Records>) -> Result<WriteResult> {
        self.write(WriteKind::Insert, records.into()).await
    }

    /// Updates one or more records; every record must carry the primary key.
    #[instrument(skip_all)]
    pub async fn update(&self, records: impl Into<Records>) -> Result<WriteResult> {
        self.write(WriteKind::Update, records.into()).await
    }

    /// Upserts one or more records using the server's native upsert.
    ///
    /// Records carrying the primary key replace/merge the existing row;
    /// records without it are inserted. No client-side probing happens; see
    /// [`HarperDB::upsert_probed`] for that.
    #[instrument(skip_all)]
    pub async fn upsert(&self, records: impl Into<Records>) -> Result<WriteResult> {
        self.write(WriteKind::Upsert, records.into()).await
    }

    /// Upserts after looking up keyless records on the client.
    ///
    /// Every record without a primary key is searched for (all its non-null
    /// attributes must match) concurrently through a [`Pipeline`]:
    ///
    /// - exactly one match: the match's attributes are merged under the
    ///   record (the record's values win) so the upsert updates that row
    /// - zero or several matches: the record is sent as-is and the server
    ///   inserts a new row
    #[instrument(skip_all)]
    pub async fn upsert_probed(&self, records: impl Into<Records>) -> Result<WriteResult> {
        let mut records = records.into().into_inner();
        let primary_key = self.primary_key()?;

        let mut probed = Vec::new();
        let mut pipeline = self.pipeline();
        for (i, record) in records.iter_mut().enumerate() {
            if has_key(record, &primary_key) {
                continue;
            }
            record.remove(&primary_key);
            if record.values().all(Value::is_null) {
                continue;
            }
            let probe = record.clone();
            probed.push(i);
            pipeline.enqueue(move || self.search_attributes(probe, None));
        }

        let findings = pipeline.drain_or_empty().await?;
        for (i, matches) in probed.into_iter().zip(findings) {
            match matches.as_slice() {
                [existing] => {
                    let mut merged = existing.clone();
                    merged.extend(std::mem::take(&mut records[i]));
                    records[i] = merged;
                }
                other => debug!(matches = other.len(), "No unique match; upsert inserts"),
            }
        }

        self.write(WriteKind::Upsert, Records(records)).await
    }

    /// Deletes records by primary-key value.
    ///
    /// # Errors
    ///
    /// Returns a validation error if no identifier is given.
    #[instrument(skip_all)]
    pub async fn delete(&self, ids: impl Into<Identifiers>) -> Result<WriteResult> {
        let ids = ids.into();
        if ids.is_empty() {
            return Err(ValidationError::required_field("hash_values").into());
        }

        let path = self.path()?;
        let body = self
            .execute(Command::Delete {
                schema: path.namespace,
                table: path.table,
                hash_values: ids.into_inner(),
            })
            .await?;
        write_result(body)
    }

    // =========================================================================
    // Searches
    // =========================================================================

    /// Selects records, or describes the table when `filter` is
    /// [`Filter::All`].
    ///
    /// `limit` caps the result size; `None` leaves the server default.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed filter (before any request),
    /// or the server error.
    #[instrument(skip_all, fields(limit = ?limit))]
    pub async fn select(&self, filter: impl Into<Filter>, limit: Option<u64>) -> Result<Selection> {
        match filter.into() {
            Filter::All => self.describe().await.map(Selection::Schema),
            filter => self.search(filter, limit).await.map(Selection::Records),
        }
    }

    /// Searches for records.
    ///
    /// Like [`HarperDB::select`] but always returns rows.
    ///
    /// # Errors
    ///
    /// [`Filter::All`] is rejected here (it describes instead of searching).
    #[instrument(skip_all, fields(limit = ?limit))]
    pub async fn search(&self, filter: impl Into<Filter>, limit: Option<u64>) -> Result<Vec<Record>> {
        let filter = filter.into();
        filter.validate()?;

        match filter {
            Filter::All => Err(ValidationError::invalid_filter(
                "a search needs a filter; use select() or describe() to introspect",
            )
            .into()),
            Filter::Attributes(attributes) => self.search_attributes(attributes, limit).await,
            Filter::Values(values) => self.search_values(values, limit).await,
            Filter::Any(filters) => {
                let mut pipeline = self.pipeline();
                for attributes in filters {
                    pipeline.enqueue(move || self.search_attributes(attributes, limit));
                }
                let results = pipeline.drain_or_empty().await?;
                Ok(results.into_iter().flatten().collect())
            }
        }
    }

    /// Returns the primary-key values of every record matching `filter`.
    ///
    /// Records without the attribute are skipped.
    pub async fn uid(&self, filter: impl Into<Filter>) -> Result<Vec<Value>> {
        let records = self.search(filter, None).await?;
        let primary_key = self.primary_key()?;
        Ok(records
            .into_iter()
            .filter_map(|mut record| record.remove(&primary_key))
            .collect())
    }

    async fn search_attributes(&self, attributes: Record, limit: Option<u64>) -> Result<Vec<Record>> {
        // Nulls are dropped from the conditions; with nothing left the server
        // would match every row.
        if attributes.values().all(Value::is_null) {
            debug!("Attribute filter has no non-null values; nothing to search");
            return Ok(Vec::new());
        }

        let path = self.path()?;
        let query = attribute_search(&path, &attributes, limit);
        let body = self.execute(query.into()).await?;
        records_from_body(body)
    }

    async fn search_values(&self, values: Vec<Value>, limit: Option<u64>) -> Result<Vec<Record>> {
        if values.iter().all(Value::is_null) {
            return Ok(Vec::new());
        }

        let description = self.describe().await?;
        let attributes = table_attributes(&description);
        if attributes.is_empty() {
            debug!("Table has no attributes to scan");
            return Ok(Vec::new());
        }

        let path = self.path()?;
        let query = value_search(&path, &attributes, &values, limit);
        let body = self.execute(query.into()).await?;
        records_from_body(body)
    }

    async fn write(&self, kind: WriteKind, records: Records) -> Result<WriteResult> {
        if records.is_empty() {
            return Err(ValidationError::required_field("records").into());
        }

        let records = strip_server_timestamps(records.into_inner());
        let path = self.path()?;

        if let WriteKind::Update = kind {
            let primary_key = self.primary_key()?;
            if let Some(i) = records.iter().position(|r| !has_key(r, &primary_key)) {
                return Err(ValidationError::invalid_field(
                    "records",
                    format!("record {} has no '{}' to update by", i, primary_key),
                )
                .into());
            }
        }

        debug!(kind = ?kind, count = records.len(), "Writing records");
        let (schema, table) = (path.namespace, path.table);
        let command = match kind {
            WriteKind::Insert => Command::Insert { schema, table, records },
            WriteKind::Update => Command::Update { schema, table, records },
            WriteKind::Upsert => Command::Upsert { schema, table, records },
        };

        let body = self.execute(command).await?;
        write_result(body)
    }
}

/// True if the record carries a usable primary-key value.
fn has_key(record: &Record, primary_key: &str) -> bool {
    match record.get(primary_key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn write_result(body: Value) -> Result<WriteResult> {
    serde_json::from_value(body)
        .map_err(|e| HarperError::protocol(None, format!("unexpected write response: {}", e)))
}

// HarperDB is auto Send + Sync: Arc<dyn Transport> (Transport: Send + Sync),
// Config, RwLock<ConnectionState> and the provisioning mutex are all Send + Sync.
