//! Lazy provisioning of namespaces and tables.
//!
//! The server has no atomic "create if missing", so the client runs an
//! optimistic describe-then-create the first time a mutation hits a missing
//! structure, then retries the mutation once.
//!
//! # State Machine
//!
//! ```text
//! execute(command)
//!     ├── Ok                          → namespace, table: Known
//!     └── Err(MissingStructure)
//!           ├── read                  → []   (never creates anything)
//!           └── mutation
//!                 ├── namespace Unknown → describe_schema, else create_schema → Known
//!                 ├── table Unknown     → describe_table,  else create_table  → Known
//!                 └── retry once        → result as-is
//! ```
//!
//! Create failures are swallowed: another client may have won the race, and
//! the retry reveals the true state. Within one handle, provisioning runs
//! under an async lock, so concurrent mutations describe/create at most once.

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::codec::is_search_query;
use crate::command::Command;
use crate::connection::StructureState;
use crate::db::HarperDB;
use crate::error::{HarperError, Result};
use crate::query::hash_attribute;

impl HarperDB {
    /// Executes a command, provisioning a missing namespace/table for
    /// mutations and retrying once.
    ///
    /// # Behavior
    ///
    /// - success: both structures become `Known`, the body is returned
    /// - read hitting a missing structure: `[]` is returned, nothing is created
    /// - mutation hitting a missing structure: provision, retry once, return
    ///   the retry's outcome unchanged
    /// - any other failure: propagated unchanged
    ///
    /// # Errors
    ///
    /// Returns the server's error verbatim (`Protocol` / `MissingStructure`),
    /// or `Transport` on network failure.
    #[instrument(skip_all, fields(operation = command.operation()))]
    pub async fn execute(&self, command: Command) -> Result<Value> {
        match self.request(&command).await {
            Ok(body) => {
                self.update_state(|state| state.mark_known())?;
                Ok(body)
            }
            Err(HarperError::MissingStructure { message, .. }) if is_search_query(&command) => {
                debug!(%message, "Read hit a missing structure; returning no rows");
                Ok(Value::Array(Vec::new()))
            }
            Err(HarperError::MissingStructure { message, .. }) => {
                warn!(%message, "Mutation hit a missing structure; provisioning");
                self.provision().await?;
                self.request(&command).await
            }
            Err(err) => Err(err),
        }
    }

    /// Describes or creates whatever is still `Unknown`.
    async fn provision(&self) -> Result<()> {
        // Read the state under the lock: a concurrent caller may have
        // finished provisioning while this one waited.
        let _guard = self.provisioning().await;
        let state = self.state()?;
        let namespace = state.path.namespace.clone();
        let table = state.path.table.clone();

        let mut namespace_description = None;
        if !state.namespace.is_known() {
            let describe = Command::DescribeSchema {
                schema: namespace.clone(),
            };
            match self.request(&describe).await {
                Ok(description) => namespace_description = Some(description),
                Err(err) => {
                    debug!(error = %err, "describe_schema failed; creating namespace");
                    let create = Command::CreateSchema {
                        schema: namespace.clone(),
                    };
                    match self.request(&create).await {
                        Ok(_) => info!(namespace = %namespace, "Namespace created"),
                        Err(err) => debug!(error = %err, "create_schema failed; ignored"),
                    }
                }
            }
            self.update_state(|s| s.namespace = StructureState::Known)?;
        }

        if !state.table.is_known() {
            let description = match namespace_description {
                Some(description) => description.get(&table).filter(|t| !t.is_null()).cloned(),
                None => {
                    let describe = Command::DescribeTable {
                        schema: namespace.clone(),
                        table: table.clone(),
                    };
                    match self.request(&describe).await {
                        Ok(description) => Some(description),
                        Err(err) => {
                            debug!(error = %err, "describe_table failed");
                            None
                        }
                    }
                }
            };

            match description {
                Some(description) => {
                    self.adopt_hash_attribute(&description)?;
                }
                None => {
                    let create = Command::CreateTable {
                        schema: namespace.clone(),
                        table: table.clone(),
                        hash_attribute: state.primary_key.clone(),
                    };
                    match self.request(&create).await {
                        Ok(_) => info!(
                            namespace = %namespace,
                            table = %table,
                            hash_attribute = %state.primary_key,
                            "Table created"
                        ),
                        Err(err) => debug!(error = %err, "create_table failed; ignored"),
                    }
                }
            }
            self.update_state(|s| s.table = StructureState::Known)?;
        }

        Ok(())
    }

    /// Makes the table's hash attribute the primary key, if the description
    /// names one.
    pub(crate) fn adopt_hash_attribute(&self, description: &Value) -> Result<()> {
        let Some(remote_key) = hash_attribute(description) else {
            return Ok(());
        };
        self.update_state(|s| {
            if s.primary_key != remote_key {
                info!(
                    configured = %s.primary_key,
                    remote = %remote_key,
                    "Adopting the table's hash attribute as primary key"
                );
                s.primary_key = remote_key.to_string();
            }
        })
    }
}
