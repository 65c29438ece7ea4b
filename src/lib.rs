//! # harper-link
//!
//! Async client for HarperDB-style HTTP/JSON databases.
//!
//! harper-link turns record operations into the database's JSON command
//! protocol, creates missing namespaces and tables on first write, and runs
//! independent searches concurrently.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use harperlink::{Config, Credentials, Filter, HarperDB, Records};
//! use serde_json::json;
//!
//! let config = Config::for_path("http://localhost:9925", Credentials::basic("admin", "secret"), "dev.dogs")?;
//! let db = HarperDB::connect(config)?;
//!
//! // Creates namespace `dev` and table `dogs` if they don't exist yet
//! db.insert(Records::try_from(json!([{"name": "Rex"}, {"name": "Bo"}]))?).await?;
//!
//! // Exact match on attributes
//! let rex = db.search(Filter::from_json(json!({"name": "Rex"}))?, None).await?;
//!
//! // Substring scan across every attribute
//! let hits = db.search(Filter::values(["bo"]), Some(10)).await?;
//!
//! // Primary keys only
//! let ids = db.uid(Filter::from_json(json!({"name": "Rex"}))?).await?;
//! db.delete(harperlink::Identifiers(ids)).await?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Namespace and table
//!
//! A handle is mounted on one **namespace** (the protocol's "schema") and one
//! **table**. Each table has a **hash attribute**, its primary key.
//!
//! ### Provisioning
//!
//! Mutations that fail because the namespace or table does not exist trigger
//! a describe-or-create of both, followed by exactly one retry. Reads never
//! create anything: they return no rows instead.
//!
//! ### Filters
//!
//! [`Filter`] is a sum type over the accepted search shapes: nothing
//! (introspection), an attribute map (exact match), scalar values (scan),
//! or several attribute maps (concurrent union).
//!
//! ## Features
//!
//! - `http` (default) - [`HttpTransport`](transport::HttpTransport) on `reqwest`
//!   and [`HarperDB::connect`]
//!
//! ## Thread Safety
//!
//! `HarperDB` is `Send + Sync` and can be shared across tasks using `Arc`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod connection;
mod db;
mod error;
mod provision;
mod types;

pub mod codec;
pub mod command;
pub mod pipeline;
pub mod query;
pub mod transport;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main database interface
pub use db::HarperDB;

// Configuration
pub use config::{Config, Credentials, DEFAULT_PRIMARY_KEY, DEFAULT_TIMEOUT};

// Connection state
pub use connection::{ConnectionState, StructureState, TablePath};

// Error handling
pub use error::{HarperError, Result, ValidationError};

// Core types
pub use types::{Identifiers, Record, Records, Selection, WriteResult};

// Commands and searches
pub use command::{Command, Operator, SearchCondition, SearchQuery, SearchType};
pub use pipeline::Pipeline;
pub use query::Filter;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common harper-link usage.
///
/// ```rust
/// use harperlink::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, Credentials};
    pub use crate::db::HarperDB;
    pub use crate::error::{HarperError, Result};
    pub use crate::query::Filter;
    pub use crate::types::{Identifiers, Record, Records, Selection, WriteResult};
}
