//! Error types for harper-link.
//!
//! harper-link uses a small, classified error system:
//! - `HarperError` is the top-level error returned by all public APIs
//! - `ValidationError` details arguments rejected before any network call
//!
//! Server failures are classified once, when the response is decoded, into
//! [`HarperError::MissingStructure`] (the namespace or table does not exist
//! yet) or [`HarperError::Protocol`] (everything else). The provisioning
//! state machine matches on that discriminant instead of re-parsing messages.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use harperlink::{Config, Credentials, HarperDB, Result};
//!
//! async fn example(record: harperlink::Record) -> Result<()> {
//!     let config = Config::for_path("http://localhost:9925", Credentials::token("dG9rZW4="), "dev.dogs")?;
//!     let db = HarperDB::connect(config)?;
//!     db.insert(record).await?;
//!     Ok(())
//! }
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Result type alias for harper-link operations.
pub type Result<T> = std::result::Result<T, HarperError>;

/// Server messages that mean "the namespace or table is not there yet".
static MISSING_STRUCTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)not exists?|unknown attribute").expect("missing-structure pattern is valid")
});

/// Top-level error enum for all harper-link operations.
///
/// This is the only error type returned by public APIs.
/// Server messages are preserved verbatim in every remote variant.
#[derive(Debug, Error)]
pub enum HarperError {
    /// Argument rejected before any network call.
    #[error("Invalid argument: {0}")]
    Validation(#[from] ValidationError),

    /// The remote namespace or table does not exist (yet).
    ///
    /// Recoverable for mutations through provisioning; reads degrade to an
    /// empty result.
    #[error("{message}")]
    MissingStructure {
        /// HTTP status code, if the failure came from a response.
        status: Option<u16>,
        /// Server message, verbatim.
        message: String,
    },

    /// Any other failed command (non-2xx status or an `error` field in the body).
    #[error("{message}")]
    Protocol {
        /// HTTP status code, if the failure came from a response.
        status: Option<u16>,
        /// Server message, verbatim.
        message: String,
    },

    /// Network failure or timeout. Never retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// `drain()` was called on a pipeline with nothing queued.
    #[error("Missing request batch: nothing was queued before drain")]
    EmptyBatch,

    /// Internal state could not be accessed (poisoned lock).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HarperError {
    /// Classifies a failed command by its server message.
    ///
    /// Messages mentioning a structure that does "not exist" or an
    /// "unknown attribute" become [`HarperError::MissingStructure`];
    /// everything else becomes [`HarperError::Protocol`].
    pub fn from_server(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if MISSING_STRUCTURE.is_match(&message) {
            Self::MissingStructure { status, message }
        } else {
            Self::Protocol { status, message }
        }
    }

    /// Creates a protocol error with the given message.
    pub fn protocol(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            message: message.into(),
        }
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this is a validation (invalid argument) error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the namespace or table was reported missing.
    pub fn is_missing_structure(&self) -> bool {
        matches!(self, Self::MissingStructure { .. })
    }

    /// Returns true if this is a protocol error.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns true if this is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if a pipeline was drained while empty.
    pub fn is_empty_batch(&self) -> bool {
        matches!(self, Self::EmptyBatch)
    }

    /// Returns the HTTP status of a server-reported error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } | Self::MissingStructure { status, .. } => *status,
            _ => None,
        }
    }
}

/// Validation errors for caller-supplied arguments.
///
/// These errors are always raised before any request is sent.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },

    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// The filter passed to a search has an unsupported shape.
    #[error("Malformed filter: {reason}")]
    InvalidFilter {
        /// Why the filter was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed filter error.
    pub fn invalid_filter(reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            reason: reason.into(),
        }
    }
}
