//! Configuration types for harper-link.
//!
//! The [`Config`] struct controls connection behavior including:
//! - Endpoint URL and credentials
//! - The namespace and table a connection is mounted on
//! - Primary-key attribute name and request timeout
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use harperlink::{Config, Credentials};
//!
//! // Namespace and table as a dot-joined path
//! let config = Config::for_path("http://localhost:9925", Credentials::token("dG9rZW4="), "dev.dogs")
//!     .unwrap()
//!     .with_timeout(Duration::from_secs(5));
//! assert_eq!(config.namespace, "dev");
//! assert_eq!(config.table, "dogs");
//! ```

use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};

use crate::connection::TablePath;
use crate::error::ValidationError;

/// Default primary-key (hash) attribute for tables created by this client.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Connection configuration.
///
/// Fields are public; use the `with_*` helpers or struct update syntax to
/// override specific settings. Call [`Config::validate`] (done automatically
/// by [`HarperDB::connect`](crate::HarperDB::connect)) before use.
#[derive(Clone, Debug)]
pub struct Config {
    /// Endpoint receiving the JSON commands (e.g. `http://localhost:9925`).
    pub url: String,

    /// Credentials used for the `Authorization: Basic` header.
    pub credentials: Credentials,

    /// Namespace (schema) the connection is mounted on.
    pub namespace: String,

    /// Table within the namespace.
    pub table: String,

    /// Primary-key attribute name.
    ///
    /// Used as `hash_attribute` when a table is created, and replaced by the
    /// remote table's actual hash attribute once it has been described.
    /// Default: `"id"`
    pub primary_key: String,

    /// Per-request timeout. Default: 15 seconds.
    pub timeout: Duration,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Config {
    /// Creates a configuration for an explicit namespace and table.
    pub fn new(
        url: impl Into<String>,
        credentials: Credentials,
        namespace: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            credentials,
            namespace: namespace.into(),
            table: table.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Creates a configuration from a dot-joined `"namespace.table"` path.
    ///
    /// The path is split on the first dot only.
    ///
    /// # Errors
    /// Returns `ValidationError` if either part is missing or empty.
    pub fn for_path(
        url: impl Into<String>,
        credentials: Credentials,
        path: &str,
    ) -> Result<Self, ValidationError> {
        let path = TablePath::parse(path, None)?;
        Ok(Self::new(url, credentials, path.namespace, path.table))
    }

    /// Overrides the primary-key attribute name.
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `url` is empty or not an http(s) URL
    /// - credentials are empty
    /// - `namespace`, `table` or `primary_key` is blank
    /// - `timeout` is zero
    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::required_field("url"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ValidationError::invalid_field(
                "url",
                format!("expected an http(s) URL, got '{}'", self.url),
            ));
        }

        self.credentials.validate()?;

        if self.namespace.trim().is_empty() {
            return Err(ValidationError::required_field("namespace"));
        }
        if self.table.trim().is_empty() {
            return Err(ValidationError::required_field("table"));
        }
        if self.primary_key.trim().is_empty() {
            return Err(ValidationError::invalid_field(
                "primary_key",
                "must not be blank",
            ));
        }

        if self.timeout.is_zero() {
            return Err(ValidationError::invalid_field(
                "timeout",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Credentials for the `Authorization: Basic` header.
#[derive(Clone)]
pub enum Credentials {
    /// A ready-made Basic token (base64 of `user:password`).
    Token(String),

    /// Username and password, encoded on demand.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
}

impl Credentials {
    /// Creates credentials from a pre-encoded Basic token.
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }

    /// Creates credentials from a username and password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the full `Authorization` header value.
    ///
    /// ```rust
    /// use harperlink::Credentials;
    ///
    /// let creds = Credentials::basic("alice", "secret123");
    /// assert_eq!(creds.header_value(), "Basic YWxpY2U6c2VjcmV0MTIz");
    /// ```
    pub fn header_value(&self) -> String {
        match self {
            Self::Token(token) => format!("Basic {}", token.trim()),
            Self::Basic { username, password } => {
                // RFC 7617
                let encoded =
                    general_purpose::STANDARD.encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Token(token) if token.trim().is_empty() => Err(ValidationError::invalid_field(
                "credentials",
                "token must not be empty",
            )),
            Self::Basic { username, .. } if username.is_empty() => Err(
                ValidationError::invalid_field("credentials", "username must not be empty"),
            ),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets stay out of logs.
        match self {
            Self::Token(_) => f.write_str("Credentials::Token(***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Credentials::Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}
