//! Error types for the dynsync system
//!
//! Three families matter to the engine:
//! - Control-flow signals ([`Error::NoResult`], [`Error::MultipleResults`])
//!   returned by provider adapters during record lookup
//! - Construction-time configuration errors, raised once when an adapter or
//!   record is built and never retried
//! - Runtime errors (transport, auth, rate limiting, timeouts), recorded as
//!   a failed attempt and retried on a later tick

use std::time::Duration;
use thiserror::Error;

/// Result type alias for dynsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dynsync system
#[derive(Error, Debug)]
pub enum Error {
    /// The provider found no matching remote record.
    ///
    /// Control-flow signal, not a transport failure: the adapter reacts with
    /// exactly one creation attempt inside the same update call. When the
    /// signal still surfaces from `update`, creation also came back empty
    /// and the attempt is recorded as failed for this cycle.
    #[error("no matching record found")]
    NoResult,

    /// The provider found more than one matching remote record.
    ///
    /// Always ambiguous and never auto-resolved; the count is preserved for
    /// the operator-facing message.
    #[error("{count} matching records found instead of 1")]
    MultipleResults {
        /// Number of records the lookup returned
        count: usize,
    },

    /// Configuration errors (invalid domain, credential format, missing
    /// zone identifier, zero TTL, unknown provider name). Raised at
    /// construction, fatal to registering the record, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// All IP-information sources failed for a requested family
    #[error("public IP resolution failed: {0}")]
    Resolver(String),

    /// Provider-specific runtime error
    #[error("provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// A vendor call or IP resolution exceeded its deadline
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a resolver error
    pub fn resolver(msg: impl Into<String>) -> Self {
        Self::Resolver(msg.into())
    }

    /// Create a provider-specific runtime error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP transport error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// True for the two lookup outcomes the engine treats as control flow
    /// rather than transport failure.
    pub fn is_control_flow(&self) -> bool {
        matches!(self, Self::NoResult | Self::MultipleResults { .. })
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
