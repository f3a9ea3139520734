//! Error types for chainlog.
//!
//! Every call that crosses the wallet or contract boundary returns a typed
//! [`Result`]. The context layer logs failures and hands the same value back,
//! so hosts can choose to surface, retry, or ignore each one.

use std::fmt;

use alloy::transports::TransportError;

/// JSON-RPC error code used by EIP-1193 wallets when the user declines a prompt.
pub const USER_REJECTED_CODE: i64 = 4001;

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for chainlog operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No wallet backend is available to this session.
    #[error("no wallet provider available, please install or configure a wallet")]
    ProviderUnavailable,

    /// The user declined a wallet prompt.
    #[error("user rejected the request: {0}")]
    UserRejected(String),

    /// A remote call to the wallet provider or contract failed.
    #[error("rpc: {0}")]
    Rpc(String),

    /// An amount or address could not be converted.
    #[error("conversion: {0}")]
    Conversion(String),

    /// Local persisted state could not be read or written.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Invalid or missing configuration.
    #[error("config: {0}")]
    Config(String),

    /// A submission is already awaiting confirmation and single-flight is on.
    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

impl Error {
    /// Create an RPC error from a message.
    #[inline]
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    /// Create a conversion error from a message.
    #[inline]
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create a configuration error from a message.
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify a transport failure, recognising EIP-1193 user rejection.
    #[must_use]
    pub fn from_transport(context: &str, err: &TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) if payload.code == USER_REJECTED_CODE => {
                Self::UserRejected(payload.message.to_string())
            }
            _ => Self::Rpc(format!("{context}: {err}")),
        }
    }

    /// Classify a contract call failure.
    #[must_use]
    pub fn from_contract(context: &str, err: &alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(inner) => Self::from_transport(context, inner),
            other => Self::Rpc(format!("{context}: {other}")),
        }
    }

    /// Returns `true` if the user declined a wallet prompt.
    #[must_use]
    pub const fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected(_))
    }

    /// Returns `true` if this error should be shown to the user as a blocking
    /// advisory rather than logged.
    #[must_use]
    pub const fn is_advisory(&self) -> bool {
        matches!(self, Self::ProviderUnavailable)
    }
}

/// Result type alias for chainlog operations.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Storage Errors
// ============================================================================

/// Error type for the local count store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value could not be parsed.
    #[error("parse {key}: {value:?}")]
    Parse {
        /// Storage key.
        key: String,
        /// The raw stored value.
        value: String,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ============================================================================
// Display Helpers
// ============================================================================

/// Wraps an [`Error`] for a one-line, user-facing message.
#[derive(Debug)]
pub struct DisplayError<'a>(pub &'a Error);

impl fmt::Display for DisplayError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Error::ProviderUnavailable => write!(f, "Please install a wallet provider"),
            Error::UserRejected(_) => write!(f, "Request was declined in the wallet"),
            Error::Rpc(e) => write!(f, "Network error: {e}"),
            Error::Conversion(e) => write!(f, "Invalid input: {e}"),
            Error::Storage(e) => write!(f, "Storage error: {e}"),
            Error::Config(e) => write!(f, "Configuration error: {e}"),
            Error::SubmissionInFlight => write!(f, "A transaction is already pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_helpers() {
        assert!(matches!(Error::rpc("boom"), Error::Rpc(_)));
        assert!(matches!(Error::conversion("bad"), Error::Conversion(_)));
        assert!(matches!(Error::config("missing"), Error::Config(_)));
    }

    #[test]
    fn test_storage_conversion() {
        let io = std::io::Error::other("disk");
        let err: Error = StorageError::from(io).into();
        assert!(matches!(err, Error::Storage(StorageError::Io(_))));
    }

    #[test]
    fn test_predicates() {
        assert!(Error::ProviderUnavailable.is_advisory());
        assert!(!Error::rpc("x").is_advisory());
        assert!(Error::UserRejected("no".into()).is_user_rejection());
        assert!(!Error::SubmissionInFlight.is_user_rejection());
    }

    #[test]
    fn test_display_error() {
        let err = Error::ProviderUnavailable;
        assert_eq!(
            DisplayError(&err).to_string(),
            "Please install a wallet provider"
        );
    }
}
