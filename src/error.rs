//! Error types for ec2-reservation-check
//!
//! Library code returns `crate::error::Result<T>` carrying a `CheckError`.
//! The binary converts to `anyhow::Error` at the CLI boundary so the full
//! source chain is printed when a run aborts.
//!
//! ## Provider failures
//!
//! Failures from the inventory provider are fatal for the run. They are
//! split by cause so a caller can decide whether running again is sensible:
//!
//! - `Auth`: bad, expired, or insufficient credentials. Not retryable.
//! - `Throttled`: the API rejected the call for rate reasons. Retryable.
//! - `Transport`: timeouts, DNS, connection resets. Retryable.
//! - `Api`: any other service error (unknown code, malformed request).
//!
//! Malformed inventory records are never errors; they are defaulted where
//! they are converted (see `crate::aws`).

use thiserror::Error;

/// Main error type for ec2-reservation-check
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed for {operation}: {message}")]
    Auth { operation: String, message: String },

    #[error("Throttled by provider during {operation}: {message}")]
    Throttled { operation: String, message: String },

    #[error("Transport error during {operation}: {message}")]
    Transport {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Provider API error during {operation}: {code} - {message}")]
    Api {
        operation: String,
        code: String,
        message: String,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CheckError>;

/// Whether running the same operation again could succeed.
///
/// Nothing in this crate retries; the flag is for callers that wrap a run.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for CheckError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckError::Throttled { .. } | CheckError::Transport { .. }
        )
    }
}

/// Broad cause of a provider-side failure, derived from its error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    Auth,
    Throttled,
    Other,
}

/// Classify an EC2 service error code.
///
/// Codes are matched exactly; anything unrecognized is `Other`.
pub fn classify_error_code(code: &str) -> ProviderFailure {
    match code {
        "AuthFailure"
        | "UnauthorizedOperation"
        | "InvalidClientTokenId"
        | "ExpiredToken"
        | "RequestExpired"
        | "SignatureDoesNotMatch"
        | "OptInRequired" => ProviderFailure::Auth,
        "RequestLimitExceeded" | "Throttling" | "ThrottlingException" => {
            ProviderFailure::Throttled
        }
        _ => ProviderFailure::Other,
    }
}

impl CheckError {
    /// Build the typed error for a service error code returned by the provider
    pub fn from_provider_code(
        operation: impl Into<String>,
        code: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        let operation = operation.into();
        let message = message.into();
        match code.map(classify_error_code) {
            Some(ProviderFailure::Auth) => CheckError::Auth { operation, message },
            Some(ProviderFailure::Throttled) => CheckError::Throttled { operation, message },
            Some(ProviderFailure::Other) | None => CheckError::Api {
                operation,
                code: code.unwrap_or("Unknown").to_string(),
                message,
            },
        }
    }
}
