//! Domain-level error taxonomy for the SM gateway.

/// Errors that escape the gateway core.
///
/// Everything else (blocked pre-checks, protocol failures, probe failures,
/// store outages) is reported as data in a result envelope.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid action: {action}")]
    InvalidAction { action: String },

    #[error("invalid error code: {0}")]
    InvalidErrorCode(String),

    #[error("http client setup failed: {0}")]
    HttpClient(String),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
