//! Gateway-specific error types.

use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while talking to the external platform.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No platform credentials are configured; nothing can be requested.
    #[error("gateway is not configured with platform credentials")]
    Unconfigured,

    /// The identity provider rejected or failed the token request.
    #[error("token acquisition failed: {0}")]
    Token(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("platform returned {status} for {operation}")]
    Status { status: u16, operation: &'static str },

    /// The platform answered with a body we could not decode.
    #[error("failed to decode platform response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether the failure means the gateway holds no usable token.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::Unconfigured | Self::Token(_) | Self::Status { status: 401, .. }
        )
    }
}
