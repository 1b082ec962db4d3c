use thiserror::Error;

/// Adapter-level failure taxonomy.
///
/// `Capture` is a terminal business decline (never retried against the
/// ledger); `Transport` and `Provider` are transport-level and retryable by
/// the client; `Signature` rejects an untrusted callback outright.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Callback payload failed authenticity verification.
    #[error("invalid callback signature: {0}")]
    Signature(String),

    /// Provider reported a terminal, non-completed capture status.
    #[error("capture declined with status {status}")]
    Capture { status: String },

    /// Network/transport failure talking to the provider.
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success HTTP status.
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// Provider payload could not be interpreted.
    #[error("undecodable provider payload: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn signature(msg: impl Into<String>) -> Self {
        Self::Signature(msg.into())
    }
}
