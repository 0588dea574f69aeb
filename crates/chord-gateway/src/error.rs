//! Gateway error types

use chord_common::ClientError;

/// Close code reported when the connection drops without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Transport-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed with code {code}")]
    Closed { code: u16 },

    #[error("connection is not open")]
    NotConnected,

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("timed out waiting for the gateway")]
    Timeout,
}

impl TransportError {
    /// Close code carried by this error; anything but a clean close counts as abnormal
    #[must_use]
    pub fn close_code(&self) -> u16 {
        match self {
            Self::Closed { code } => *code,
            _ => ABNORMAL_CLOSURE,
        }
    }
}

/// Errors that end a gateway run
///
/// Stored by the connection once it reaches `Failed` and returned by every
/// later poll, hence `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("connectivity lost: {0}")]
    Connectivity(String),
}

impl GatewayError {
    /// Get a stable error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Authentication(_) => "AUTHENTICATION_FAILED",
            Self::Connectivity(_) => "CONNECTIVITY_LOST",
        }
    }
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Transport(e) => Self::Transport(e.to_string()),
            GatewayError::Authentication(msg) => Self::Authentication(msg),
            GatewayError::Connectivity(msg) => Self::Connectivity(msg),
        }
    }
}

/// Failure to turn a dispatch payload into a typed event
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("failed to decode {event} payload: {source}")]
    Decode {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code() {
        assert_eq!(TransportError::Closed { code: 4004 }.close_code(), 4004);
        assert_eq!(TransportError::Timeout.close_code(), ABNORMAL_CLOSURE);
    }

    #[test]
    fn test_into_client_error() {
        let err: ClientError = GatewayError::Authentication("invalid token".into()).into();
        assert!(err.is_terminal());
        assert_eq!(err.error_code(), "AUTHENTICATION_FAILED");

        let err: ClientError = GatewayError::Transport(TransportError::NotConnected).into();
        assert!(err.is_retryable());
    }
}
