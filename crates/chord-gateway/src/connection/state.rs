use serde::{Deserialize, Serialize};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No transport, nothing in progress
    #[default]
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for Hello
    AwaitingHello,
    /// Identify sent, waiting for READY
    Identifying,
    /// Resume sent, waiting for the replay to finish
    Resuming,
    /// Session established
    Connected,
    /// Transport lost, resume cycle in progress
    Reconnecting,
    /// Terminal; the stored error is returned to the caller
    Failed,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::AwaitingHello => "AWAITING_HELLO",
            Self::Identifying => "IDENTIFYING",
            Self::Resuming => "RESUMING",
            Self::Connected => "CONNECTED",
            Self::Reconnecting => "RECONNECTING",
            Self::Failed => "FAILED",
        }
    }

    /// Check if this state is terminal
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Check if a handshake is underway on an open transport
    #[must_use]
    pub const fn is_handshaking(self) -> bool {
        matches!(self, Self::AwaitingHello | Self::Identifying | Self::Resuming)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_flags() {
        assert!(ConnectionState::Failed.is_terminal());
        assert!(!ConnectionState::Reconnecting.is_terminal());
        assert!(ConnectionState::Resuming.is_handshaking());
        assert!(!ConnectionState::Connected.is_handshaking());
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(serde_json::to_string(&ConnectionState::AwaitingHello).unwrap(), r#""AWAITING_HELLO""#);
        assert_eq!(ConnectionState::Connected.to_string(), "CONNECTED");
    }
}
