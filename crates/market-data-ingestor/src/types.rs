use std::fmt;

/// Lifecycle of the feed channel.
///
/// `Disconnected -> Connecting -> Connected -> Closed { will_retry: true } -> Connecting -> ...`
/// The manager only reaches `Closed { will_retry: false }` when it is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closed { will_retry: bool },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Closed { will_retry: true } => write!(f, "closed (will retry)"),
            ConnectionState::Closed { will_retry: false } => write!(f, "closed"),
        }
    }
}
