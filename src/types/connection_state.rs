//! Connection lifecycle state

use std::fmt;
use std::time::Duration;

/// Observable state of the feed connection.
///
/// ```text
/// Disconnected -> Connecting -> Connected -> RetryPending -> Connecting -> ...
///                                         \-> Exhausted (after the last attempt)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and no retry scheduled (initial, or stopped on request)
    #[default]
    Disconnected,

    /// Connection attempt in flight (1-based attempt number)
    Connecting { attempt: u32 },

    /// Socket is open
    Connected,

    /// Disconnected, next attempt scheduled after `delay`
    RetryPending { attempt: u32, delay: Duration },

    /// Gave up after `attempts` consecutive failures; needs a manual reconnect
    Exhausted { attempts: u32 },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True when no further automatic progress will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Exhausted { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::RetryPending { attempt, delay } => {
                write!(f, "retrying in {}ms (attempt {attempt})", delay.as_millis())
            }
            ConnectionState::Exhausted { attempts } => {
                write!(f, "disconnected (gave up after {attempts} attempts)")
            }
        }
    }
}
