//! Connection state and the reconnect decision

use serde::Serialize;

/// WebSocket close code for a normal closure
pub const CLOSE_NORMAL: u16 = 1000;
/// WebSocket close code for an endpoint going away
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Reported when the peer closed without a status code
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Reported when the socket dropped without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Lifecycle of the command channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Validating,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    /// A connection attempt or a live socket exists
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

/// Decide whether a closed socket should be retried.
///
/// Intentional closures never are. Otherwise a normal or going-away code is
/// accepted as final, unless a revalidation is still owed.
pub fn should_reconnect(code: u16, intentional: bool, revalidation_pending: bool) -> bool {
    if intentional {
        return false;
    }
    let expected_shutdown = code == CLOSE_NORMAL || code == CLOSE_GOING_AWAY;
    !expected_shutdown || revalidation_pending
}
