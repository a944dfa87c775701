use serde::Serialize;
use std::fmt;

/// Lifecycle of the single voice session
///
/// `idle → connecting → connected → closing → idle`, with `error` reachable
/// from `connecting` or `connected` (via `closing`, so resources are always
/// released first). `stop` returns any state to `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Closing,
    Error,
}

impl SessionState {
    /// A session owns (or is acquiring) remote and device resources
    pub fn is_open(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Closing => "closing",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}
