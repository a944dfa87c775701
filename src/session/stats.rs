use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::state::SessionState;

/// Statistics about the current (or last) voice session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Identifier of the current or most recent session
    pub session_id: Option<String>,

    pub state: SessionState,

    /// False when the environment has no audio devices
    pub available: bool,

    /// When the current or most recent session started
    pub started_at: Option<DateTime<Utc>>,

    /// When that session was released; unset while it is still open
    pub ended_at: Option<DateTime<Utc>>,

    /// Seconds from `started_at` to `ended_at`, or to now while open
    pub duration_secs: f64,

    /// Audio frames handed to the transport
    pub frames_sent: u64,

    /// Inbound audio chunks scheduled for playback
    pub chunks_scheduled: u64,

    /// Tool calls answered
    pub tool_calls: u64,

    /// Message of the failure that put the session into `error`
    pub last_error: Option<String>,
}

/// Live counters shared by the session's tasks
#[derive(Debug, Default)]
pub struct SessionCounters {
    pub frames_sent: AtomicU64,
    pub chunks_scheduled: AtomicU64,
    pub tool_calls: AtomicU64,
}

impl SessionCounters {
    pub fn reset(&self) {
        self.frames_sent.store(0, Ordering::SeqCst);
        self.chunks_scheduled.store(0, Ordering::SeqCst);
        self.tool_calls.store(0, Ordering::SeqCst);
    }
}
