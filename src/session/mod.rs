//! Realtime voice session management
//!
//! This module provides the `VoiceSession` abstraction that manages:
//! - The connection to the remote voice endpoint
//! - Microphone capture and in-order frame delivery
//! - Gapless playback of streamed model audio
//! - Tool-call acknowledgment and lead capture
//! - Session state and statistics

mod session;
mod state;
mod stats;
mod transport;

pub use session::VoiceSession;
pub use state::SessionState;
pub use stats::{SessionCounters, SessionStats};
pub use transport::SessionTransport;
