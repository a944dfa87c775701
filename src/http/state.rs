use crate::chat::Conversation;
use crate::session::VoiceSession;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one voice session of this instance
    pub voice: VoiceSession,
    /// The text-chat conversation
    pub chat: Arc<Mutex<Conversation>>,
}

impl AppState {
    pub fn new(voice: VoiceSession, chat: Conversation) -> Self {
        Self {
            voice,
            chat: Arc::new(Mutex::new(chat)),
        }
    }
}
