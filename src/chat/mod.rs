//! Text chat widget: full-history requests to a text-generation endpoint

mod client;
mod conversation;

pub use client::{GeminiTextClient, TextGenerator};
pub use conversation::{transcript, ChatTurn, Conversation, PendingReply, Role};
