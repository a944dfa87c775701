use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

use super::client::TextGenerator;
use crate::error::DemoError;
use crate::persona::Persona;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Agent => "Agent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            text: text.into(),
        }
    }
}

/// Text-chat history; every request carries the whole conversation
pub struct Conversation {
    generator: Arc<dyn TextGenerator>,
    persona: &'static Persona,
    fallback_message: String,
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new(generator: Arc<dyn TextGenerator>, persona: &'static Persona, fallback_message: String) -> Self {
        let turns = persona.greeting.map(ChatTurn::agent).into_iter().collect();
        Self {
            generator,
            persona,
            fallback_message,
            turns,
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Append the user's message and the agent's reply
    ///
    /// Blank messages are ignored. Callers that share the conversation
    /// behind a lock should use `begin_turn` and `finish_turn` instead so
    /// the lock is not held during the request.
    pub async fn submit(&mut self, message: &str) -> Option<ChatTurn> {
        let pending = self.begin_turn(message)?;
        let outcome = pending.send().await;
        Some(self.finish_turn(outcome))
    }

    /// Record the user's message and prepare the request for it
    pub fn begin_turn(&mut self, message: &str) -> Option<PendingReply> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }

        self.turns.push(ChatTurn::user(message));
        Some(PendingReply {
            generator: Arc::clone(&self.generator),
            system_instruction: self.persona.system_instruction,
            prompt: transcript(&self.turns),
        })
    }

    /// Append the agent's reply, or the fallback message if the request failed
    ///
    /// A failed request is not retried and the rest of the history is untouched.
    pub fn finish_turn(&mut self, outcome: Result<String, DemoError>) -> ChatTurn {
        let reply = match outcome {
            Ok(text) => {
                info!("Chat reply received ({} chars)", text.len());
                ChatTurn::agent(text)
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                ChatTurn::agent(self.fallback_message.clone())
            }
        };

        self.turns.push(reply.clone());
        reply
    }
}

/// A request for the next reply, detached from the conversation it came from
pub struct PendingReply {
    generator: Arc<dyn TextGenerator>,
    system_instruction: &'static str,
    prompt: String,
}

impl PendingReply {
    pub async fn send(self) -> Result<String, DemoError> {
        self.generator.generate(self.system_instruction, &self.prompt).await
    }
}

/// Flatten the history into `Role: text` lines
pub fn transcript(turns: &[ChatTurn]) -> String {
    let mut out = String::new();
    for turn in turns {
        let _ = writeln!(out, "{}: {}", turn.role.label(), turn.text);
    }
    out
}
