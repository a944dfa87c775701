use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

use super::stats::SessionCounters;
use crate::audio::{EncodedFrame, FrameSink};
use crate::error::DemoError;
use crate::realtime::ClientMessage;

/// Send side of an open realtime session
///
/// Holds the outbound queue until `deactivate`; afterwards every send is a
/// silent no-op so late capture frames never fail.
pub struct SessionTransport {
    outbound: Mutex<Option<mpsc::Sender<ClientMessage>>>,
    counters: Arc<SessionCounters>,
}

impl SessionTransport {
    pub fn new(outbound: mpsc::Sender<ClientMessage>, counters: Arc<SessionCounters>) -> Self {
        Self {
            outbound: Mutex::new(Some(outbound)),
            counters,
        }
    }

    /// Queue one audio frame; returns false if it was dropped
    pub async fn send_audio_frame(&self, frame: EncodedFrame) -> bool {
        let sequence = frame.sequence;
        let Some(sender) = self.sender() else {
            debug!("Dropping frame {} after close", sequence);
            return false;
        };

        if sender.send(frame.into()).await.is_err() {
            debug!("Dropping frame {}: connection gone", sequence);
            return false;
        }
        self.counters.frames_sent.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Acknowledge a tool call so the remote agent can continue
    pub async fn send_tool_response(&self, id: &str, name: &str, result: &str) -> Result<(), DemoError> {
        let sender = self
            .sender()
            .ok_or_else(|| DemoError::Closed("session closed before tool response".to_string()))?;

        sender
            .send(ClientMessage::tool_result(id, name, result))
            .await
            .map_err(|_| DemoError::Closed("connection gone before tool response".to_string()))
    }

    /// Stop accepting sends and release the outbound queue
    pub fn deactivate(&self) {
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }

    pub fn is_active(&self) -> bool {
        self.sender().is_some()
    }

    fn sender(&self) -> Option<mpsc::Sender<ClientMessage>> {
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl FrameSink for SessionTransport {
    async fn send_frame(&self, frame: EncodedFrame) {
        self.send_audio_frame(frame).await;
    }
}
