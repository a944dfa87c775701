use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::messages::{ClientMessage, InboundEvent, SetupMessage};
use crate::error::DemoError;

/// Outbound messages buffered ahead of the socket writer
pub const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// An established realtime session, split into message queues
///
/// The outbound queue is FIFO: frames and tool responses reach the socket
/// in the order they were queued.
pub struct RealtimeLink {
    pub outbound: mpsc::Sender<ClientMessage>,
    pub inbound: mpsc::Receiver<Result<InboundEvent, DemoError>>,
    pub io: LinkTasks,
}

/// Background tasks driving the socket
#[derive(Default)]
pub struct LinkTasks {
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl LinkTasks {
    pub fn new(reader: JoinHandle<()>, writer: JoinHandle<()>) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
        }
    }

    /// Stop reading immediately; the writer drains and closes the socket
    /// once every outbound sender is gone
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.writer.take();
    }
}

impl Drop for LinkTasks {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens realtime sessions against the remote voice endpoint
#[async_trait::async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Connect, send `setup`, and wait for the server to confirm it
    async fn connect(&self, credential: &str, setup: SetupMessage) -> Result<RealtimeLink, DemoError>;
}
