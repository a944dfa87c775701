use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use super::link::{LinkTasks, RealtimeConnector, RealtimeLink, OUTBOUND_QUEUE_DEPTH};
use super::messages::{ClientMessage, InboundEvent, ServerMessage, SetupMessage};
use crate::error::DemoError;

/// Realtime voice sessions over a websocket, credential passed as `key`
pub struct WebSocketConnector {
    endpoint: String,
}

impl WebSocketConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    fn url(&self, credential: &str) -> String {
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}key={}", self.endpoint, sep, credential)
    }
}

#[async_trait::async_trait]
impl RealtimeConnector for WebSocketConnector {
    async fn connect(&self, credential: &str, setup: SetupMessage) -> Result<RealtimeLink, DemoError> {
        info!("Connecting to realtime endpoint {}", self.endpoint);

        let (ws, _response) = tokio_tungstenite::connect_async(self.url(credential))
            .await
            .map_err(|e| DemoError::Connect(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let setup_json = serde_json::to_string(&ClientMessage::Setup(setup))?;
        sink.send(Message::Text(setup_json))
            .await
            .map_err(|e| DemoError::Transport(e.to_string()))?;

        await_setup_complete(&mut stream).await?;
        info!("Realtime session setup complete");

        let (out_tx, mut out_rx) = mpsc::channel::<ClientMessage>(OUTBOUND_QUEUE_DEPTH);
        let (in_tx, in_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to serialize outbound message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!("Realtime socket write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Realtime writer stopped");
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let payload = match msg {
                    Ok(Message::Text(text)) => text.into_bytes(),
                    Ok(Message::Binary(bytes)) => bytes,
                    Ok(Message::Close(frame)) => {
                        let reason = frame
                            .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                            .unwrap_or_else(|| "no close frame".to_string());
                        let _ = in_tx.send(Err(DemoError::Closed(reason))).await;
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = in_tx.send(Err(DemoError::Transport(e.to_string()))).await;
                        return;
                    }
                };

                let events = match ServerMessage::parse(&payload).map(ServerMessage::into_events) {
                    Ok(events) => events,
                    Err(e) => {
                        warn!("Skipping malformed server message: {}", e);
                        continue;
                    }
                };
                for event in events {
                    if in_tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
            }
            let _ = in_tx
                .send(Err(DemoError::Closed("stream ended".to_string())))
                .await;
        });

        Ok(RealtimeLink {
            outbound: out_tx,
            inbound: in_rx,
            io: LinkTasks::new(reader, writer),
        })
    }
}

/// Wait for `setupComplete`; a close before it means the server refused the session
async fn await_setup_complete<S>(stream: &mut S) -> Result<(), DemoError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        let payload = match msg {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .unwrap_or_else(|| "connection closed during setup".to_string());
                return Err(DemoError::Rejected(reason));
            }
            Ok(_) => continue,
            Err(e) => return Err(DemoError::Transport(e.to_string())),
        };

        let events = ServerMessage::parse(&payload)?.into_events();
        if events.contains(&InboundEvent::SetupComplete) {
            return Ok(());
        }
        debug!("Ignoring {} events received before setup completed", events.len());
    }

    Err(DemoError::Rejected("connection closed during setup".to_string()))
}
