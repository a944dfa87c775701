//! Realtime voice endpoint protocol
//!
//! - `messages`: JSON wire types and decoding into `InboundEvent`s
//! - `link`: the connector trait and the queue pair an open session exposes
//! - `websocket`: the websocket connector used in production

pub mod link;
pub mod messages;
mod websocket;

pub use link::{LinkTasks, RealtimeConnector, RealtimeLink, OUTBOUND_QUEUE_DEPTH};
pub use messages::{ClientMessage, FunctionCall, InboundEvent, ServerMessage, SetupMessage};
pub use websocket::WebSocketConnector;
