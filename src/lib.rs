pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod http;
pub mod lead;
pub mod persona;
pub mod realtime;
pub mod session;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioDevices, AudioFrame, AudioOutput, CapturePipeline,
    EncodedFrame, FrameSink, PlaybackChunk, PlaybackHandle, PlaybackScheduler,
};
pub use chat::{ChatTurn, Conversation, GeminiTextClient, Role, TextGenerator};
pub use config::Config;
pub use error::{DemoError, ErrorKind};
pub use http::{create_router, AppState};
pub use lead::{LeadRecord, LeadStore};
pub use persona::Persona;
pub use realtime::{ClientMessage, InboundEvent, RealtimeConnector, RealtimeLink, WebSocketConnector};
pub use session::{SessionState, SessionStats, VoiceSession};
