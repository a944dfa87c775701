//! HTTP API consumed by the marketing site's widgets
//!
//! - POST /voice/start - Start the voice demo
//! - POST /voice/stop - Stop the voice demo
//! - GET /voice/status - Session state and statistics
//! - GET /voice/lead - Most recent captured lead
//! - GET /chat - Chat history
//! - POST /chat - Send a chat message
//! - GET /personas - Persona catalog
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
