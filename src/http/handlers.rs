use super::state::AppState;
use crate::chat::ChatTurn;
use crate::error::ErrorKind;
use crate::persona::PERSONAS;
use crate::session::{SessionState, SessionStats};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub state: SessionState,
    pub available: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub state: SessionState,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /voice/start
/// Start the voice demo (any open session is torn down first)
pub async fn start_voice(State(state): State<AppState>) -> impl IntoResponse {
    info!("Voice demo start requested");

    match state.voice.start().await {
        Ok(()) => {
            let available = state.voice.is_available();
            let message = if available {
                format!("Talking to {}", state.voice.persona().display_name)
            } else {
                "Voice demo is not available in this environment".to_string()
            };
            (
                StatusCode::OK,
                Json(VoiceResponse {
                    state: state.voice.state(),
                    available,
                    message,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start voice demo: {}", e);
            let status = match e.kind() {
                ErrorKind::Precondition => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Transport | ErrorKind::Request => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                    state: state.voice.state(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /voice/stop
/// Stop the voice demo; always succeeds
pub async fn stop_voice(State(state): State<AppState>) -> impl IntoResponse {
    state.voice.stop().await;

    (
        StatusCode::OK,
        Json(VoiceResponse {
            state: state.voice.state(),
            available: state.voice.is_available(),
            message: "Voice demo stopped".to_string(),
        }),
    )
}

/// GET /voice/status
pub async fn voice_status(State(state): State<AppState>) -> Json<SessionStats> {
    Json(state.voice.stats())
}

/// GET /voice/lead
/// Most recent lead captured by the agent
pub async fn latest_lead(State(state): State<AppState>) -> impl IntoResponse {
    match state.voice.leads().latest().await {
        Some(lead) => (StatusCode::OK, Json(lead)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse {
                message: "No lead captured yet".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /chat
pub async fn chat_history(State(state): State<AppState>) -> Json<Vec<ChatTurn>> {
    let chat = state.chat.lock().await;
    Json(chat.turns().to_vec())
}

/// POST /chat
/// Send a message; a failed request still answers with the fallback turn
///
/// The conversation is only locked to record the turns, never while the
/// request is outstanding, so `GET /chat` keeps answering.
pub async fn send_chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    let pending = state.chat.lock().await.begin_turn(&req.message);

    let Some(pending) = pending else {
        return (
            StatusCode::BAD_REQUEST,
            Json(MessageResponse {
                message: "Message is empty".to_string(),
            }),
        )
            .into_response();
    };

    let outcome = pending.send().await;
    let reply = state.chat.lock().await.finish_turn(outcome);

    (StatusCode::OK, Json(reply)).into_response()
}

/// GET /personas
pub async fn list_personas() -> impl IntoResponse {
    Json(PERSONAS)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
