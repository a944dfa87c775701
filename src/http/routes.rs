use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Voice demo control
        .route("/voice/start", post(handlers::start_voice))
        .route("/voice/stop", post(handlers::stop_voice))
        .route("/voice/status", get(handlers::voice_status))
        .route("/voice/lead", get(handlers::latest_lead))
        // Text chat
        .route("/chat", get(handlers::chat_history).post(handlers::send_chat))
        .route("/personas", get(handlers::list_personas))
        // The marketing pages are served from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
