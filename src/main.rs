use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_demo::audio::default_devices;
use voice_demo::config::{credential_from_env, DEFAULT_CONFIG_PATH};
use voice_demo::{persona, create_router, AppState, Config, Conversation, GeminiTextClient, VoiceSession, WebSocketConnector};

#[derive(Debug, Parser)]
#[command(name = "voice-demo", about = "Backend for the voice-call and chat demo widgets")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let credential = credential_from_env();
    if credential.is_none() {
        warn!("GEMINI_API_KEY is not set; voice and chat requests will report a configuration error");
    }

    let devices = default_devices();
    if !devices.is_available() {
        warn!("No audio devices found; the voice demo will be unavailable");
    }

    let connector = Arc::new(WebSocketConnector::new(cfg.voice.endpoint.clone()));
    let voice = VoiceSession::new(cfg.voice.clone(), credential.clone(), connector, devices);

    let generator = Arc::new(GeminiTextClient::new(&cfg.chat.endpoint, &cfg.chat.model, credential)?);
    let chat = Conversation::new(
        generator,
        persona::find(&cfg.chat.persona),
        cfg.chat.fallback_message.clone(),
    );

    let state = AppState::new(voice.clone(), chat);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutting down");
    voice.stop().await;

    Ok(())
}
