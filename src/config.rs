use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/voice-demo";

const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
const REST_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub voice: VoiceConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// Websocket URL of the realtime voice endpoint
    pub endpoint: String,
    pub model: String,
    /// Persona id from the built-in catalog
    pub persona: String,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    /// Samples per outbound frame
    pub frame_size: usize,
    pub channels: u16,
    pub open_timeout_secs: u64,
}

impl VoiceConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            endpoint: LIVE_ENDPOINT.to_string(),
            model: "gemini-2.0-flash-live-001".to_string(),
            persona: "receptionist".to_string(),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_size: 4096,
            channels: 1,
            open_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// REST base URL of the text-generation endpoint
    pub endpoint: String,
    pub model: String,
    pub persona: String,
    /// Agent turn shown when a chat request fails
    pub fallback_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: REST_ENDPOINT.to_string(),
            model: "gemini-2.0-flash".to_string(),
            persona: "assistant".to_string(),
            fallback_message: "Sorry, I can't reply right now. The chat service isn't configured \
                correctly; please check the API key and try again."
                .to_string(),
        }
    }
}

impl Config {
    /// Defaults, then the optional file at `path`, then `VOICE_DEMO__*` env vars
    pub fn load(path: &str) -> Result<Self> {
        let voice = VoiceConfig::default();
        let chat = ChatConfig::default();

        let settings = config::Config::builder()
            .set_default("service.name", "voice-demo")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8080)?
            .set_default("voice.endpoint", voice.endpoint)?
            .set_default("voice.model", voice.model)?
            .set_default("voice.persona", voice.persona)?
            .set_default("voice.input_sample_rate", voice.input_sample_rate as i64)?
            .set_default("voice.output_sample_rate", voice.output_sample_rate as i64)?
            .set_default("voice.frame_size", voice.frame_size as i64)?
            .set_default("voice.channels", voice.channels as i64)?
            .set_default("voice.open_timeout_secs", voice.open_timeout_secs as i64)?
            .set_default("chat.endpoint", chat.endpoint)?
            .set_default("chat.model", chat.model)?
            .set_default("chat.persona", chat.persona)?
            .set_default("chat.fallback_message", chat.fallback_message)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOICE_DEMO").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Credential shared by both endpoints; never read from the config file
pub fn credential_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
