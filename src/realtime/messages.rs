use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::audio::codec;
use crate::audio::EncodedFrame;
use crate::error::DemoError;

pub const SUBMIT_LEAD: &str = "submit_lead";

// ============================================================================
// Outbound
// ============================================================================

/// Messages sent to the realtime endpoint (one JSON object per frame)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(SetupMessage),
    RealtimeInput(RealtimeInput),
    ToolResponse(ToolResponse),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub tools: Vec<Tool>,
}

impl SetupMessage {
    /// Audio-only responses, the given voice and persona, and the lead tool
    pub fn new(model: &str, voice_name: &str, system_instruction: &str) -> Self {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };

        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceSelection {
                        prebuilt_voice_config: PrebuiltVoice {
                            voice_name: voice_name.to_string(),
                        },
                    },
                },
            },
            system_instruction: Content::text(system_instruction),
            tools: vec![Tool {
                function_declarations: vec![submit_lead_declaration()],
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceSelection,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    pub prebuilt_voice_config: PrebuiltVoice,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoice {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

impl Content {
    pub fn text(text: &str) -> Self {
        Self {
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Schema of the lead-capture tool the agent calls when it has collected everything
pub fn submit_lead_declaration() -> FunctionDeclaration {
    FunctionDeclaration {
        name: SUBMIT_LEAD.to_string(),
        description: "Submit the caller's contact details and request once they have been confirmed."
            .to_string(),
        parameters: json!({
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING", "description": "Caller's full name" },
                "phone": { "type": "STRING", "description": "Callback phone number" },
                "summary": { "type": "STRING", "description": "One-sentence summary of the request" }
            },
            "required": ["name", "phone", "summary"]
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

impl From<EncodedFrame> for ClientMessage {
    fn from(frame: EncodedFrame) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: frame.mime_type,
                data: frame.data,
            }],
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: ToolResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub result: String,
}

impl ClientMessage {
    pub fn tool_result(id: &str, name: &str, result: &str) -> Self {
        ClientMessage::ToolResponse(ToolResponse {
            function_responses: vec![FunctionResponse {
                id: id.to_string(),
                name: name.to_string(),
                response: ToolResult {
                    result: result.to_string(),
                },
            }],
        })
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Raw message from the realtime endpoint; exactly one field is normally set
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCallMessage>,
    pub go_away: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub inline_data: Option<MediaChunk>,
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallMessage {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Decoded inbound event, in the order the server produced it
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    SetupComplete,
    /// Raw PCM16 LE bytes of model speech
    Audio(Vec<u8>),
    ToolCall(FunctionCall),
    /// The model stopped speaking because the user barged in
    Interrupted,
    TurnComplete,
    /// The server is about to drop the connection
    GoAway(String),
}

impl ServerMessage {
    pub fn parse(payload: &[u8]) -> Result<Self, DemoError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Flatten into events; an undecodable audio part is skipped on its own
    pub fn into_events(self) -> Vec<InboundEvent> {
        let mut events = Vec::new();

        if self.setup_complete.is_some() {
            events.push(InboundEvent::SetupComplete);
        }

        if let Some(content) = self.server_content {
            if content.interrupted {
                events.push(InboundEvent::Interrupted);
            }
            let parts = content.model_turn.map(|turn| turn.parts).unwrap_or_default();
            for part in parts {
                let Some(media) = part.inline_data else {
                    continue;
                };
                if !media.mime_type.starts_with("audio/") {
                    continue;
                }
                match codec::decode_payload(&media.data) {
                    Ok(bytes) => events.push(InboundEvent::Audio(bytes)),
                    Err(e) => warn!("Skipping undecodable audio part: {}", e),
                }
            }
            if content.turn_complete {
                events.push(InboundEvent::TurnComplete);
            }
        }

        if let Some(tool_call) = self.tool_call {
            events.extend(tool_call.function_calls.into_iter().map(InboundEvent::ToolCall));
        }

        if let Some(go_away) = self.go_away {
            events.push(InboundEvent::GoAway(go_away.to_string()));
        }

        events
    }
}
