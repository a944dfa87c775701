use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::DemoError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A single-shot text-generation endpoint
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String, DemoError>;
}

/// `generateContent` REST client
pub struct GeminiTextClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    credential: Option<String>,
}

impl GeminiTextClient {
    pub fn new(endpoint: &str, model: &str, credential: Option<String>) -> Result<Self, DemoError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            credential,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: RequestContent<'a>,
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiTextClient {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String, DemoError> {
        let credential = self.credential.as_deref().ok_or(DemoError::MissingCredential)?;

        let body = GenerateRequest {
            system_instruction: RequestContent {
                role: None,
                parts: vec![RequestPart {
                    text: system_instruction,
                }],
            },
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!("Sending chat request to {} ({} chars)", self.url(), prompt.len());

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", credential)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;

        response
            .text()
            .ok_or_else(|| DemoError::Request("response contained no text".to_string()))
    }
}
