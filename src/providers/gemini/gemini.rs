use crate::config::ProviderConfig;
use crate::providers::traits::{ChatMessage, CompletionProvider, Role};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    model: String,
    api_url: String,
    temperature: f32,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.require_api_key("GOOGLE_API_KEY")?;

        Ok(Self {
            api_key: api_key.to_string(),
            client: Client::new(),
            model: config.model.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }

    /// Builds a `generateContent` body. System messages become the system
    /// instruction and assistant turns use Gemini's `model` role.
    pub(crate) fn request_body(messages: &[ChatMessage], temperature: f32) -> Value {
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                json!({
                    "role": role,
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": { "temperature": temperature }
        });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&Self::request_body(messages, self.temperature))
            .send()
            .await
            .map_err(|e| anyhow!("Gemini request failed: {}", e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read Gemini response: {}", e.without_url()))?;
        let parsed = serde_json::from_str::<Value>(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| truncate(&body, 200));
            return Err(anyhow!("Gemini request failed ({}): {}", status, message));
        }
        let response_json = parsed.map_err(|e| anyhow!("Invalid Gemini response: {}", e))?;

        response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Invalid response format"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
