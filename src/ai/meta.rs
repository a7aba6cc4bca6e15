//! Meta Llama models served through the OpenAI-compatible chat completions
//! endpoint of Vertex AI.

use crate::ai::client::VertexHttpClient;
use crate::ai::{param_f64, param_u64, render, resolve_parameters, ModelAdapter, Output};
use crate::models::{Config, ModelParameters};
use crate::prompt::{self, PromptPart};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;

const FAMILY: &str = "Meta";
const PUBLISHER: &str = "meta";
const DEFAULT_MAX_TOKENS: u64 = 256;

/// Request body for chat completions.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

impl ChatCompletionResponse {
    pub fn first_text(&self) -> Option<String> {
        self.choices.first()?.message.content.clone()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MetaAdapter;

impl MetaAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn build_request(model: &str, prompt: String, params: &ModelParameters) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: format!("{}/{}", PUBLISHER, model),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt),
            }],
            max_tokens: param_u64(params, &["maxTokens", "maxOutputTokens", "max_tokens"])
                .unwrap_or(DEFAULT_MAX_TOKENS),
            stream: false,
            temperature: param_f64(params, &["temperature"]),
            top_p: param_f64(params, &["topP", "top_p"]),
            top_k: param_u64(params, &["topK", "top_k"]),
        }
    }
}

#[async_trait]
impl ModelAdapter for MetaAdapter {
    fn family(&self) -> &'static str {
        FAMILY
    }

    async fn generate_content(
        &self,
        ctx: &CancellationToken,
        model: &str,
        config: &Config,
        parts: &[PromptPart],
        out: Output<'_>,
    ) -> Result<()> {
        tracing::info!("{} [{}]", FAMILY, model);

        let text = prompt::joined_text(parts, FAMILY)?;
        let params = resolve_parameters(config, json!({ "maxOutputTokens": DEFAULT_MAX_TOKENS }))?;
        let request = Self::build_request(model, text, &params);

        let http = VertexHttpClient::connect(config, FAMILY).await?;
        let path = format!("{}/chat/completions", http.openapi_path());
        let raw = http.post_json(ctx, &path, &request).await?;
        let response: ChatCompletionResponse = serde_json::from_value(raw.clone())?;

        if let Some(reason) = response.choices.first().and_then(|c| c.finish_reason.as_deref()) {
            tracing::debug!("finish reason: {}", reason);
        }

        render(out, config, FAMILY, &raw, response.first_text())
    }
}
