//! Anthropic Claude models on Vertex AI via `:rawPredict`.

use crate::ai::client::VertexHttpClient;
use crate::ai::{param_f64, param_u64, render, resolve_parameters, ModelAdapter, Output};
use crate::models::{Config, ModelParameters};
use crate::prompt::{self, PromptPart};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;

const FAMILY: &str = "Anthropic";
const PUBLISHER: &str = "anthropic";
pub const ANTHROPIC_VERSION: &str = "vertex-2023-10-16";
const DEFAULT_MAX_TOKENS: u64 = 256;

#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    pub anthropic_version: String,
    pub max_tokens: u64,
    pub messages: Vec<AnthropicMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Vec<AnthropicContent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub id: Option<String>,
    #[serde(default)]
    pub content: Vec<AnthropicContent>,
    pub stop_reason: Option<String>,
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl AnthropicResponse {
    /// Text blocks joined with a single space; `None` when there are none.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(" "))
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AnthropicAdapter;

impl AnthropicAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn build_request(prompt: String, params: &ModelParameters) -> AnthropicRequest {
        AnthropicRequest {
            anthropic_version: ANTHROPIC_VERSION.to_string(),
            max_tokens: param_u64(params, &["maxTokens", "maxOutputTokens", "max_tokens"])
                .unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: vec![AnthropicContent {
                    content_type: "text".to_string(),
                    text: prompt,
                }],
            }],
            stream: false,
            temperature: param_f64(params, &["temperature"]),
            top_p: param_f64(params, &["topP", "top_p"]),
            top_k: param_u64(params, &["topK", "top_k"]),
        }
    }
}

#[async_trait]
impl ModelAdapter for AnthropicAdapter {
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
        let request = Self::build_request(text, &params);

        let http = VertexHttpClient::connect(config, FAMILY).await?;
        let path = format!("{}:rawPredict", http.model_path(PUBLISHER, model));
        let raw = http.post_json(ctx, &path, &request).await?;
        let response: AnthropicResponse = serde_json::from_value(raw.clone())?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "usage: {} input / {} output tokens",
                usage.input_tokens,
                usage.output_tokens
            );
        }

        render(out, config, FAMILY, &raw, response.text())
    }
}
