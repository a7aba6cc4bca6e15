use super::types::{
    user_content, CountTokensRequest, CountTokensResponse, GenerateContentRequest,
    GenerateContentResponse,
};
use crate::ai::client::VertexHttpClient;
use crate::ai::stream::{self, StreamEnd};
use crate::ai::{render, resolve_parameters, ModelAdapter, Output};
use crate::models::{Config, OutputFormat};
use crate::prompt::PromptPart;
use crate::Result;
use async_trait::async_trait;
use futures::Stream;
use serde_json::{json, Value};
use std::io::Write;
use tokio_util::sync::CancellationToken;

const FAMILY: &str = "Gemini";
const PUBLISHER: &str = "google";

/// Gemini models via `generateContent`, `streamGenerateContent` and `countTokens`.
#[derive(Debug, Default, Clone)]
pub struct GeminiAdapter;

impl GeminiAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Request body for one user turn. Parameters become `generationConfig`.
    pub fn build_request(
        parts: &[PromptPart],
        params: crate::models::ModelParameters,
    ) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![user_content(parts)],
            generation_config: if params.is_empty() {
                None
            } else {
                Some(params)
            },
        }
    }

    async fn stream_content(
        &self,
        ctx: &CancellationToken,
        http: &VertexHttpClient,
        model: &str,
        config: &Config,
        request: &GenerateContentRequest,
        out: Output<'_>,
    ) -> Result<()> {
        let path = format!(
            "{}:streamGenerateContent?alt=sse",
            http.model_path(PUBLISHER, model)
        );
        let response = http.post_stream(ctx, &path, request).await?;
        render_stream(ctx, Box::pin(response.bytes_stream()), config, out).await
    }
}

/// Print each streamed chunk as it arrives, then a final newline in text mode.
///
/// Cancellation stops reading and keeps what was already printed.
async fn render_stream<S, B, E>(
    ctx: &CancellationToken,
    chunks: S,
    config: &Config,
    out: Output<'_>,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<crate::Error>,
{
    let mut wrote_text = false;
    let end = stream::consume(ctx, chunks, |chunk: Value| {
        match config.output_format() {
            OutputFormat::Json => {
                writeln!(out, "{}", serde_json::to_string_pretty(&chunk)?)?;
            }
            OutputFormat::Text => {
                let parsed: GenerateContentResponse = serde_json::from_value(chunk)?;
                match parsed.first_text() {
                    Some(text) => {
                        write!(out, "{}", text)?;
                        wrote_text = true;
                    }
                    None => tracing::debug!("Stream chunk without candidate text"),
                }
            }
        }
        out.flush()?;
        Ok(())
    })
    .await?;

    if config.output_format() == OutputFormat::Text {
        if !wrote_text && end == StreamEnd::Exhausted {
            tracing::warn!("{} returned no candidates", FAMILY);
        }
        writeln!(out)?;
    }
    if end == StreamEnd::Cancelled {
        tracing::warn!("{} stream cancelled", FAMILY);
    }
    Ok(())
}

#[async_trait]
impl ModelAdapter for GeminiAdapter {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn supports_multimodal(&self) -> bool {
        true
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

        let params = resolve_parameters(config, json!({}))?;
        let request = Self::build_request(parts, params);
        let http = VertexHttpClient::connect(config, FAMILY).await?;

        if config.stream() {
            return self
                .stream_content(ctx, &http, model, config, &request, out)
                .await;
        }

        let path = format!("{}:generateContent", http.model_path(PUBLISHER, model));
        let raw = http.post_json(ctx, &path, &request).await?;
        let response: GenerateContentResponse = serde_json::from_value(raw.clone())?;

        render(out, config, FAMILY, &raw, response.first_text())
    }

    async fn count_tokens(
        &self,
        ctx: &CancellationToken,
        model: &str,
        config: &Config,
        parts: &[PromptPart],
        out: Output<'_>,
    ) -> Result<()> {
        let request = CountTokensRequest {
            contents: vec![user_content(parts)],
        };
        let http = VertexHttpClient::connect(config, FAMILY).await?;
        let path = format!("{}:countTokens", http.model_path(PUBLISHER, model));
        let raw = http.post_json(ctx, &path, &request).await?;

        match config.output_format() {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&raw)?)?,
            OutputFormat::Text => {
                let counted: CountTokensResponse = serde_json::from_value(raw)?;
                tracing::debug!(
                    "billable characters: {:?}",
                    counted.total_billable_characters
                );
                writeln!(out, "Number of tokens for the prompt: {}", counted.total_tokens)?;
            }
        }
        Ok(())
    }
}
