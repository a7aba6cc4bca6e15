//! Model family adapters for the Vertex AI prediction service
//!
//! Each adapter turns prompt parts into its family's request shape, calls the
//! family's endpoint, and renders the response as text or raw JSON.

pub mod anthropic;
pub mod auth;
pub mod client;
pub mod gemini;
pub mod meta;
pub mod mime;
pub mod mock;
pub mod palm;
pub mod stream;

pub use anthropic::AnthropicAdapter;
pub use client::VertexHttpClient;
pub use gemini::GeminiAdapter;
pub use meta::MetaAdapter;
pub use mock::MockAdapter;
pub use palm::PaLMAdapter;

use crate::models::{merge_parameters, Config, ModelParameters, OutputFormat};
use crate::prompt::PromptPart;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Output sink shared by adapters; stdout in the binary, a buffer in tests.
pub type Output<'a> = &'a mut (dyn Write + Send);

#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Family name used in log banners and error messages.
    fn family(&self) -> &'static str;

    /// Whether prompt arguments may resolve to files, URLs and storage objects.
    fn supports_multimodal(&self) -> bool {
        false
    }

    async fn generate_content(
        &self,
        ctx: &CancellationToken,
        model: &str,
        config: &Config,
        parts: &[PromptPart],
        out: Output<'_>,
    ) -> Result<()>;

    async fn count_tokens(
        &self,
        _ctx: &CancellationToken,
        model: &str,
        _config: &Config,
        _parts: &[PromptPart],
        _out: Output<'_>,
    ) -> Result<()> {
        tracing::warn!("{} does not support token counting", self.family());
        Err(Error::UnsupportedModel(model.to_string()))
    }
}

/// Family defaults overlaid with the configured parameters.
pub fn resolve_parameters(config: &Config, defaults: Value) -> Result<ModelParameters> {
    let defaults = match defaults {
        Value::Object(map) => map,
        _ => ModelParameters::new(),
    };
    let merged = merge_parameters(defaults, &config.model_parameters()?);
    tracing::debug!("config: {:?}", merged);
    Ok(merged)
}

/// First numeric value among `keys`.
pub fn param_f64(params: &ModelParameters, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| params.get(*k).and_then(Value::as_f64))
}

/// First non-negative integer value among `keys`; integral floats are accepted.
pub fn param_u64(params: &ModelParameters, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| {
        params.get(*k).and_then(|v| {
            v.as_u64().or_else(|| {
                v.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
        })
    })
}

/// Write either the pretty-printed raw response or the extracted text.
///
/// A missing text (zero candidates or predictions) writes an empty line and
/// logs a diagnostic instead of failing.
pub fn render(
    out: Output<'_>,
    config: &Config,
    family: &str,
    raw: &Value,
    text: Option<String>,
) -> Result<()> {
    match config.output_format() {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(raw)?)?,
        OutputFormat::Text => match text {
            Some(text) => writeln!(out, "{}", text)?,
            None => {
                tracing::warn!("{} returned no candidates", family);
                writeln!(out)?;
            }
        },
    }
    out.flush()?;
    Ok(())
}
