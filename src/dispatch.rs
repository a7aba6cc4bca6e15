//! Model-name routing to family adapters.
//!
//! Routing is an ordered list of `(predicate, kind)` pairs evaluated top to
//! bottom; the first matching predicate wins. Unmatched names fail with
//! [`Error::UnsupportedModel`] before any remote call is made.

use crate::ai::{
    AnthropicAdapter, GeminiAdapter, MetaAdapter, ModelAdapter, Output, PaLMAdapter,
};
use crate::models::Config;
use crate::prompt::{self, PromptPart};
use crate::{Error, Result};
use std::fmt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Gemini,
    PaLM,
    Anthropic,
    Meta,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterKind::Gemini => "Gemini",
            AdapterKind::PaLM => "PaLM",
            AdapterKind::Anthropic => "Anthropic",
            AdapterKind::Meta => "Meta",
        };
        f.write_str(name)
    }
}

fn is_gemini(model: &str) -> bool {
    model.starts_with("gemini")
}

fn is_palm_text(model: &str) -> bool {
    model.contains("bison") || model.contains("unicorn")
}

fn is_medical(model: &str) -> bool {
    model.starts_with("medlm-") || model.starts_with("medpalm")
}

fn is_claude(model: &str) -> bool {
    model.starts_with("claude")
}

fn is_llama(model: &str) -> bool {
    model.starts_with("llama")
}

/// Evaluation order is the tie-break.
pub const ROUTES: &[(fn(&str) -> bool, AdapterKind)] = &[
    (is_gemini, AdapterKind::Gemini),
    (is_palm_text, AdapterKind::PaLM),
    (is_medical, AdapterKind::PaLM),
    (is_claude, AdapterKind::Anthropic),
    (is_llama, AdapterKind::Meta),
];

/// Adapter kind for `model`, or [`Error::UnsupportedModel`].
pub fn route(model: &str) -> Result<AdapterKind> {
    ROUTES
        .iter()
        .find(|(matches, _)| matches(model))
        .map(|(_, kind)| *kind)
        .ok_or_else(|| Error::UnsupportedModel(model.to_string()))
}

/// One adapter per family, injectable for tests.
pub struct DispatcherAdapters {
    pub gemini: Box<dyn ModelAdapter>,
    pub palm: Box<dyn ModelAdapter>,
    pub anthropic: Box<dyn ModelAdapter>,
    pub meta: Box<dyn ModelAdapter>,
}

pub struct Dispatcher {
    gemini: Box<dyn ModelAdapter>,
    palm: Box<dyn ModelAdapter>,
    anthropic: Box<dyn ModelAdapter>,
    meta: Box<dyn ModelAdapter>,
}

impl Dispatcher {
    /// Dispatcher backed by the Vertex AI adapters.
    pub fn vertex() -> Self {
        Self::with_adapters(DispatcherAdapters {
            gemini: Box::new(GeminiAdapter::new()),
            palm: Box::new(PaLMAdapter::new()),
            anthropic: Box::new(AnthropicAdapter::new()),
            meta: Box::new(MetaAdapter::new()),
        })
    }

    pub fn with_adapters(adapters: DispatcherAdapters) -> Self {
        Self {
            gemini: adapters.gemini,
            palm: adapters.palm,
            anthropic: adapters.anthropic,
            meta: adapters.meta,
        }
    }

    fn adapter(&self, kind: AdapterKind) -> &dyn ModelAdapter {
        match kind {
            AdapterKind::Gemini => self.gemini.as_ref(),
            AdapterKind::PaLM => self.palm.as_ref(),
            AdapterKind::Anthropic => self.anthropic.as_ref(),
            AdapterKind::Meta => self.meta.as_ref(),
        }
    }

    async fn prompt_parts(
        ctx: &CancellationToken,
        adapter: &dyn ModelAdapter,
        args: &[String],
    ) -> Result<Vec<PromptPart>> {
        if args.is_empty() {
            return Err(Error::InvalidPrompt("missing prompt".to_string()));
        }
        if !adapter.supports_multimodal() {
            return Ok(prompt::text_parts(args));
        }

        let http = reqwest::Client::new();
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            parts = prompt::resolve_parts(args, &http) => parts,
        }
    }

    /// Route `model` and run one prediction with `args` as the prompt.
    ///
    /// The parameter file is read before any argument is fetched, so a bad
    /// file fails without touching the network.
    pub async fn generate(
        &self,
        ctx: &CancellationToken,
        model: &str,
        config: &Config,
        args: &[String],
        out: Output<'_>,
    ) -> Result<()> {
        let kind = route(model)?;
        config.model_parameters()?;

        let parts = Self::prompt_parts(ctx, self.adapter(kind), args).await?;
        self.generate_parts(ctx, model, config, &parts, out).await
    }

    /// Route `model` and run one prediction with already-built parts.
    pub async fn generate_parts(
        &self,
        ctx: &CancellationToken,
        model: &str,
        config: &Config,
        parts: &[PromptPart],
        out: Output<'_>,
    ) -> Result<()> {
        let kind = route(model)?;
        tracing::debug!("{} routed to {} adapter", model, kind);

        if config.stream() && kind != AdapterKind::Gemini {
            tracing::warn!("{} does not support streaming; using a unary call", kind);
        }

        self.adapter(kind)
            .generate_content(ctx, model, config, parts, out)
            .await
    }

    /// Count prompt tokens; only Gemini models expose a token counter.
    pub async fn count_tokens(
        &self,
        ctx: &CancellationToken,
        model: &str,
        config: &Config,
        args: &[String],
        out: Output<'_>,
    ) -> Result<()> {
        let kind = route(model)?;
        if kind != AdapterKind::Gemini {
            tracing::warn!("token counting is only available for Gemini models");
            return Err(Error::UnsupportedModel(model.to_string()));
        }

        let adapter = self.adapter(kind);
        let parts = Self::prompt_parts(ctx, adapter, args).await?;
        adapter.count_tokens(ctx, model, config, &parts, out).await
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::vertex()
    }
}
