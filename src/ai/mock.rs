use super::{ModelAdapter, Output};
use crate::models::Config;
use crate::prompt::PromptPart;
use crate::{Error, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// In-process adapter that records calls and replays canned responses.
///
/// Clones share their counters, so a test can keep one handle while the
/// dispatcher owns another.
#[derive(Clone)]
pub struct MockAdapter {
    family: &'static str,
    multimodal: bool,
    responses: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
    token_calls: Arc<Mutex<usize>>,
    last_parts: Arc<Mutex<Vec<PromptPart>>>,
    last_model: Arc<Mutex<Option<String>>>,
}

impl MockAdapter {
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            multimodal: false,
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            token_calls: Arc::new(Mutex::new(0)),
            last_parts: Arc::new(Mutex::new(Vec::new())),
            last_model: Arc::new(Mutex::new(None)),
        }
    }

    pub fn multimodal(mut self) -> Self {
        self.multimodal = true;
        self
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(response.into());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_token_call_count(&self) -> usize {
        *self.token_calls.lock().unwrap()
    }

    pub fn last_parts(&self) -> Vec<PromptPart> {
        self.last_parts.lock().unwrap().clone()
    }

    pub fn last_model(&self) -> Option<String> {
        self.last_model.lock().unwrap().clone()
    }

    fn record(&self, model: &str, parts: &[PromptPart]) -> usize {
        *self.last_parts.lock().unwrap() = parts.to_vec();
        *self.last_model.lock().unwrap() = Some(model.to_string());
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        *count
    }
}

#[async_trait]
impl ModelAdapter for MockAdapter {
    fn family(&self) -> &'static str {
        self.family
    }

    fn supports_multimodal(&self) -> bool {
        self.multimodal
    }

    async fn generate_content(
        &self,
        ctx: &CancellationToken,
        model: &str,
        _config: &Config,
        parts: &[PromptPart],
        out: Output<'_>,
    ) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let count = self.record(model, parts);

        let response = {
            let responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                // Echo the text parts back
                parts
                    .iter()
                    .filter_map(PromptPart::as_text)
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                responses[(count - 1) % responses.len()].clone()
            }
        };

        writeln!(out, "{}", response)?;
        Ok(())
    }

    async fn count_tokens(
        &self,
        _ctx: &CancellationToken,
        model: &str,
        _config: &Config,
        parts: &[PromptPart],
        out: Output<'_>,
    ) -> Result<()> {
        *self.token_calls.lock().unwrap() += 1;
        *self.last_model.lock().unwrap() = Some(model.to_string());
        let words: usize = parts
            .iter()
            .filter_map(PromptPart::as_text)
            .map(|t| t.split_whitespace().count())
            .sum();
        writeln!(out, "Number of tokens for the prompt: {}", words)?;
        Ok(())
    }
}
