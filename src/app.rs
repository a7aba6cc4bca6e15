//! Command implementations behind the `gen` binary.

use crate::ai::Output;
use crate::catalog::Catalog;
use crate::dispatch::Dispatcher;
use crate::models::{Config, LogVerbosity, OutputFormat};
use crate::prompt::PromptPart;
use crate::{Error, Result};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Default model for `prompt`, `interactive` and `tokens`.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const REPL_PROMPT: &str = "? ";

/// Holds the immutable configuration, the model catalog and the dispatcher.
pub struct App {
    config: Config,
    catalog: Catalog,
    dispatcher: Dispatcher,
}

impl App {
    /// App backed by the embedded catalog and the Vertex AI adapters.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_dispatcher(
            config,
            Catalog::embedded()?,
            Dispatcher::vertex(),
        ))
    }

    /// Build an app from explicit parts; used by tests to inject mock adapters.
    pub fn with_dispatcher(config: Config, catalog: Catalog, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            catalog,
            dispatcher,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn note_catalog(&self, model: &str) {
        if !self.catalog.contains(model) {
            debug!("{} is not in the model catalog; routing by name", model);
        }
    }

    /// Send one prompt to `model` and write the rendered result.
    pub async fn prompt(
        &self,
        ctx: &CancellationToken,
        model: &str,
        args: &[String],
        out: Output<'_>,
    ) -> Result<()> {
        self.note_catalog(model);
        if self.config.log_verbosity() == LogVerbosity::Verbose {
            info!("model: {}, prompt: {:?}", model, args);
        }
        self.dispatcher
            .generate(ctx, model, &self.config, args, out)
            .await
    }

    /// Read-eval-print loop over `input`.
    ///
    /// Each line is an independent prompt sent as one text part, even when it
    /// looks like a file name or URL. The loop ends on EOF,
    /// on `quit` / `exit` (any case), or when `ctx` is cancelled. A failed
    /// call is reported and the loop continues.
    pub async fn interactive<R>(
        &self,
        ctx: &CancellationToken,
        model: &str,
        input: R,
        out: Output<'_>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.note_catalog(model);
        writeln!(out, "entering interactive mode")?;
        writeln!(out, "type 'exit' or 'quit' to exit")?;
        writeln!(out, "model: {}", model)?;

        let mut lines = input.lines();
        loop {
            write!(out, "{}", REPL_PROMPT)?;
            out.flush()?;

            let line = tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                writeln!(out)?;
                break;
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if is_exit_command(line) {
                break;
            }

            let parts = [PromptPart::text(line)];
            match self
                .dispatcher
                .generate_parts(ctx, model, &self.config, &parts, out)
                .await
            {
                Ok(()) => writeln!(out)?,
                Err(Error::Cancelled) => {
                    info!("interactive session cancelled");
                    break;
                }
                Err(e) => {
                    error!("{}", e);
                    writeln!(out, "error generating content: {}\n", e)?;
                }
            }
        }
        Ok(())
    }

    /// Write the catalog as an aligned table or a JSON array.
    pub fn list_models(&self, out: Output<'_>) -> Result<()> {
        list_models(&self.catalog, self.config.output_format(), out)
    }

    /// Count prompt tokens against a Gemini model.
    pub async fn count_tokens(
        &self,
        ctx: &CancellationToken,
        model: &str,
        args: &[String],
        out: Output<'_>,
    ) -> Result<()> {
        self.note_catalog(model);
        self.dispatcher
            .count_tokens(ctx, model, &self.config, args, out)
            .await
    }
}

/// Write `catalog` as an aligned `Family / Mode / Model ID` table or a JSON array.
pub fn list_models(catalog: &Catalog, format: OutputFormat, out: Output<'_>) -> Result<()> {
    let models = catalog.list();

    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(models)?)?;
        }
        OutputFormat::Text => {
            let headers = ["Family", "Mode", "Model ID"];
            let family_width = models
                .iter()
                .map(|m| m.family.as_str().len())
                .chain([headers[0].len()])
                .max()
                .unwrap_or_default();
            let mode_width = models
                .iter()
                .map(|m| m.mode.len())
                .chain([headers[1].len()])
                .max()
                .unwrap_or_default();

            writeln!(
                out,
                "{:<fw$}  {:<mw$}  {}",
                headers[0],
                headers[1],
                headers[2],
                fw = family_width,
                mw = mode_width
            )?;
            for model in models {
                writeln!(
                    out,
                    "{:<fw$}  {:<mw$}  {}",
                    model.family.as_str(),
                    model.mode,
                    model.name,
                    fw = family_width,
                    mw = mode_width
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit")
}

/// Prompt arguments, or the whole of `file` as a single part when given.
pub async fn collect_prompt(args: Vec<String>, file: Option<&Path>) -> Result<Vec<String>> {
    let prompt = match file {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                Error::InvalidPrompt(format!("unable to read file {}: {}", path.display(), e))
            })?;
            vec![contents]
        }
        None => args,
    };

    if prompt.iter().all(|p| p.trim().is_empty()) {
        return Err(Error::InvalidPrompt("please provide prompt".to_string()));
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockAdapter;
    use crate::dispatch::DispatcherAdapters;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn app_with(gemini: MockAdapter, format: OutputFormat) -> App {
        let config = Config::builder()
            .project_id("p")
            .output_format(format)
            .build()
            .unwrap();
        let dispatcher = Dispatcher::with_adapters(DispatcherAdapters {
            gemini: Box::new(gemini),
            palm: Box::new(MockAdapter::new("PaLM 2")),
            anthropic: Box::new(MockAdapter::new("Anthropic")),
            meta: Box::new(MockAdapter::new("Meta")),
        });
        App::with_dispatcher(config, Catalog::embedded().unwrap(), dispatcher)
    }

    async fn repl(app: &App, input: &str) -> String {
        let mut out = Vec::new();
        app.interactive(
            &CancellationToken::new(),
            DEFAULT_MODEL,
            input.as_bytes(),
            &mut out,
        )
        .await
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_exit_commands_ignore_case() {
        for word in ["quit", "QUIT", "Quit", "exit", "EXIT"] {
            assert!(is_exit_command(word), "{}", word);
        }
        assert!(!is_exit_command("quitter"));
    }

    #[tokio::test]
    async fn test_interactive_quit_makes_no_call() {
        let gemini = MockAdapter::new("Gemini");
        let app = app_with(gemini.clone(), OutputFormat::Text);

        let output = repl(&app, "QUIT\nnever sent\n").await;

        assert_eq!(gemini.get_call_count(), 0);
        assert!(output.ends_with(REPL_PROMPT));
    }

    #[tokio::test]
    async fn test_interactive_prints_result_and_blank_line() {
        let gemini = MockAdapter::new("Gemini").with_response("answer");
        let app = app_with(gemini.clone(), OutputFormat::Text);

        let output = repl(&app, "first\n\nsecond\nexit\n").await;

        assert_eq!(gemini.get_call_count(), 2);
        assert_eq!(gemini.last_parts(), vec![crate::prompt::PromptPart::text("second")]);
        assert_eq!(output.matches("answer\n\n").count(), 2);
        assert!(output.ends_with(REPL_PROMPT));
    }

    #[tokio::test]
    async fn test_interactive_ends_on_eof() {
        let gemini = MockAdapter::new("Gemini");
        let app = app_with(gemini.clone(), OutputFormat::Text);

        repl(&app, "hello").await;
        assert_eq!(gemini.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_interactive_reports_errors_and_continues() {
        let app = app_with(MockAdapter::new("Gemini"), OutputFormat::Text);
        let mut out = Vec::new();

        app.interactive(
            &CancellationToken::new(),
            "unknown-model",
            "one\ntwo\nquit\n".as_bytes(),
            &mut out,
        )
        .await
        .unwrap();

        let output = String::from_utf8(out).unwrap();
        assert_eq!(output.matches("is not supported").count(), 2);
    }

    #[tokio::test]
    async fn test_interactive_line_is_one_text_part() {
        let gemini = MockAdapter::new("Gemini").multimodal();
        let app = app_with(gemini.clone(), OutputFormat::Text);

        let output = repl(&app, "what is Node.js\nquit\n").await;

        assert_eq!(gemini.get_call_count(), 1);
        assert_eq!(
            gemini.last_parts(),
            vec![crate::prompt::PromptPart::text("what is Node.js")]
        );
        assert!(output.contains("what is Node.js\n\n"));
    }

    #[tokio::test]
    async fn test_interactive_cancel_while_waiting_for_input() {
        let gemini = MockAdapter::new("Gemini");
        let app = app_with(gemini.clone(), OutputFormat::Text);
        // The writer half stays open, so no line ever arrives.
        let (_writer, reader) = tokio::io::duplex(64);

        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let mut out = Vec::new();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            app.interactive(&ctx, DEFAULT_MODEL, tokio::io::BufReader::new(reader), &mut out),
        )
        .await
        .expect("interactive should stop on cancellation")
        .unwrap();

        assert_eq!(gemini.get_call_count(), 0);
    }

    #[test]
    fn test_list_models_table() {
        let app = app_with(MockAdapter::new("Gemini"), OutputFormat::Text);
        let mut out = Vec::new();
        app.list_models(&mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        let mut lines = output.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Family"));
        assert!(header.ends_with("Model ID"));
        assert_eq!(lines.count(), app.catalog().list().len());
        assert!(output.contains("gemini-1.5-flash"));
    }

    #[test]
    fn test_list_models_json() {
        let app = app_with(MockAdapter::new("Gemini"), OutputFormat::Json);
        let mut out = Vec::new();
        app.list_models(&mut out).unwrap();

        let parsed: Value = serde_json::from_slice(&out).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), app.catalog().list().len());
        assert_eq!(rows[0]["name"], "gemini-1.0-pro");
        assert_eq!(rows[0]["family"], "Gemini");
    }

    #[tokio::test]
    async fn test_collect_prompt_prefers_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "from a file").unwrap();

        let prompt = collect_prompt(vec!["ignored".to_string()], Some(file.path()))
            .await
            .unwrap();
        assert_eq!(prompt, vec!["from a file".to_string()]);
    }

    #[tokio::test]
    async fn test_collect_prompt_requires_text() {
        let err = collect_prompt(Vec::new(), None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPrompt(_)));

        let err = collect_prompt(Vec::new(), Some(Path::new("/missing/prompt.txt")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPrompt(_)));
    }
}
