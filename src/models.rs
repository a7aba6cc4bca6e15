//! Data models and structures
//!
//! Defines the resolved invocation [`Config`], its builder, and the model
//! parameter map shared by every adapter.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REGION: &str = "us-central1";

/// Free-form model parameters (`temperature`, `maxOutputTokens`, `topP`, `topK`, ...).
pub type ModelParameters = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    #[default]
    None,
    Quiet,
    Verbose,
}

impl LogVerbosity {
    /// Default `tracing` filter directive for this verbosity.
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogVerbosity::Quiet => "gen_cli=error,gen=error",
            LogVerbosity::None => "gen_cli=warn,gen=warn",
            LogVerbosity::Verbose => "gen_cli=debug,gen=debug",
        }
    }
}

/// Resolved settings for one invocation. Built once via [`ConfigBuilder`].
#[derive(Debug, Clone)]
pub struct Config {
    project_id: String,
    region_id: String,
    output_format: OutputFormat,
    log_verbosity: LogVerbosity,
    config_file: Option<PathBuf>,
    parameters: ModelParameters,
    stream: bool,
    api_endpoint: Option<String>,
    access_token: Option<String>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn log_verbosity(&self) -> LogVerbosity {
        self.log_verbosity
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn stream(&self) -> bool {
        self.stream
    }

    /// Base URL override for the prediction service, if any.
    pub fn api_endpoint(&self) -> Option<&str> {
        self.api_endpoint.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Explicit parameters overlaid with the contents of the parameter file.
    ///
    /// An unreadable or malformed file is an error, never a silent fallback.
    pub fn model_parameters(&self) -> Result<ModelParameters> {
        let mut params = self.parameters.clone();
        if let Some(path) = &self.config_file {
            let from_file = read_parameter_file(path)?;
            tracing::debug!("Loaded {} parameters from {}", from_file.len(), path.display());
            params.extend(from_file);
        }
        Ok(params)
    }
}

/// Read a JSON parameter file; the top level must be an object.
pub fn read_parameter_file(path: &Path) -> Result<ModelParameters> {
    let data = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "error reading model config {}: {}",
            path.display(),
            e
        ))
    })?;

    match serde_json::from_str::<Value>(&data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::Config(format!(
            "model config {} must be a JSON object",
            path.display()
        ))),
        Err(e) => Err(Error::Config(format!(
            "error unmarshalling model config {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Overlay `overrides` on a copy of `defaults`, key by key.
pub fn merge_parameters(defaults: ModelParameters, overrides: &ModelParameters) -> ModelParameters {
    let mut merged = defaults;
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Fluent builder for [`Config`].
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    project_id: Option<String>,
    region_id: Option<String>,
    output_format: OutputFormat,
    log_verbosity: LogVerbosity,
    config_file: Option<PathBuf>,
    parameters: ModelParameters,
    stream: bool,
    api_endpoint: Option<String>,
    access_token: Option<String>,
}

impl ConfigBuilder {
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn region_id(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = Some(region_id.into());
        self
    }

    pub fn output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn log_verbosity(mut self, log_verbosity: LogVerbosity) -> Self {
        self.log_verbosity = log_verbosity;
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        let project_id = self
            .project_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "need a valid Google Cloud project ID (--project or PROJECT_ID)".to_string(),
                )
            })?;

        let region_id = self
            .region_id
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Ok(Config {
            project_id,
            region_id,
            output_format: self.output_format,
            log_verbosity: self.log_verbosity,
            config_file: self.config_file,
            parameters: self.parameters,
            stream: self.stream,
            api_endpoint: self.api_endpoint.filter(|e| !e.is_empty()),
            access_token: self.access_token.filter(|t| !t.is_empty()),
        })
    }
}
