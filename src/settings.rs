//! Settings file discovery
//!
//! Project and region may come from a YAML file at `$HOME/.config/gen/gen.yaml`
//! (or `$HOME/gen.yaml`). Flags and environment variables always win; the file
//! only fills values that are still unset.

use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "gen.yaml";

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default, alias = "PROJECT_ID", alias = "project")]
    pub project_id: Option<String>,
    #[serde(default, alias = "REGION")]
    pub region: Option<String>,
}

impl Settings {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
            .map_err(|e| Error::Config(format!("invalid settings file: {}", e)))
    }

    /// Load an explicitly requested settings file; a missing file is an error.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "unable to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::debug!("Using settings file: {}", path.display());
        Self::from_yaml_str(&contents)
    }

    /// Load the first settings file found on the search path, if any.
    pub fn discover() -> Result<Self> {
        match search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Fill unset `project` / `region` values from this file.
    pub fn fill(
        &self,
        project: Option<String>,
        region: Option<String>,
    ) -> (Option<String>, Option<String>) {
        let project = non_empty(project).or_else(|| non_empty(self.project_id.clone()));
        let region = non_empty(region).or_else(|| non_empty(self.region.clone()));
        (project, region)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Settings search path, most specific first.
pub fn search_paths() -> Vec<PathBuf> {
    match dirs::home_dir() {
        Some(home) => vec![
            home.join(".config").join("gen").join(SETTINGS_FILE),
            home.join(SETTINGS_FILE),
        ],
        None => Vec::new(),
    }
}
