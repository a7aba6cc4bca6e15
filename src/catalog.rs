//! Static catalog of known model identifiers.
//!
//! The catalog is an embedded comma-separated table with rows
//! `family,mode,name`; lines starting with `#` are comments.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const EMBEDDED_MODELS: &str = include_str!("../data/models.csv");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Family {
    Gemini,
    PaLMText,
    MultiModal,
    Embeddings,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Gemini => "Gemini",
            Family::PaLMText => "PaLMText",
            Family::MultiModal => "MultiModal",
            Family::Embeddings => "Embeddings",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Family::Gemini),
            "text" | "palm" | "palmtext" => Ok(Family::PaLMText),
            "multimodal" => Ok(Family::MultiModal),
            "embeddings" => Ok(Family::Embeddings),
            other => Err(Error::Catalog(format!("unknown model family '{}'", other))),
        }
    }
}

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub family: Family,
    pub mode: String,
}

/// Read-only set of known models, in resource order.
#[derive(Debug, Clone)]
pub struct Catalog {
    models: Vec<ModelDescriptor>,
}

impl Catalog {
    /// Parse the catalog compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_MODELS)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut models: Vec<ModelDescriptor> = Vec::new();

        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let [family, mode, name] = fields.as_slice() else {
                return Err(Error::Catalog(format!(
                    "line {}: expected 3 fields (family,mode,name), found {}",
                    index + 1,
                    fields.len()
                )));
            };

            if name.is_empty() {
                return Err(Error::Catalog(format!("line {}: empty model name", index + 1)));
            }
            if models.iter().any(|m| m.name == *name) {
                return Err(Error::Catalog(format!(
                    "line {}: duplicate model '{}'",
                    index + 1,
                    name
                )));
            }

            models.push(ModelDescriptor {
                name: name.to_string(),
                family: family.parse()?,
                mode: mode.to_string(),
            });
        }

        Ok(Self { models })
    }

    pub fn list(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn get(&self, identifier: &str) -> Result<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.name == identifier)
            .ok_or_else(|| Error::NotFound(identifier.to_string()))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_embedded_catalog_parses() {
        let catalog = Catalog::embedded().unwrap();
        assert!(!catalog.list().is_empty());
    }

    #[test]
    fn test_get_returns_matching_name_for_every_entry() {
        let catalog = Catalog::embedded().unwrap();
        for model in catalog.list() {
            assert_eq!(catalog.get(&model.name).unwrap().name, model.name);
        }
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let catalog = Catalog::embedded().unwrap();
        assert!(matches!(catalog.get("not-a-model"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let catalog = Catalog::parse("# family,mode,name\n\ngemini,text,gemini-x\n  # indented\n").unwrap();
        assert_eq!(
            catalog.list(),
            &[ModelDescriptor {
                name: "gemini-x".to_string(),
                family: Family::Gemini,
                mode: "text".to_string(),
            }]
        );
    }

    #[test]
    fn test_family_tags() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.get("gemini-1.5-flash").unwrap().family, Family::Gemini);
        assert_eq!(catalog.get("text-bison@002").unwrap().family, Family::PaLMText);
        assert_eq!(catalog.get("medlm-large").unwrap().family, Family::MultiModal);
        assert_eq!(catalog.get("code-gecko").unwrap().family, Family::Embeddings);
    }

    #[test]
    fn test_malformed_row_is_rejected() {
        let err = Catalog::parse("gemini,gemini-x\n").unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));

        let err = Catalog::parse("vision,text,foo\n").unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }

    #[test]
    fn test_duplicate_rows_are_rejected() {
        let err = Catalog::parse("gemini,text,a\ngemini,text,a\n").unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }

    #[test]
    fn test_descriptor_json_shape() {
        let catalog = Catalog::parse("text,text,text-bison\n").unwrap();
        let json = serde_json::to_value(catalog.list()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"name": "text-bison", "family": "PaLMText", "mode": "text"}])
        );
    }
}
