//! Gemini payload types for generateContent, streamGenerateContent and countTokens.

use crate::models::ModelParameters;
use crate::prompt::PromptPart;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gemini content container used in both requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Untagged union of text, inline media and file-reference parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding; `Other` keeps
/// parts this client does not render (function calls, code results, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    Other(Value),
}

/// Base64 inline payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// Reference to an object already in Cloud Storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

impl From<&PromptPart> for Part {
    fn from(part: &PromptPart) -> Self {
        match part {
            PromptPart::Text(text) => Part::Text { text: text.clone() },
            PromptPart::InlineData { mime_type, data } => Part::InlineData {
                inline_data: Blob {
                    mime_type: mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(data),
                },
            },
            PromptPart::FileData {
                mime_type,
                file_uri,
            } => Part::FileData {
                file_data: FileData {
                    mime_type: mime_type.clone(),
                    file_uri: file_uri.clone(),
                },
            },
        }
    }
}

/// Single user turn built from ordered prompt parts.
pub fn user_content(parts: &[PromptPart]) -> Content {
    Content {
        role: Some("user".to_string()),
        parts: parts.iter().map(Part::from).collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<ModelParameters>,
}

/// Top-level `generateContent` response envelope (also one stream chunk).
#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: Option<Value>,
}

/// Candidate completion item returned by Gemini.
#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, joined with a single space.
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join(" "))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountTokensRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    #[serde(default)]
    pub total_tokens: u64,
    pub total_billable_characters: Option<u64>,
}
