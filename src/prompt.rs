//! Prompt assembly from command-line arguments.
//!
//! Each argument is classified in a fixed order: storage object reference
//! (`gs://`), then http(s) URL, then local file (trailing `.ext`), and finally
//! literal text. The first check that matches wins.

use crate::ai::mime;
use crate::{Error, Result};
use url::Url;

const STORAGE_SCHEME: &str = "gs://";
const DEFAULT_OBJECT_MIME: &str = "application/octet-stream";

/// One ordered piece of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
    FileData { mime_type: String, file_uri: String },
}

impl PromptPart {
    pub fn text(text: impl Into<String>) -> Self {
        PromptPart::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PromptPart::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    StorageObject,
    Url,
    File,
    Text,
}

/// Classify one argument without touching the network or filesystem.
pub fn classify(arg: &str) -> ArgKind {
    if arg.starts_with(STORAGE_SCHEME) {
        ArgKind::StorageObject
    } else if looks_like_url(arg) {
        ArgKind::Url
    } else if looks_like_filename(arg) {
        ArgKind::File
    } else {
        ArgKind::Text
    }
}

fn looks_like_url(arg: &str) -> bool {
    match Url::parse(arg) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

// An alphabetic extension after the last dot, and nothing URL-shaped.
fn looks_like_filename(arg: &str) -> bool {
    if arg.contains("://") {
        return false;
    }
    match arg.rsplit_once('.') {
        Some((_, ext)) => !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

/// Every argument as a literal text part.
pub fn text_parts(args: &[String]) -> Vec<PromptPart> {
    args.iter().map(|a| PromptPart::Text(a.clone())).collect()
}

/// Resolve arguments into multimodal parts, preserving order.
pub async fn resolve_parts(args: &[String], http: &reqwest::Client) -> Result<Vec<PromptPart>> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(resolve(arg, http).await?);
    }
    Ok(parts)
}

async fn resolve(arg: &str, http: &reqwest::Client) -> Result<PromptPart> {
    match classify(arg) {
        ArgKind::StorageObject => Ok(PromptPart::FileData {
            mime_type: mime::mime_for_path(arg)
                .unwrap_or(DEFAULT_OBJECT_MIME)
                .to_string(),
            file_uri: arg.to_string(),
        }),
        ArgKind::Url => fetch_url_part(arg, http).await,
        ArgKind::File => read_file_part(arg).await,
        ArgKind::Text => Ok(PromptPart::Text(arg.to_string())),
    }
}

/// Read a local file into an inline part, typed by its extension.
pub async fn read_file_part(path: &str) -> Result<PromptPart> {
    let ext = path.rsplit_once('.').map(|(_, e)| e).unwrap_or_default();
    let (category, mime_type) = mime::classify_extension(ext)
        .ok_or_else(|| Error::UnsupportedContentType(format!("invalid file extension: .{}", ext)))?;

    let data = tokio::fs::read(path).await?;
    tracing::debug!(
        "{} ({:?}) bytes read from {}: {}",
        mime_type,
        category,
        path,
        data.len()
    );

    Ok(PromptPart::InlineData {
        mime_type: mime_type.to_string(),
        data,
    })
}

/// Fetch a URL synchronously and type the body by its declared content type.
pub async fn fetch_url_part(url: &str, http: &reqwest::Client) -> Result<PromptPart> {
    let response = http.get(url).send().await?;

    if !response.status().is_success() {
        return Err(Error::Remote(format!(
            "failed to fetch {} (status {})",
            url,
            response.status()
        )));
    }

    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mime_type = mime::parse_content_type(&declared)
        .ok_or_else(|| Error::UnsupportedContentType(format!("invalid mime type '{}'", declared)))?;

    let data = response.bytes().await?.to_vec();
    tracing::debug!("{} bytes fetched from {}: {}", mime_type, url, data.len());

    Ok(PromptPart::InlineData { mime_type, data })
}

/// Collapse text parts into one prompt string, joined with a single space.
///
/// Families without multimodal support reject any non-text part.
pub fn joined_text(parts: &[PromptPart], family: &str) -> Result<String> {
    let texts = parts
        .iter()
        .map(|p| {
            p.as_text().ok_or_else(|| {
                Error::UnsupportedContentType(format!("{} accepts text prompts only", family))
            })
        })
        .collect::<Result<Vec<&str>>>()?;
    Ok(texts.join(" "))
}
