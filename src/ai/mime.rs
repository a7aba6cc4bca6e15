//! File-extension and content-type classification for multimodal prompt parts.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Image,
    Audio,
    Video,
    Document,
}

/// Supported extensions, lowercase, without the leading dot.
const MEDIA_TYPES: &[(&str, MediaCategory, &str)] = &[
    ("jpg", MediaCategory::Image, "image/jpeg"),
    ("jpeg", MediaCategory::Image, "image/jpeg"),
    ("png", MediaCategory::Image, "image/png"),
    ("gif", MediaCategory::Image, "image/gif"),
    ("webp", MediaCategory::Image, "image/webp"),
    ("wav", MediaCategory::Audio, "audio/wav"),
    ("mp3", MediaCategory::Audio, "audio/mpeg"),
    ("mpeg", MediaCategory::Video, "video/mpeg"),
    ("mpegs", MediaCategory::Video, "video/mpeg"),
    ("mpg", MediaCategory::Video, "video/mpeg"),
    ("mov", MediaCategory::Video, "video/quicktime"),
    ("mp4", MediaCategory::Video, "video/mp4"),
    ("avi", MediaCategory::Video, "video/x-msvideo"),
    ("wmv", MediaCategory::Video, "video/x-ms-wmv"),
    ("flv", MediaCategory::Video, "video/x-flv"),
    ("pdf", MediaCategory::Document, "application/pdf"),
];

/// Category and MIME type for a file extension, case-insensitive.
pub fn classify_extension(ext: &str) -> Option<(MediaCategory, &'static str)> {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, category, mime)| (*category, *mime))
}

/// MIME type for a path or object URI, judged by its extension.
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(classify_extension)
        .map(|(_, mime)| mime)
}

/// Strip parameters from a `Content-Type` header and validate `type/subtype`.
pub fn parse_content_type(header: &str) -> Option<String> {
    let essence = header.split(';').next().unwrap_or_default().trim();
    let (kind, subtype) = essence.split_once('/')?;
    if kind.is_empty() || subtype.is_empty() || subtype.contains('/') {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}
