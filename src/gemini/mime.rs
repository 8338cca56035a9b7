//! MIME type detection based on file extensions.

use std::path::Path;

/// MIME type for Gemini text documents.
pub const GEMINI_MIME: &str = "text/gemini;charset=utf-8";

/// Returned when the extension is missing or unknown.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Looks up the MIME type for a file by its extension (case-insensitive).
///
/// # Example
///
/// ```
/// # use gemserve::gemini::mime::mime_for_path;
/// # use std::path::Path;
/// assert_eq!(mime_for_path(Path::new("index.gmi")), "text/gemini;charset=utf-8");
/// assert_eq!(mime_for_path(Path::new("blob")), "application/octet-stream");
/// ```
pub fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| mime_for_extension(&ext.to_ascii_lowercase()))
        .unwrap_or(DEFAULT_MIME)
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "gmi" | "gemini" => GEMINI_MIME,
        "txt" | "text" => "text/plain;charset=utf-8",
        "md" | "markdown" => "text/markdown;charset=utf-8",
        "html" | "htm" => "text/html;charset=utf-8",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "atom" => "application/atom+xml",
        "rss" => "application/rss+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        _ => DEFAULT_MIME,
    }
}
