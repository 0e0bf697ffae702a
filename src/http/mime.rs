//! MIME type detection module
//!
//! Maps file names to a Content-Type and splits Content-Type values into
//! the bare MIME type and its charset.

use std::path::Path;

/// Content-Type for a resource path, based on its final extension
///
/// Gzip-equivalent extensions such as `.svgz` map to the type of the
/// uncompressed form, since the encoding is signalled separately.
///
/// # Examples
/// ```
/// use rust_fileserver::http::mime::content_type_for_path;
/// use std::path::Path;
/// assert_eq!(content_type_for_path(Path::new("a/index.html")), "text/html; charset=utf-8");
/// assert_eq!(content_type_for_path(Path::new("movie.MP4")), "video/mp4");
/// assert_eq!(content_type_for_path(Path::new("LICENSE")), "application/octet-stream");
/// ```
pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    get_content_type(extension.as_deref())
}

/// Get MIME Content-Type based on a lowercase file extension
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("xml") => "application/xml",

        // JavaScript/WASM
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("wasm") => "application/wasm",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg" | "svgz") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",

        // Video
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogv") => "video/ogg",
        Some("mov") => "video/quicktime",

        // Audio
        Some("mp3") => "audio/mpeg",
        Some("ogg" | "oga") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Archives / documents
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz" | "tgz") => "application/gzip",
        Some("br") => "application/x-brotli",
        Some("tar") => "application/x-tar",

        // Default
        _ => "application/octet-stream",
    }
}

/// Content-Type without parameters, e.g. `text/html`
pub fn mime_type(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(mime, _)| mime)
        .trim()
}

/// `charset` parameter of a Content-Type, if any
pub fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}
