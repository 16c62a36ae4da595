//! Per-object metadata for uploaded assets

use mime::Mime;

pub const INDEX_DOCUMENT: &str = "index.html";

const INDEX_CACHE_CONTROL: &str = "public, must-revalidate, proxy-revalidate, max-age=0";
const IMMUTABLE_CACHE_CONTROL: &str = "max-age=31536000";

/// Content type from the file extension, `application/octet-stream` when
/// the extension is unknown.
pub fn content_type(relative_path: &str) -> Mime {
    let extension = relative_path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    let Some(extension) = extension else {
        return mime::APPLICATION_OCTET_STREAM;
    };

    match extension.as_str() {
        "html" | "htm" => mime::TEXT_HTML,
        "css" => mime::TEXT_CSS,
        "js" | "mjs" => mime::APPLICATION_JAVASCRIPT,
        "json" | "map" => mime::APPLICATION_JSON,
        "txt" => mime::TEXT_PLAIN,
        "csv" => mime::TEXT_CSV,
        "xml" => mime::TEXT_XML,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        "woff" => mime::FONT_WOFF,
        "woff2" => mime::FONT_WOFF2,
        "pdf" => mime::APPLICATION_PDF,
        other => parse_known(other).unwrap_or(mime::APPLICATION_OCTET_STREAM),
    }
}

fn parse_known(extension: &str) -> Option<Mime> {
    let essence = match extension {
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        _ => return None,
    };
    essence.parse().ok()
}

/// Cache-Control for an object, keyed by its path relative to the deployed
/// folder. `index.html` always revalidates; everything under the
/// cache-busted prefix is cached for a year.
pub fn cache_control(
    relative_path: &str,
    cache_busted_prefix: Option<&str>,
) -> Option<&'static str> {
    if relative_path == INDEX_DOCUMENT {
        return Some(INDEX_CACHE_CONTROL);
    }

    match cache_busted_prefix {
        Some(prefix) if !prefix.is_empty() && relative_path.starts_with(prefix) => {
            Some(IMMUTABLE_CACHE_CONTROL)
        }
        _ => None,
    }
}
