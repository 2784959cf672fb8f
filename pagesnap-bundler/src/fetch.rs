//! HTTP fetch capability: client construction, bounded-timeout fetches,
//! and byte decoding for the root document.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Identify as a desktop browser; several CDNs refuse stylesheet requests
/// from obvious bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Timeout for the root document fetch.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for every secondary asset fetch, including recursive imports.
pub const ASSET_TIMEOUT: Duration = Duration::from_secs(10);

static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*charset\s*=\s*["']?([A-Za-z0-9_.:-]+)"#)
        .expect("invalid meta charset regex")
});

pub fn build_client(connect_timeout: Duration) -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .connect_timeout(connect_timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Fetch a secondary asset as text. Any failure (transport error, non-2xx
/// status, timeout) resolves to `None` and the caller moves on.
pub async fn fetch_text(client: &Client, url: &str, timeout: Duration) -> Option<String> {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("Fetch failed for {}: {}", url, e);
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        debug!("Fetch for {} returned {}", url, status);
        return None;
    }

    response.text().await.ok()
}

/// Fetch and decode the root document. Returns `None` on any failure;
/// the caller treats that as terminal.
pub async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> Option<String> {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Page fetch failed for {}: {}", url, e);
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!("Page fetch for {} returned {}", url, status);
        return None;
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let bytes = response.bytes().await.ok()?;

    Some(decode_page_bytes(&bytes, content_type.as_deref()))
}

/// Decode document bytes into a `String`.
///
/// - A BOM wins when present.
/// - A declared `Content-Type` charset is honored, except that a latin1
///   declaration is usually the transport default rather than a statement
///   about the bytes; the document's own `<meta charset>` (or plain UTF-8
///   validity) overrides it.
/// - Otherwise, a `<meta charset>` in the first kilobyte is used.
/// - Otherwise, UTF-8.
pub(crate) fn decode_page_bytes(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = enc.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    let declared = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()));

    match declared {
        Some(enc) if enc == WINDOWS_1252 => {
            if let Some(detected) = sniff_meta_charset(bytes) {
                let (text, _) = detected.decode_with_bom_removal(bytes);
                return text.into_owned();
            }
            if std::str::from_utf8(bytes).is_ok() {
                let (text, _) = UTF_8.decode_with_bom_removal(bytes);
                return text.into_owned();
            }
            let (text, _) = enc.decode_with_bom_removal(bytes);
            text.into_owned()
        }
        Some(enc) => {
            let (text, _) = enc.decode_with_bom_removal(bytes);
            text.into_owned()
        }
        None => {
            if let Some(detected) = sniff_meta_charset(bytes) {
                let (text, _) = detected.decode_with_bom_removal(bytes);
                return text.into_owned();
            }
            let (text, _) = UTF_8.decode_with_bom_removal(bytes);
            text.into_owned()
        }
    }
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(1024)];
    let caps = META_CHARSET_RE.captures(head)?;
    Encoding::for_label(&caps[1])
}
