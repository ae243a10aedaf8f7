//! Response normalization.
//!
//! Turns the raw target response into a `ResponseEnvelope`: headers are
//! flattened, content-codings undone and the body decoded according to its
//! content type.

use hyper::body::Bytes;
use hyper::header::{HeaderMap, CONTENT_ENCODING, CONTENT_TYPE};
use hyper::StatusCode;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::types::{ResponseBody, ResponseEnvelope};
use crate::error::RelayError;
use crate::infra::decompress_body;
use crate::shared::status_text;

/// A target response as read off the wire.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Reason phrase, when the target sent a non-canonical one.
    pub reason: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Determines if a content type denotes JSON.
///
/// Matches `application/json` and structured-syntax `+json` types,
/// ignoring case and parameters.
pub fn is_json_content(content_type: Option<&str>) -> bool {
    let ct = match content_type {
        Some(ct) => ct.to_ascii_lowercase(),
        None => return false,
    };
    let essence = ct.split(';').next().unwrap_or("").trim();

    essence == "application/json" || essence.ends_with("+json")
}

/// Collapses a header map to one value per name.
///
/// Repeated headers are joined with `", "` in arrival order. Names are lowercase.
pub fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut flat: HashMap<String, String> = HashMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match flat.entry(name.as_str().to_string()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value.into_owned());
            }
        }
    }
    flat
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes a response body by content type.
///
/// Empty bodies are always text. JSON content that fails to parse is a
/// decode error rather than a silent fallback to text.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<ResponseBody, RelayError> {
    if body.is_empty() {
        return Ok(ResponseBody::Text(String::new()));
    }

    if is_json_content(content_type) {
        let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
        return serde_json::from_slice(body)
            .map(ResponseBody::Structured)
            .map_err(RelayError::Decode);
    }

    Ok(ResponseBody::Text(String::from_utf8_lossy(body).into_owned()))
}

/// Builds a `ResponseEnvelope` from a raw target response.
pub fn build_response(raw: RawResponse) -> Result<ResponseEnvelope, RelayError> {
    let content_type = raw
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let content_encoding = raw
        .headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok());

    let decoded = decompress_body(&raw.body, content_encoding)?;
    let body = decode_body(content_type, &decoded)?;

    Ok(ResponseEnvelope {
        status: raw.status.as_u16(),
        status_text: status_text(raw.status, raw.reason.as_deref()),
        headers: flatten_headers(&raw.headers),
        body,
    })
}
