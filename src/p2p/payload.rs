//! Canonical payload encodings. Each function returns the exact bytes that are both signed
//! and transmitted.

use serde_json::Value;

use crate::Result;
use crate::p2p::types::Params;

pub const JSON_CONTENT_TYPE: &str = "application/json";

pub const BOUNDARY: &str = "boundary-for-file";
pub const UPLOAD_FIELD: &str = "upload_file";

/// Part type declared for every upload regardless of the file's real type.
pub const UPLOAD_CONTENT_TYPE: &str = "image/png";

#[must_use]
pub fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Sorted `key=value` pairs joined by `&`, with null values dropped.
///
/// Keys sort by byte value. Arrays render as comma-joined elements, nested objects as
/// compact JSON.
#[must_use]
pub fn query_string(params: &Params) -> String {
    let mut pairs: Vec<(&str, &Value)> = params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.as_str(), value))
        .collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={}", render(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(","),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => value.to_string(),
    }
}

/// Compact JSON in insertion order.
pub fn json_body(params: &Params) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(params)?)
}

/// Single-part `multipart/form-data` body for the `upload_file` field.
#[must_use]
pub fn multipart_body(boundary: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let head = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{UPLOAD_FIELD}\"; filename=\"{filename}\"\r\n\
         Content-Type: {UPLOAD_CONTENT_TYPE}\r\n\r\n"
    );
    let tail = format!("\r\n--{boundary}--\r\n");

    let mut body = Vec::with_capacity(head.len() + data.len() + tail.len());
    body.extend_from_slice(head.as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(tail.as_bytes());
    body
}
