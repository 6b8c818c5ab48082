//! Request body handling for event ingestion
//!
//! Bodies are parsed leniently: anything that is not a JSON object sent with a
//! JSON content type is stored as an empty object instead of being rejected.

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use serde_json::{Map, Value};
use tower_http::limit::RequestBodyLimitLayer;

/// Default maximum request payload size (10MB)
pub const MAX_PAYLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Layer enforcing the payload size limit
pub fn payload_limit_config() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE)
}

/// Whether the Content-Type header names a JSON media type
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Turn a request body into the event object to store.
pub fn parse_event_body(headers: &HeaderMap, body: &[u8]) -> Map<String, Value> {
    if !is_json_content_type(headers) {
        tracing::debug!("Non-JSON content type, storing empty event");
        return Map::new();
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => {
            tracing::debug!("JSON body is not an object, storing empty event");
            Map::new()
        }
        Err(e) => {
            tracing::debug!("Unparseable JSON body ({}), storing empty event", e);
            Map::new()
        }
    }
}
