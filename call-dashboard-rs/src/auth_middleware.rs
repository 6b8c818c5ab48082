use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{AsHeaderName, AUTHORIZATION},
        HeaderMap, Request, StatusCode,
    },
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::CallDashboard;

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "x-api-key";

// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthErrorResponse {
    pub error: String,
}

/// Header value as UTF-8; unlike `HeaderValue::to_str` this accepts non-ASCII keys.
fn header_text<'a>(headers: &'a HeaderMap, name: impl AsHeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|header| std::str::from_utf8(header.as_bytes()).ok())
}

/// Extract the caller's API key.
///
/// A non-empty `X-API-Key` header wins; otherwise the `Authorization` value is
/// used with the `Bearer ` prefix stripped.
pub fn extract_api_key(headers: &HeaderMap) -> String {
    let custom = header_text(headers, API_KEY_HEADER).filter(|key| !key.is_empty());

    if let Some(key) = custom {
        return key.to_string();
    }

    header_text(headers, AUTHORIZATION)
        .unwrap_or_default()
        .replace("Bearer ", "")
        .trim()
        .to_string()
}

/// Plain equality against the configured key. No configured key rejects everything.
pub fn is_authorized(configured: Option<&str>, supplied: &str) -> bool {
    match configured {
        Some(expected) if !expected.is_empty() => supplied == expected,
        _ => false,
    }
}

/// Rejects requests whose API key does not match the configured one
pub async fn require_api_key(
    State(dashboard): State<Arc<CallDashboard>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<AuthErrorResponse>)> {
    let supplied = extract_api_key(req.headers());

    if !is_authorized(dashboard.api_key(), &supplied) {
        tracing::warn!(
            "Rejected {} {}: invalid or missing API key",
            req.method(),
            req.uri().path()
        );
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(AuthErrorResponse {
                error: "unauthorized".to_string(),
            }),
        ));
    }

    Ok(next.run(req).await)
}
