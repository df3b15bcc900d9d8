pub mod auth;
pub mod health;
pub mod quota;
pub mod root;
pub mod types;
pub mod windows;

// common functions for the handlers
use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use tracing::error;

use crate::gate::GateError;

use self::types::DenialResponse;

/// Pull the session credential out of the `Authorization: Bearer` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// The raw client string; absent headers classify conservatively downstream.
pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Extract a source address for login records from common proxy headers.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Map a gate refusal to the transport binding: status code plus a reason
/// payload the caller can act on.
pub(crate) fn denial(err: &GateError) -> (StatusCode, Json<DenialResponse>) {
    let status = match err {
        GateError::InvalidCredential(_) | GateError::UserNotFound => StatusCode::UNAUTHORIZED,
        GateError::InvalidOrExpiredCode => StatusCode::BAD_REQUEST,
        GateError::TimeRestricted { .. } => StatusCode::FORBIDDEN,
        GateError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    if let GateError::Dependency(source) = err {
        error!("gate dependency failure: {source:#}");
    }
    let window = match err {
        GateError::TimeRestricted { window, .. } => Some(window.to_string()),
        _ => None,
    };
    (
        status,
        Json(DenialResponse {
            status: "denied".to_string(),
            reason: err.reason().to_string(),
            message: err.to_string(),
            window,
        }),
    )
}
