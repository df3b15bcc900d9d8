//! Daily posting allowance for the authenticated identity.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::gate::AccessGate;

use super::types::QuotaResponse;
use super::{bearer_token, denial};

#[utoipa::path(
    get,
    path = "/v1/quota",
    responses(
        (status = 200, description = "Current daily post limit", body = QuotaResponse),
        (status = 401, description = "Invalid credential"),
        (status = 503, description = "Dependency unavailable")
    ),
    security(("bearer" = [])),
    tag = "quota"
)]
pub async fn daily_limit(headers: HeaderMap, gate: Extension<Arc<AccessGate>>) -> impl IntoResponse {
    let Some(credential) = bearer_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, "Missing credential".to_string()).into_response();
    };

    match gate.daily_limit(&credential, Utc::now()).await {
        Ok(limit) => (StatusCode::OK, Json(QuotaResponse { limit })).into_response(),
        Err(err) => denial(&err).into_response(),
    }
}
