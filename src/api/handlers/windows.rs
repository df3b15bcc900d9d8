//! Operation time-window probes.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use std::sync::Arc;

use crate::client;
use crate::gate::AccessGate;
use crate::policy::OperationClass;

use super::types::WindowResponse;
use super::user_agent;

/// Report whether `operation` is currently inside its window. The login
/// window depends on the requesting device class, so the `User-Agent` header
/// participates; subscription and video-upload windows ignore it.
#[utoipa::path(
    get,
    path = "/v1/windows/{operation}",
    params(
        ("operation" = String, Path, description = "login, subscription or video-upload")
    ),
    responses(
        (status = 200, description = "Window status", body = WindowResponse),
        (status = 404, description = "Unknown operation class")
    ),
    tag = "windows"
)]
pub async fn check(
    headers: HeaderMap,
    gate: Extension<Arc<AccessGate>>,
    Path(operation): Path<String>,
) -> impl IntoResponse {
    let Some(operation) = OperationClass::from_slug(&operation) else {
        return (
            StatusCode::NOT_FOUND,
            format!("Unknown operation class: {operation}"),
        )
            .into_response();
    };

    let descriptor = client::classify(&user_agent(&headers));
    let check = gate.check_operation_window(operation, &descriptor, Local::now().naive_local());
    (
        StatusCode::OK,
        Json(WindowResponse {
            operation: check.operation.to_string(),
            allowed: check.allowed,
            window: check.window.to_string(),
        }),
    )
        .into_response()
}
