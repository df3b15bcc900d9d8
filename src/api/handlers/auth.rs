//! Login and gate endpoints.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Local, Utc};
use std::sync::Arc;

use crate::gate::{AccessGate, Decision};
use crate::passcode::DeliveryStatus;

use super::types::{
    ChallengeRequest, GateResponse, LoginRequest, LoginResponse, PhoneLoginRequest,
    PhoneLoginResponse, UserSummary,
};
use super::{bearer_token, denial, extract_client_ip, user_agent};

fn delivery_str(delivery: DeliveryStatus) -> &'static str {
    match delivery {
        DeliveryStatus::Sent => "sent",
        DeliveryStatus::Failed => "failed",
    }
}

/// Request a login passcode for a phone number. Creates the identity on
/// first contact.
#[utoipa::path(
    post,
    path = "/v1/auth/phone",
    request_body = PhoneLoginRequest,
    responses(
        (status = 200, description = "Passcode issued", body = PhoneLoginResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 503, description = "Dependency unavailable")
    ),
    tag = "auth"
)]
pub async fn phone(
    gate: Extension<Arc<AccessGate>>,
    payload: Option<Json<PhoneLoginRequest>>,
) -> impl IntoResponse {
    let request: PhoneLoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let number = request.phone.trim();
    if number.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing phone".to_string()).into_response();
    }

    match gate.request_login_code(number, Utc::now()).await {
        Ok(delivery) => (
            StatusCode::OK,
            Json(PhoneLoginResponse {
                delivery: delivery_str(delivery).to_string(),
            }),
        )
            .into_response(),
        Err(err) => denial(&err).into_response(),
    }
}

/// Complete a phone login: exchange the passcode for a 24h session token.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 400, description = "Invalid or expired code"),
        (status = 401, description = "Unknown phone number")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    gate: Extension<Arc<AccessGate>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let agent = user_agent(&headers);
    let source_ip = extract_client_ip(&headers);
    match gate
        .login(
            request.phone.trim(),
            request.code.trim(),
            &agent,
            source_ip.as_deref(),
            Utc::now(),
        )
        .await
    {
        Ok((token, identity)) => (
            StatusCode::OK,
            Json(LoginResponse {
                token,
                user: UserSummary {
                    id: identity.id.to_string(),
                    email: identity.email,
                    phone: identity.phone,
                    name: identity.name,
                },
            }),
        )
            .into_response(),
        Err(err) => denial(&err).into_response(),
    }
}

/// The gate itself: decide whether the bearer may proceed, must confirm a
/// passcode first, or is refused.
#[utoipa::path(
    post,
    path = "/v1/auth/authenticate",
    responses(
        (status = 200, description = "Allowed", body = GateResponse),
        (status = 401, description = "Invalid credential"),
        (status = 403, description = "Challenge required or time restricted", body = GateResponse),
        (status = 503, description = "Dependency unavailable")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn authenticate(
    headers: HeaderMap,
    gate: Extension<Arc<AccessGate>>,
) -> impl IntoResponse {
    let Some(credential) = bearer_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, "Missing credential".to_string()).into_response();
    };

    let agent = user_agent(&headers);
    match gate
        .authenticate(&credential, &agent, Utc::now(), Local::now().naive_local())
        .await
    {
        Ok(Decision::Allowed { .. }) => (
            StatusCode::OK,
            Json(GateResponse {
                status: "allowed".to_string(),
                delivery: None,
            }),
        )
            .into_response(),
        Ok(Decision::ChallengeRequired { delivery, .. }) => (
            // The operation is not performed; the caller must confirm the
            // passcode and resubmit.
            StatusCode::FORBIDDEN,
            Json(GateResponse {
                status: "challenge_required".to_string(),
                delivery: Some(delivery_str(delivery).to_string()),
            }),
        )
            .into_response(),
        Err(err) => denial(&err).into_response(),
    }
}

/// Confirm an outstanding step-up passcode.
#[utoipa::path(
    post,
    path = "/v1/auth/challenge",
    request_body = ChallengeRequest,
    responses(
        (status = 200, description = "Challenge confirmed", body = GateResponse),
        (status = 400, description = "Invalid or expired code"),
        (status = 401, description = "Invalid credential"),
        (status = 403, description = "Time restricted")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn challenge(
    headers: HeaderMap,
    gate: Extension<Arc<AccessGate>>,
    payload: Option<Json<ChallengeRequest>>,
) -> impl IntoResponse {
    let Some(credential) = bearer_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, "Missing credential".to_string()).into_response();
    };
    let request: ChallengeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let agent = user_agent(&headers);
    match gate
        .submit_challenge(
            &credential,
            request.code.trim(),
            &agent,
            Utc::now(),
            Local::now().naive_local(),
        )
        .await
    {
        Ok(_identity) => (
            StatusCode::OK,
            Json(GateResponse {
                status: "allowed".to_string(),
                delivery: None,
            }),
        )
            .into_response(),
        Err(err) => denial(&err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateConfig;
    use crate::identity::MemoryIdentityStore;
    use crate::passcode::{LogCodeSender, PasscodeService};
    use anyhow::Result;
    use axum::http::HeaderValue;
    use secrecy::SecretString;

    fn test_gate() -> Arc<AccessGate> {
        let store = Arc::new(MemoryIdentityStore::new());
        let passcodes = PasscodeService::new(store.clone(), Arc::new(LogCodeSender));
        Arc::new(AccessGate::new(
            store,
            passcodes,
            GateConfig::new(SecretString::from(
                "0123456789abcdef0123456789abcdef".to_string(),
            )),
        ))
    }

    #[tokio::test]
    async fn phone_missing_payload() {
        let response = phone(Extension(test_gate()), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn phone_empty_number() {
        let response = phone(
            Extension(test_gate()),
            Some(Json(PhoneLoginRequest {
                phone: "  ".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn phone_issues_code() {
        let response = phone(
            Extension(test_gate()),
            Some(Json(PhoneLoginRequest {
                phone: "+15550001111".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_unknown_phone_is_unauthorized() {
        let response = login(
            HeaderMap::new(),
            Extension(test_gate()),
            Some(Json(LoginRequest {
                phone: "+15559999999".to_string(),
                code: "123456".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticate_requires_bearer() {
        let response = authenticate(HeaderMap::new(), Extension(test_gate()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticate_rejects_garbage_credential() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer nope"),
        );
        let response = authenticate(headers, Extension(test_gate()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn challenge_missing_payload() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer nope"),
        );
        let response = challenge(headers, Extension(test_gate()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
