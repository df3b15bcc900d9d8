//! OpenAPI document for the gate endpoints.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::handlers;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::phone,
        handlers::auth::login,
        handlers::auth::authenticate,
        handlers::auth::challenge,
        handlers::windows::check,
        handlers::quota::daily_limit,
    ),
    components(schemas(
        handlers::types::PhoneLoginRequest,
        handlers::types::PhoneLoginResponse,
        handlers::types::LoginRequest,
        handlers::types::LoginResponse,
        handlers::types::UserSummary,
        handlers::types::ChallengeRequest,
        handlers::types::GateResponse,
        handlers::types::DenialResponse,
        handlers::types::WindowResponse,
        handlers::types::QuotaResponse,
        crate::quota::DailyLimit,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and gate decisions"),
        (name = "windows", description = "Operation time windows"),
        (name = "quota", description = "Posting allowance"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
