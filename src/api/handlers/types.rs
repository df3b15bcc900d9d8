//! Request/response types for the gate endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::quota::DailyLimit;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PhoneLoginRequest {
    pub phone: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PhoneLoginResponse {
    /// `sent` or `failed`; a failed send leaves the code valid for resend.
    pub delivery: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub phone: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChallengeRequest {
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct GateResponse {
    /// `allowed` or `challenge_required`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DenialResponse {
    pub status: String,
    pub reason: String,
    pub message: String,
    /// Present on `time_restricted` so the UI can explain when to retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct WindowResponse {
    pub operation: String,
    pub allowed: bool,
    pub window: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct QuotaResponse {
    pub limit: DailyLimit,
}
