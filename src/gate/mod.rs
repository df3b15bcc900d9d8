//! The access gate: composes credential verification, client classification,
//! step-up challenges, and window policy into one per-request verdict.
//!
//! A request moves through `verify credential -> classify client -> challenge
//! or window check`; the original operation is never performed while a
//! challenge is outstanding. Window predicates run once a request would
//! otherwise be allowed, so a passed challenge cannot bypass them.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::client::{self, ClientDescriptor};
use crate::identity::{Identity, IdentityStore, LoginRecord, UniqueField};
use crate::passcode::{DeliveryStatus, PasscodeService};
use crate::policy::{self, OperationClass, Window};
use crate::token;

/// Why a request was refused. Every variant maps to a caller remediation:
/// re-login, show the passcode form, or try again inside the window.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid session credential")]
    InvalidCredential(#[source] token::Error),
    #[error("user not found")]
    UserNotFound,
    #[error("invalid or expired passcode")]
    InvalidOrExpiredCode,
    #[error("{operation} is outside its access window ({window})")]
    TimeRestricted {
        operation: OperationClass,
        window: Window,
    },
    /// Identity store or notification channel failure. Retryable by the
    /// caller; never conflated with a bad credential.
    #[error("dependency unavailable")]
    Dependency(#[source] anyhow::Error),
}

impl GateError {
    /// Stable reason code surfaced to callers.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidCredential(_) => "invalid_credential",
            Self::UserNotFound => "user_not_found",
            Self::InvalidOrExpiredCode => "invalid_or_expired_code",
            Self::TimeRestricted { .. } => "time_restricted",
            Self::Dependency(_) => "dependency_unavailable",
        }
    }
}

/// Per-request verdict for an authenticated caller.
#[derive(Debug)]
pub enum Decision {
    Allowed {
        identity: Identity,
    },
    /// A passcode was issued and must be confirmed before the operation is
    /// retried.
    ChallengeRequired {
        user_id: Uuid,
        delivery: DeliveryStatus,
    },
}

/// Result of an operation-window probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCheck {
    pub operation: OperationClass,
    pub allowed: bool,
    pub window: Window,
}

#[derive(Clone)]
pub struct GateConfig {
    session_secret: SecretString,
}

impl GateConfig {
    #[must_use]
    pub fn new(session_secret: SecretString) -> Self {
        Self { session_secret }
    }

    fn secret_bytes(&self) -> &[u8] {
        self.session_secret.expose_secret().as_bytes()
    }
}

#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn IdentityStore>,
    passcodes: PasscodeService,
    config: GateConfig,
}

impl AccessGate {
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, passcodes: PasscodeService, config: GateConfig) -> Self {
        Self {
            store,
            passcodes,
            config,
        }
    }

    /// Verify the session credential and resolve it to a persisted identity.
    async fn resolve(
        &self,
        credential: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, GateError> {
        let claims = token::verify_hs256(credential, self.config.secret_bytes(), now.timestamp())
            .map_err(GateError::InvalidCredential)?;
        let identity = self
            .store
            .find_by_id(claims.sub)
            .await
            .map_err(GateError::Dependency)?;
        identity.ok_or(GateError::UserNotFound)
    }

    /// Gate an incoming request: verify, classify, then either pass it
    /// through, demand a passcode, or refuse on the access window.
    ///
    /// # Errors
    ///
    /// `InvalidCredential`/`UserNotFound` for authentication failures,
    /// `TimeRestricted` for a window violation, `Dependency` when a
    /// collaborator fails.
    pub async fn authenticate(
        &self,
        credential: &str,
        user_agent: &str,
        now: DateTime<Utc>,
        now_local: NaiveDateTime,
    ) -> Result<Decision, GateError> {
        let identity = self.resolve(credential, now).await?;
        let descriptor = client::classify(user_agent);

        if policy::requires_challenge(&descriptor) {
            let (_code, delivery) = self
                .passcodes
                .issue(&identity, now)
                .await
                .map_err(GateError::Dependency)?;
            info!(user_id = %identity.id, family = %descriptor.family, "step-up challenge issued");
            return Ok(Decision::ChallengeRequired {
                user_id: identity.id,
                delivery,
            });
        }

        self.ensure_general_access(&descriptor, now_local)?;
        Ok(Decision::Allowed { identity })
    }

    /// Confirm an outstanding step-up challenge. The code is single-use: a
    /// failed submission leaves it in place for a retry until it expires.
    ///
    /// # Errors
    ///
    /// `InvalidOrExpiredCode` when the code does not match or has expired;
    /// otherwise as [`Self::authenticate`].
    pub async fn submit_challenge(
        &self,
        credential: &str,
        code: &str,
        user_agent: &str,
        now: DateTime<Utc>,
        now_local: NaiveDateTime,
    ) -> Result<Identity, GateError> {
        let identity = self.resolve(credential, now).await?;
        let confirmed = self
            .passcodes
            .verify(identity.id, code, now)
            .await
            .map_err(GateError::Dependency)?;
        if !confirmed {
            return Err(GateError::InvalidOrExpiredCode);
        }

        let descriptor = client::classify(user_agent);
        self.ensure_general_access(&descriptor, now_local)?;
        info!(user_id = %identity.id, "step-up challenge confirmed");
        Ok(identity)
    }

    /// Probe whether `operation` is currently allowed for this client.
    #[must_use]
    pub fn check_operation_window(
        &self,
        operation: OperationClass,
        descriptor: &ClientDescriptor,
        now_local: NaiveDateTime,
    ) -> WindowCheck {
        WindowCheck {
            operation,
            allowed: policy::within_window(operation, descriptor, now_local),
            window: policy::window_for(operation, descriptor),
        }
    }

    /// Resolve the credential and compute the identity's daily post limit.
    ///
    /// # Errors
    ///
    /// As [`Self::authenticate`] for credential/store failures.
    pub async fn daily_limit(
        &self,
        credential: &str,
        now: DateTime<Utc>,
    ) -> Result<crate::quota::DailyLimit, GateError> {
        let identity = self.resolve(credential, now).await?;
        Ok(crate::quota::daily_limit(&identity, now))
    }

    /// First contact or returning phone login: upsert the identity and send
    /// a login passcode.
    ///
    /// # Errors
    ///
    /// `Dependency` on store failure or when the identity is unreachable.
    pub async fn request_login_code(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<DeliveryStatus, GateError> {
        let identity = match self
            .store
            .find_by_unique(UniqueField::Phone, phone)
            .await
            .map_err(GateError::Dependency)?
        {
            Some(identity) => identity,
            None => {
                let identity = Identity::with_phone(phone);
                self.store
                    .save(&identity)
                    .await
                    .map_err(GateError::Dependency)?;
                info!(user_id = %identity.id, "identity created on first contact");
                identity
            }
        };

        let (_code, delivery) = self
            .passcodes
            .issue(&identity, now)
            .await
            .map_err(GateError::Dependency)?;
        Ok(delivery)
    }

    /// Complete a phone login: verify the passcode, issue a session token,
    /// and append the login record.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown phone number, `InvalidOrExpiredCode`
    /// for a bad code, `Dependency` on collaborator failure.
    pub async fn login(
        &self,
        phone: &str,
        code: &str,
        user_agent: &str,
        source_ip: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(String, Identity), GateError> {
        let identity = self
            .store
            .find_by_unique(UniqueField::Phone, phone)
            .await
            .map_err(GateError::Dependency)?
            .ok_or(GateError::UserNotFound)?;

        let confirmed = self
            .passcodes
            .verify(identity.id, code, now)
            .await
            .map_err(GateError::Dependency)?;
        if !confirmed {
            return Err(GateError::InvalidOrExpiredCode);
        }

        let session_token = token::issue_hs256(
            self.config.secret_bytes(),
            identity.id,
            now.timestamp(),
        )
        .map_err(|err| GateError::Dependency(err.into()))?;

        let descriptor = client::classify(user_agent);
        let record = LoginRecord {
            logged_in_at: now,
            agent_family: descriptor.family.clone(),
            device: descriptor.device,
            source_ip: source_ip.map(str::to_string),
        };
        self.store
            .append_login_record(identity.id, &record)
            .await
            .map_err(GateError::Dependency)?;

        info!(user_id = %identity.id, device = descriptor.device.as_str(), "login completed");
        Ok((session_token, identity))
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    fn ensure_general_access(
        &self,
        descriptor: &ClientDescriptor,
        now_local: NaiveDateTime,
    ) -> Result<(), GateError> {
        if policy::within_general_access_window(descriptor, now_local) {
            Ok(())
        } else {
            Err(GateError::TimeRestricted {
                operation: OperationClass::Login,
                window: policy::general_access_window(descriptor),
            })
        }
    }
}
