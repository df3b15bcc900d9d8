use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::identity::{Identity, IdentityStore};

use super::delivery::{CodeSender, Destination};

/// Issued codes expire 10 minutes after issuance.
pub const PASSCODE_TTL_MINUTES: i64 = 10;

/// Outcome of the out-of-band send. Persistence already succeeded either way;
/// on `Failed` the code is still valid and the operator can resend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

#[derive(Clone)]
pub struct PasscodeService {
    store: Arc<dyn IdentityStore>,
    sender: Arc<dyn CodeSender>,
}

impl PasscodeService {
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, sender: Arc<dyn CodeSender>) -> Self {
        Self { store, sender }
    }

    /// Generate a fresh code, persist it with its expiry (overwriting any
    /// prior code), and trigger delivery.
    ///
    /// Returns once persistence succeeds; the delivery outcome rides along
    /// and never affects the stored code.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity has no reachable contact or if the
    /// store write fails.
    pub async fn issue(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<(String, DeliveryStatus)> {
        let Some(destination) = destination_for(identity) else {
            bail!("identity {} has no email or phone to deliver to", identity.id);
        };

        let code = generate_code();
        let expires_at = now + Duration::minutes(PASSCODE_TTL_MINUTES);
        self.store
            .set_passcode(identity.id, &code, expires_at)
            .await?;

        let status = match self.sender.send_code(&destination, &code).await {
            Ok(()) => DeliveryStatus::Sent,
            Err(err) => {
                error!(
                    user_id = %identity.id,
                    channel = destination.channel(),
                    "passcode delivery failed: {err}"
                );
                DeliveryStatus::Failed
            }
        };

        Ok((code, status))
    }

    /// Single-use verification: true exactly once per issued code, and only
    /// while the stored expiry is strictly in the future. Delegates the
    /// compare-and-clear to the store so concurrent submissions race on an
    /// atomic update, not on a read-then-write.
    ///
    /// # Errors
    ///
    /// Returns an error only on store failure; a wrong or expired code is
    /// `Ok(false)`.
    pub async fn verify(&self, user_id: Uuid, submitted: &str, now: DateTime<Utc>) -> Result<bool> {
        self.store.take_passcode(user_id, submitted, now).await
    }
}

/// Email when the identity has one, SMS otherwise.
fn destination_for(identity: &Identity) -> Option<Destination> {
    if let Some(email) = &identity.email {
        return Some(Destination::Email(email.clone()));
    }
    identity
        .phone
        .as_ref()
        .map(|phone| Destination::Phone(phone.clone()))
}

/// Six decimal digits, uniform over [100000, 999999]. Codes are compared as
/// strings, never parsed back into numbers.
fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    format!("{code:06}")
}
