//! The storage seam consumed by the gate and the passcode lifecycle.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Identity, LoginRecord};

/// Fields with a uniqueness guarantee, usable for lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Phone,
}

/// Persistence operations the gate needs; everything else the surrounding
/// application does with users is out of scope.
///
/// `set_passcode`/`take_passcode` carry the single-use invariant: the store
/// must apply both as atomic updates so that two concurrent verifications of
/// the same code can never both succeed.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>>;

    async fn find_by_unique(&self, field: UniqueField, value: &str) -> Result<Option<Identity>>;

    /// Insert or fully replace an identity.
    async fn save(&self, identity: &Identity) -> Result<()>;

    /// Store a passcode with its expiry, overwriting any prior pair.
    async fn set_passcode(&self, id: Uuid, code: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Atomically clear the stored passcode iff it matches `code` exactly and
    /// its expiry is strictly after `now`. Returns whether the clear
    /// happened; a mismatched or expired submission leaves the stored pair
    /// untouched.
    async fn take_passcode(&self, id: Uuid, code: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Append one entry to the identity's login history.
    async fn append_login_record(&self, id: Uuid, record: &LoginRecord) -> Result<()>;
}
