//! Identity model and the persistence seam the gate talks through.
//!
//! The gate only ever needs a handful of store operations (lookup by id or
//! unique field, upsert, the passcode field pair, and an append-only login
//! history), so the store is a trait and the concrete backends live in
//! [`memory`] and [`postgres`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use crate::client::DeviceClass;

mod memory;
mod postgres;
mod store;

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;
pub use store::{IdentityStore, UniqueField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Bronze,
    Silver,
    Gold,
}

impl SubscriptionPlan {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
        }
    }

    /// Parse the persisted `users.plan` textual value into a typed enum.
    fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "free" => Ok(Self::Free),
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            _ => Err(sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid users.plan value: {value}"),
            )))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: SubscriptionPlan,
    pub started_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// The free default every identity starts on.
    #[must_use]
    pub fn none() -> Self {
        Self {
            plan: SubscriptionPlan::Free,
            started_at: None,
            ends_at: None,
        }
    }

    /// Active iff an end timestamp is set and still in the future.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|ends_at| ends_at > now)
    }
}

/// A persisted user identity, as the gate sees it.
///
/// At most one unexpired passcode exists per identity at any time; setting a
/// new one overwrites the previous pair of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub passcode: Option<String>,
    pub passcode_expires_at: Option<DateTime<Utc>>,
    pub subscription: Subscription,
    pub friend_count: u32,
}

impl Identity {
    /// A fresh identity with nothing but an id.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            email: None,
            phone: None,
            name: None,
            passcode: None,
            passcode_expires_at: None,
            subscription: Subscription::none(),
            friend_count: 0,
        }
    }

    /// A fresh identity reachable at `phone`, as created by first-contact
    /// phone login.
    #[must_use]
    pub fn with_phone(phone: &str) -> Self {
        let mut identity = Self::new(Uuid::new_v4());
        identity.phone = Some(phone.to_string());
        identity
    }
}

impl<'r> FromRow<'r, PgRow> for Identity {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let plan: String = row.try_get("plan")?;
        let friend_count: i32 = row.try_get("friend_count")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            name: row.try_get("name")?,
            passcode: row.try_get("passcode")?,
            passcode_expires_at: row.try_get("passcode_expires_at")?,
            subscription: Subscription {
                plan: SubscriptionPlan::from_db(&plan)?,
                started_at: row.try_get("subscription_started_at")?,
                ends_at: row.try_get("subscription_ends_at")?,
            },
            friend_count: u32::try_from(friend_count).unwrap_or(0),
        })
    }
}

/// One successful authentication, appended to the identity's history and
/// never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub logged_in_at: DateTime<Utc>,
    pub agent_family: String,
    pub device: DeviceClass,
    pub source_ip: Option<String>,
}
