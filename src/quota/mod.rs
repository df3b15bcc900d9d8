//! Daily posting allowance derived from subscription tier and social-graph
//! size. Pure; the separate posting path enforces the ceiling.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

use crate::identity::{Identity, SubscriptionPlan};

/// A posting ceiling. Serializes as the integer itself, or the string
/// `"unlimited"` for gold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
pub enum DailyLimit {
    Limited(u32),
    Unlimited,
}

impl Serialize for DailyLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Limited(count) => serializer.serialize_u32(*count),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Compute the identity's current daily post limit.
///
/// With an active subscription: gold has no ceiling, silver 10, bronze 5,
/// and any other active plan 1. Without one, the free allowance is one post
/// per friend, clamped to [1, 2].
#[must_use]
pub fn daily_limit(identity: &Identity, now: DateTime<Utc>) -> DailyLimit {
    if identity.subscription.is_active(now) {
        return match identity.subscription.plan {
            SubscriptionPlan::Gold => DailyLimit::Unlimited,
            SubscriptionPlan::Silver => DailyLimit::Limited(10),
            SubscriptionPlan::Bronze => DailyLimit::Limited(5),
            SubscriptionPlan::Free => DailyLimit::Limited(1),
        };
    }
    DailyLimit::Limited(identity.friend_count.clamp(1, 2))
}
