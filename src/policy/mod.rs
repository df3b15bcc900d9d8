//! Access policy: challenge requirements and time-window eligibility.
//!
//! Every predicate here is pure and takes the current wall-clock time as an
//! argument, so policies can be evaluated against any instant in tests. Hour
//! windows are half-open `[start, end)` in local time.

use crate::client::ClientDescriptor;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Categories of restricted actions, each with its own eligibility window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    Login,
    Subscription,
    VideoUpload,
}

impl OperationClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Subscription => "subscription",
            Self::VideoUpload => "video_upload",
        }
    }

    /// Parse the URL form (`login`, `subscription`, `video-upload`).
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "login" => Some(Self::Login),
            "subscription" => Some(Self::Subscription),
            "video-upload" | "video_upload" => Some(Self::VideoUpload),
            _ => None,
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A daily hour window, half-open: `start_hour <= hour < end_hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Window {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Window {
    #[must_use]
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    #[must_use]
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        let hour = now.hour();
        hour >= self.start_hour && hour < self.end_hour
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start_hour, self.end_hour)
    }
}

/// Subscription/payment processing is staffed 10:00-11:00 only.
pub const SUBSCRIPTION_WINDOW: Window = Window::new(10, 11);
/// Video uploads are allowed off-peak, 14:00-19:00.
pub const VIDEO_UPLOAD_WINDOW: Window = Window::new(14, 19);
/// General access for mobile clients.
pub const MOBILE_ACCESS_WINDOW: Window = Window::new(10, 13);
/// General access for desktop and tablet clients.
pub const DEFAULT_ACCESS_WINDOW: Window = Window::new(10, 11);

/// Whether this client family must confirm a one-time passcode before
/// proceeding.
///
/// Edge and IE are operator-trusted (enterprise/legacy) families; Chrome is
/// explicitly stepped up; anything else — including an empty family — is
/// stepped up as the conservative default.
#[must_use]
pub fn requires_challenge(descriptor: &ClientDescriptor) -> bool {
    let family = descriptor.family.to_lowercase();
    if family.contains("edge") || family == "ie" {
        return false;
    }
    // Chrome and everything unrecognized step up.
    true
}

/// The general access window applicable to this client.
#[must_use]
pub fn general_access_window(descriptor: &ClientDescriptor) -> Window {
    if descriptor.is_mobile() {
        MOBILE_ACCESS_WINDOW
    } else {
        DEFAULT_ACCESS_WINDOW
    }
}

#[must_use]
pub fn within_general_access_window(descriptor: &ClientDescriptor, now: NaiveDateTime) -> bool {
    general_access_window(descriptor).contains(now)
}

#[must_use]
pub fn within_subscription_window(now: NaiveDateTime) -> bool {
    SUBSCRIPTION_WINDOW.contains(now)
}

#[must_use]
pub fn within_video_upload_window(now: NaiveDateTime) -> bool {
    VIDEO_UPLOAD_WINDOW.contains(now)
}

/// The window governing `operation` for `descriptor`.
#[must_use]
pub fn window_for(operation: OperationClass, descriptor: &ClientDescriptor) -> Window {
    match operation {
        OperationClass::Login => general_access_window(descriptor),
        OperationClass::Subscription => SUBSCRIPTION_WINDOW,
        OperationClass::VideoUpload => VIDEO_UPLOAD_WINDOW,
    }
}

#[must_use]
pub fn within_window(
    operation: OperationClass,
    descriptor: &ClientDescriptor,
    now: NaiveDateTime,
) -> bool {
    window_for(operation, descriptor).contains(now)
}
