//! One-time passcode lifecycle: generation, storage with expiry, delivery,
//! and single-use verification.

mod delivery;
mod service;

pub use delivery::{CodeSender, Destination, HttpCodeSender, LogCodeSender, NotifyConfig};
pub use service::{DeliveryStatus, PasscodeService, PASSCODE_TTL_MINUTES};
