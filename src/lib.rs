//! # Gardisto (Access Gate)
//!
//! `gardisto` is the access-control gate in front of a Q&A application's
//! protected operations. It combines three independent checks into one
//! per-request verdict:
//!
//! - **Session verification:** a signed bearer credential (24h HS256 token)
//!   is resolved to a persisted identity.
//! - **Step-up authentication:** self-service browser families (Chrome, and
//!   anything unrecognized) must confirm a short-lived one-time passcode
//!   delivered out-of-band before the operation proceeds. Enterprise/legacy
//!   families (Edge, IE) pass straight through.
//! - **Time windows:** login, subscription processing, and video upload are
//!   each restricted to an operator-defined daily window; mobile clients get
//!   a wider general-access window than desktops.
//!
//! Every denial carries a reason (`invalid_credential`, `challenge_required`,
//! `invalid_or_expired_code`, `time_restricted`) so callers can present the
//! right remediation. Collaborators — the identity store and the passcode
//! delivery channel — sit behind traits and are injected at construction.

pub mod api;
pub mod cli;
pub mod client;
pub mod gate;
pub mod identity;
pub mod passcode;
pub mod policy;
pub mod quota;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
