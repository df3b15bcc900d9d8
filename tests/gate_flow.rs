//! End-to-end gate flow against the in-memory store.
//!
//! Covers the canonical journey: a free-tier user on Chrome at hour 10 is
//! challenged, confirms the delivered passcode, and is allowed through with a
//! daily post limit of 1.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::Mutex;

use gardisto::gate::{AccessGate, Decision, GateConfig, GateError};
use gardisto::identity::{Identity, IdentityStore, MemoryIdentityStore, UniqueField};
use gardisto::passcode::{CodeSender, Destination, PasscodeService};
use gardisto::quota::DailyLimit;
use gardisto::token;

const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const EDGE_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";

/// Captures delivered codes like a user reading their inbox.
#[derive(Default)]
struct Inbox {
    messages: Mutex<Vec<(Destination, String)>>,
}

impl Inbox {
    async fn last_code(&self) -> Option<String> {
        let messages = self.messages.lock().await;
        messages.last().map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl CodeSender for Inbox {
    async fn send_code(&self, destination: &Destination, code: &str) -> Result<()> {
        let mut messages = self.messages.lock().await;
        messages.push((destination.clone(), code.to_string()));
        Ok(())
    }
}

fn secret() -> SecretString {
    SecretString::from("0123456789abcdef0123456789abcdef".to_string())
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 10, 15, 0).unwrap()
}

fn local_at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(hour, 15, 0)
        .unwrap()
}

struct Harness {
    gate: AccessGate,
    store: Arc<MemoryIdentityStore>,
    inbox: Arc<Inbox>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryIdentityStore::new());
    let inbox = Arc::new(Inbox::default());
    let passcodes = PasscodeService::new(store.clone(), inbox.clone());
    let gate = AccessGate::new(store.clone(), passcodes, GateConfig::new(secret()));
    Harness { gate, store, inbox }
}

async fn seeded_user(harness: &Harness) -> Result<(Identity, String)> {
    let mut identity = Identity::with_phone("+15550001111");
    identity.email = Some("ana@example.com".to_string());
    identity.friend_count = 1;
    harness.store.save(&identity).await?;
    let credential = token::issue_hs256(
        secret().expose_secret().as_bytes(),
        identity.id,
        now().timestamp(),
    )?;
    Ok((identity, credential))
}

#[tokio::test]
async fn chrome_user_is_challenged_then_allowed_with_quota_of_one() -> Result<()> {
    let harness = harness();
    let (identity, credential) = seeded_user(&harness).await?;

    // Hour 10, Chrome: the gate demands a step-up before anything else.
    let decision = harness
        .gate
        .authenticate(&credential, CHROME_DESKTOP, now(), local_at(10))
        .await?;
    match decision {
        Decision::ChallengeRequired { user_id, .. } => assert_eq!(user_id, identity.id),
        Decision::Allowed { .. } => panic!("Chrome must be challenged"),
    }

    // The code arrived on the email channel (preferred over SMS).
    let code = harness.inbox.last_code().await.expect("code delivered");
    assert_eq!(code.len(), 6);
    {
        let messages = harness.inbox.messages.lock().await;
        assert_eq!(
            messages[0].0,
            Destination::Email("ana@example.com".to_string())
        );
    }

    // Confirming the challenge unlocks the request.
    let resolved = harness
        .gate
        .submit_challenge(&credential, &code, CHROME_DESKTOP, now(), local_at(10))
        .await?;
    assert_eq!(resolved.id, identity.id);

    // Free tier with one friend: one post per day.
    let limit = harness.gate.daily_limit(&credential, now()).await?;
    assert_eq!(limit, DailyLimit::Limited(1));

    // The code was single-use.
    let replay = harness
        .gate
        .submit_challenge(&credential, &code, CHROME_DESKTOP, now(), local_at(10))
        .await;
    assert!(matches!(replay, Err(GateError::InvalidOrExpiredCode)));
    Ok(())
}

#[tokio::test]
async fn edge_user_skips_the_challenge_but_not_the_window() -> Result<()> {
    let harness = harness();
    let (_identity, credential) = seeded_user(&harness).await?;

    let decision = harness
        .gate
        .authenticate(&credential, EDGE_DESKTOP, now(), local_at(10))
        .await?;
    assert!(matches!(decision, Decision::Allowed { .. }));
    assert!(harness.inbox.last_code().await.is_none());

    let denied = harness
        .gate
        .authenticate(&credential, EDGE_DESKTOP, now(), local_at(11))
        .await;
    assert!(matches!(denied, Err(GateError::TimeRestricted { .. })));
    Ok(())
}

#[tokio::test]
async fn phone_login_bootstraps_an_identity_and_session() -> Result<()> {
    let harness = harness();

    harness
        .gate
        .request_login_code("+15557772222", now())
        .await?;
    let code = harness.inbox.last_code().await.expect("code delivered");

    let (session_token, identity) = harness
        .gate
        .login(
            "+15557772222",
            &code,
            CHROME_DESKTOP,
            Some("203.0.113.9"),
            now(),
        )
        .await?;
    assert_eq!(identity.phone.as_deref(), Some("+15557772222"));

    // The fresh session resolves through the gate like any other.
    let decision = harness
        .gate
        .authenticate(&session_token, EDGE_DESKTOP, now(), local_at(10))
        .await?;
    assert!(matches!(decision, Decision::Allowed { .. }));

    let history = harness.store.login_history(identity.id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].agent_family, "Chrome");

    // And the identity is findable by its unique phone.
    let found = harness
        .store
        .find_by_unique(UniqueField::Phone, "+15557772222")
        .await?;
    assert_eq!(found.map(|identity| identity.id), Some(identity.id));
    Ok(())
}

#[tokio::test]
async fn expired_session_is_rejected_before_any_policy_runs() -> Result<()> {
    let harness = harness();
    let (_identity, credential) = seeded_user(&harness).await?;

    let later = now() + chrono::Duration::seconds(token::SESSION_TTL_SECONDS + 1);
    let result = harness
        .gate
        .authenticate(&credential, EDGE_DESKTOP, later, local_at(10))
        .await;
    assert!(matches!(result, Err(GateError::InvalidCredential(_))));
    // No challenge was issued for the failed request.
    assert!(harness.inbox.last_code().await.is_none());
    Ok(())
}
