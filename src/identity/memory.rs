//! In-memory identity store for local development and tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Identity, IdentityStore, LoginRecord, UniqueField};

struct Entry {
    identity: Identity,
    login_history: Vec<LoginRecord>,
}

/// A mutexed map. The single lock doubles as the per-identity serialization
/// the passcode compare-and-clear needs.
#[derive(Default)]
pub struct MemoryIdentityStore {
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of an identity's login history, oldest first.
    pub async fn login_history(&self, id: Uuid) -> Vec<LoginRecord> {
        let entries = self.entries.lock().await;
        entries
            .get(&id)
            .map(|entry| entry.login_history.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&id).map(|entry| entry.identity.clone()))
    }

    async fn find_by_unique(&self, field: UniqueField, value: &str) -> Result<Option<Identity>> {
        let entries = self.entries.lock().await;
        let identity = entries
            .values()
            .map(|entry| &entry.identity)
            .find(|identity| match field {
                UniqueField::Email => identity.email.as_deref() == Some(value),
                UniqueField::Phone => identity.phone.as_deref() == Some(value),
            })
            .cloned();
        Ok(identity)
    }

    async fn save(&self, identity: &Identity) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries
            .entry(identity.id)
            .and_modify(|entry| entry.identity = identity.clone())
            .or_insert_with(|| Entry {
                identity: identity.clone(),
                login_history: Vec::new(),
            });
        Ok(())
    }

    async fn set_passcode(&self, id: Uuid, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(&id) else {
            bail!("identity {id} not found");
        };
        entry.identity.passcode = Some(code.to_string());
        entry.identity.passcode_expires_at = Some(expires_at);
        Ok(())
    }

    async fn take_passcode(&self, id: Uuid, code: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(&id) else {
            return Ok(false);
        };
        let matches = entry.identity.passcode.as_deref() == Some(code)
            && entry
                .identity
                .passcode_expires_at
                .is_some_and(|expires_at| expires_at > now);
        if matches {
            entry.identity.passcode = None;
            entry.identity.passcode_expires_at = None;
        }
        Ok(matches)
    }

    async fn append_login_record(&self, id: Uuid, record: &LoginRecord) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(&id) else {
            bail!("identity {id} not found");
        };
        entry.login_history.push(record.clone());
        Ok(())
    }
}
