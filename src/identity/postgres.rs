//! Postgres identity store.
//!
//! The passcode compare-and-clear is a single conditional `UPDATE`, so the
//! single-use guarantee holds without any in-process locking even with
//! multiple server replicas against the same database.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Identity, IdentityStore, LoginRecord, UniqueField};

#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const IDENTITY_COLUMNS: &str = "id, email, phone, name, passcode, passcode_expires_at, \
     plan, subscription_started_at, subscription_ends_at, friend_count";

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        sqlx::query_as::<_, Identity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch identity by id")
    }

    async fn find_by_unique(&self, field: UniqueField, value: &str) -> Result<Option<Identity>> {
        let query = match field {
            UniqueField::Email => {
                format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE email = $1")
            }
            UniqueField::Phone => {
                format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE phone = $1")
            }
        };
        sqlx::query_as::<_, Identity>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch identity by unique field")
    }

    async fn save(&self, identity: &Identity) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO users
                (id, email, phone, name, passcode, passcode_expires_at,
                 plan, subscription_started_at, subscription_ends_at, friend_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                name = EXCLUDED.name,
                passcode = EXCLUDED.passcode,
                passcode_expires_at = EXCLUDED.passcode_expires_at,
                plan = EXCLUDED.plan,
                subscription_started_at = EXCLUDED.subscription_started_at,
                subscription_ends_at = EXCLUDED.subscription_ends_at,
                friend_count = EXCLUDED.friend_count
            ",
        )
        .bind(identity.id)
        .bind(identity.email.as_deref())
        .bind(identity.phone.as_deref())
        .bind(identity.name.as_deref())
        .bind(identity.passcode.as_deref())
        .bind(identity.passcode_expires_at)
        .bind(identity.subscription.plan.as_str())
        .bind(identity.subscription.started_at)
        .bind(identity.subscription.ends_at)
        .bind(i32::try_from(identity.friend_count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await
        .context("Failed to save identity")?;
        Ok(())
    }

    async fn set_passcode(&self, id: Uuid, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET passcode = $2, passcode_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .context("Failed to store passcode")?;
        if result.rows_affected() == 0 {
            bail!("identity {id} not found");
        }
        Ok(())
    }

    async fn take_passcode(&self, id: Uuid, code: &str, now: DateTime<Utc>) -> Result<bool> {
        // Matching and clearing happen in one statement; only one concurrent
        // caller can observe rows_affected = 1.
        let result = sqlx::query(
            r"
            UPDATE users
            SET passcode = NULL, passcode_expires_at = NULL
            WHERE id = $1
              AND passcode = $2
              AND passcode_expires_at > $3
            ",
        )
        .bind(id)
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to clear passcode")?;
        Ok(result.rows_affected() == 1)
    }

    async fn append_login_record(&self, id: Uuid, record: &LoginRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO login_history (user_id, logged_in_at, agent_family, device, source_ip)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id)
        .bind(record.logged_in_at)
        .bind(&record.agent_family)
        .bind(record.device.as_str())
        .bind(record.source_ip.as_deref())
        .execute(&self.pool)
        .await
        .context("Failed to append login record")?;
        Ok(())
    }
}
