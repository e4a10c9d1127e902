//! Idempotency store.
//!
//! One row per `(key, actor)`. Rows are inserted inside the business
//! transaction they describe, so a cached response becomes visible exactly
//! when the side effect commits.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use kudi_core::idempotency::{IdempotencyError, IdempotencyKey, IdempotencyRecord, ttl_from_secs};
use kudi_shared::config::IdempotencyConfig;
use kudi_shared::types::UserId;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::convert;
use super::error::RepositoryError;
use crate::entities::idempotency_keys;

/// Idempotency repository.
#[derive(Debug, Clone)]
pub struct IdempotencyRepository {
    db: DatabaseConnection,
    ttl: Duration,
    wait_attempts: u32,
    wait_interval: StdDuration,
}

impl IdempotencyRepository {
    /// Creates a new idempotency repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &IdempotencyConfig) -> Self {
        Self {
            db,
            ttl: ttl_from_secs(config.ttl_secs),
            wait_attempts: config.wait_attempts,
            wait_interval: StdDuration::from_millis(config.wait_interval_ms),
        }
    }

    /// How long saved responses are honoured.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live record for `(key, actor)`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn check_key(
        &self,
        key: &IdempotencyKey,
        actor_id: UserId,
    ) -> Result<Option<IdempotencyRecord>, RepositoryError> {
        Self::find_live(&self.db, key, actor_id, Utc::now()).await
    }

    /// Returns the cached response for `(key, actor)` decoded as `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the cached JSON does not match `T`.
    pub async fn cached<T: DeserializeOwned>(
        &self,
        key: &IdempotencyKey,
        actor_id: UserId,
    ) -> Result<Option<T>, RepositoryError> {
        self.cached_in(&self.db, key, actor_id).await
    }

    /// Same as [`Self::cached`] on an explicit connection.
    ///
    /// Guarded operations call this again once they hold their row lock: a
    /// concurrent request with the same key may have committed while they
    /// waited.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the cached JSON does not match `T`.
    pub async fn cached_in<C: ConnectionTrait, T: DeserializeOwned>(
        &self,
        conn: &C,
        key: &IdempotencyKey,
        actor_id: UserId,
    ) -> Result<Option<T>, RepositoryError> {
        match Self::find_live(conn, key, actor_id, Utc::now()).await? {
            Some(record) => {
                debug!(key = %key, actor_id = %actor_id, "Idempotency hit");
                Ok(Some(record.response()?))
            }
            None => Ok(None),
        }
    }

    /// Stores the response for `(key, actor)`.
    ///
    /// An expired record for the same pair is replaced; a live one is never
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if a live record already exists.
    pub async fn save_response<C: ConnectionTrait, T: Serialize>(
        &self,
        conn: &C,
        key: &IdempotencyKey,
        actor_id: UserId,
        response: &T,
    ) -> Result<IdempotencyRecord, RepositoryError> {
        let now = Utc::now();
        let record = IdempotencyRecord::new(key, actor_id, response, now, self.ttl)?;

        idempotency_keys::Entity::delete_many()
            .filter(idempotency_keys::Column::IdempotencyKey.eq(key.as_str()))
            .filter(idempotency_keys::Column::ActorId.eq(actor_id.into_inner()))
            .filter(idempotency_keys::Column::ExpiresAt.lte(DateTimeWithTimeZone::from(now)))
            .exec(conn)
            .await?;

        let insert = idempotency_keys::ActiveModel {
            id: Set(Uuid::now_v7()),
            idempotency_key: Set(record.key.clone()),
            actor_id: Set(actor_id.into_inner()),
            cached_response: Set(record.cached_response.clone()),
            created_at: Set(record.created_at.into()),
            expires_at: Set(record.expires_at.into()),
        }
        .insert(conn)
        .await;

        match insert {
            Ok(_) => Ok(record),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(IdempotencyError::DuplicateKey {
                    key: key.to_string(),
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Saves the response inside `txn` and commits it.
    ///
    /// If another request committed the same `(key, actor)` first, the
    /// transaction is rolled back and the winner's response is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails or the winner's response never
    /// appears.
    pub async fn commit_with_response<T: Serialize + DeserializeOwned>(
        &self,
        txn: DatabaseTransaction,
        key: &IdempotencyKey,
        actor_id: UserId,
        response: T,
    ) -> Result<T, RepositoryError> {
        match self.save_response(&txn, key, actor_id, &response).await {
            Ok(_) => {
                txn.commit().await?;
                Ok(response)
            }
            Err(RepositoryError::Idempotency(IdempotencyError::DuplicateKey { .. })) => {
                txn.rollback().await?;
                warn!(
                    key = %key,
                    actor_id = %actor_id,
                    "Lost idempotency race, returning winner's response"
                );
                self.await_response(key, actor_id).await
            }
            Err(err) => Err(err),
        }
    }

    /// Polls for a response being written by a concurrent request.
    ///
    /// # Errors
    ///
    /// Returns `InProgress` if no response appears within the configured wait.
    pub async fn await_response<T: DeserializeOwned>(
        &self,
        key: &IdempotencyKey,
        actor_id: UserId,
    ) -> Result<T, RepositoryError> {
        for _ in 0..=self.wait_attempts {
            if let Some(response) = self.cached(key, actor_id).await? {
                return Ok(response);
            }
            tokio::time::sleep(self.wait_interval).await;
        }
        Err(IdempotencyError::InProgress {
            key: key.to_string(),
        }
        .into())
    }

    /// Deletes every record expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = idempotency_keys::Entity::delete_many()
            .filter(idempotency_keys::Column::ExpiresAt.lte(DateTimeWithTimeZone::from(now)))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn find_live<C: ConnectionTrait>(
        conn: &C,
        key: &IdempotencyKey,
        actor_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, RepositoryError> {
        let model = idempotency_keys::Entity::find()
            .filter(idempotency_keys::Column::IdempotencyKey.eq(key.as_str()))
            .filter(idempotency_keys::Column::ActorId.eq(actor_id.into_inner()))
            .one(conn)
            .await?;

        let record = model.map(|m| IdempotencyRecord {
            key: m.idempotency_key,
            actor_id: UserId::from_uuid(m.actor_id),
            cached_response: m.cached_response,
            created_at: convert::utc(m.created_at),
            expires_at: convert::utc(m.expires_at),
        });
        Ok(record.filter(|r| !r.is_expired(now)))
    }
}
