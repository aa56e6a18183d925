use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{AttemptStateStore, StoreError};
use crate::metrics::track_cache_operation;
use crate::models::attempt::{AttemptKey, AttemptState};

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Attempt state kept in Redis as JSON with a sliding TTL.
#[derive(Clone)]
pub struct RedisAttemptStateStore {
    redis: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisAttemptStateStore {
    pub fn new(redis: ConnectionManager, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }
}

#[async_trait]
impl AttemptStateStore for RedisAttemptStateStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    async fn load(&self, key: &AttemptKey) -> Result<Option<AttemptState>, StoreError> {
        let mut conn = self.redis.clone();
        let state_key = key.storage_key();

        let state_json: Option<String> = track_cache_operation("get", async {
            Ok::<_, StoreError>(
                redis::cmd("GET")
                    .arg(&state_key)
                    .query_async(&mut conn)
                    .await?,
            )
        })
        .await?;

        match state_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &AttemptKey, state: &AttemptState) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        let state_key = key.storage_key();
        let state_json = serde_json::to_string(state)?;

        track_cache_operation("setex", async {
            redis::cmd("SETEX")
                .arg(&state_key)
                .arg(self.ttl_seconds)
                .arg(state_json)
                .query_async::<()>(&mut conn)
                .await?;
            Ok::<(), StoreError>(())
        })
        .await
    }

    async fn clear(&self, key: &AttemptKey) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        let state_key = key.storage_key();

        track_cache_operation("del", async {
            redis::cmd("DEL")
                .arg(&state_key)
                .query_async::<()>(&mut conn)
                .await?;
            Ok::<(), StoreError>(())
        })
        .await
    }
}
