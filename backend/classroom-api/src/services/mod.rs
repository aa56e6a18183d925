use std::sync::Arc;

use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;
use thiserror::Error;

use crate::config::Config;
use crate::storage::{
    mongo::MongoQuizStore, redis_state::RedisAttemptStateStore, AttemptStateStore, QuizStore,
    StoreError,
};

pub mod attempt_locks;
pub mod attempt_service;
pub mod scoring;
pub mod student_service;

use attempt_locks::AttemptLocks;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn QuizStore>,
    pub attempt_states: Arc<dyn AttemptStateStore>,
    pub attempt_locks: AttemptLocks,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let store = MongoQuizStore::new(mongo_client, &config.mongo_database);
        store.ensure_indexes().await?;

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        let attempt_states = RedisAttemptStateStore::new(redis, config.attempt_state_ttl_seconds);
        tokio::time::timeout(std::time::Duration::from_secs(5), attempt_states.ping())
            .await
            .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        Ok(Self::from_stores(
            config,
            Arc::new(store),
            Arc::new(attempt_states),
        ))
    }

    pub fn from_stores(
        config: Config,
        store: Arc<dyn QuizStore>,
        attempt_states: Arc<dyn AttemptStateStore>,
    ) -> Self {
        Self {
            config,
            store,
            attempt_states,
            attempt_locks: AttemptLocks::new(),
        }
    }
}

/// Failures of quiz and student operations, mapped to HTTP statuses by the handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidQuiz(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }

    pub fn invalid_quiz(message: impl Into<String>) -> Self {
        ServiceError::InvalidQuiz(message.into())
    }
}
