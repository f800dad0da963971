use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use super::ServiceError;

/// Short-lived key/value storage (one-time codes).
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), ServiceError>;
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
    async fn health_check(&self) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(url: &str) -> Result<Self, ServiceError> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(url)?;

        // ConnectionManager reconnects on its own after a dropped connection.
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get Redis connection manager");
            ServiceError::Redis(e)
        })?;

        tracing::info!("Successfully connected to Redis");
        Ok(Self { manager })
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }
}

/// In-process cache honouring TTLs, for tests and local runs.
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>, ServiceError> {
        self.entries
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Cache mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl KeyValueCache for MockCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), ServiceError> {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries()?
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let mut entries = self.entries()?;
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.entries()?.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}
