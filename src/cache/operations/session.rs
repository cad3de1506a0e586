use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::keys::session_key;
use crate::cache::models::session::CachedSession;
use crate::session::{SessionError, SessionStore};
use crate::utils::generate_session_key;

/// Redis 会话记录存储
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: Arc<RedisClient>,
}

impl RedisSessionStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user_id: i64, ttl: Duration) -> Result<CachedSession, SessionError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let session = CachedSession::new(generate_session_key(), user_id, ttl.as_secs());
        let json = serde_json::to_string(&session)?;

        let _: () = conn
            .set_ex(session_key(&session.session_key), json, ttl.as_secs().max(1))
            .await?;

        Ok(session)
    }

    async fn load(&self, key: &str) -> Result<Option<CachedSession>, SessionError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let result: Option<String> = conn.get(session_key(key)).await?;

        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, SessionError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let removed: u64 = conn.del(session_key(key)).await?;

        Ok(removed > 0)
    }
}
