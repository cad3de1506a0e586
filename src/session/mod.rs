//! 单会话登录控制
//!
//! 每个用户同一时间只有一个有效会话。新的登录会记录新的会话键，
//! 并尽力删除上一个会话的服务端记录，使旧会话的后续请求无法通过认证。

mod authority;

use std::time::Duration;

use async_trait::async_trait;

pub use authority::{LoginOutcome, SessionAuthority};

use crate::cache::CachedSession;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[from] redis::RedisError),
    #[error("session record is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("login registry error: {0}")]
    Registry(#[from] sqlx::Error),
}

/// 服务端会话记录存储
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 为用户创建新的会话记录
    async fn create(&self, user_id: i64, ttl: Duration) -> Result<CachedSession, SessionError>;

    async fn load(&self, session_key: &str) -> Result<Option<CachedSession>, SessionError>;

    /// 删除会话记录，返回是否确有记录被删除
    async fn delete(&self, session_key: &str) -> Result<bool, SessionError>;
}

/// 用户当前会话键的登记表
#[async_trait]
pub trait LoginRegistry: Send + Sync {
    /// 原子地把用户的当前会话键替换为 `session_key`，返回之前登记的键
    async fn swap(&self, user_id: i64, session_key: &str) -> Result<Option<String>, SessionError>;

    async fn current(&self, user_id: i64) -> Result<Option<String>, SessionError>;

    async fn clear(&self, user_id: i64) -> Result<(), SessionError>;
}
