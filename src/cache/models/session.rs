use serde::{Deserialize, Serialize};

/// 会话缓存数据模型
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub session_key: String,
    pub user_id: i64,
    pub created_at: i64, // Unix timestamp
    pub expires_at: i64, // Unix timestamp
}

impl CachedSession {
    pub fn new(session_key: String, user_id: i64, ttl_secs: u64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            session_key,
            user_id,
            created_at: now,
            expires_at: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
        }
    }
}
