use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{LoginRegistry, SessionError, SessionStore};
use crate::cache::CachedSession;

/// 一次登录的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginOutcome {
    /// 被顶替的旧会话键
    pub evicted: Option<String>,
}

/// 保证每个用户最多只有一个有效会话
pub struct SessionAuthority {
    store: Arc<dyn SessionStore>,
    logins: Arc<dyn LoginRegistry>,
    ttl: Duration,
}

impl SessionAuthority {
    pub fn new(store: Arc<dyn SessionStore>, logins: Arc<dyn LoginRegistry>, ttl: Duration) -> Self {
        Self { store, logins, ttl }
    }

    /// 创建新会话并登记为用户的当前会话
    pub async fn login(&self, user_id: i64) -> Result<(CachedSession, LoginOutcome), SessionError> {
        let session = self.store.create(user_id, self.ttl).await?;
        let outcome = self.on_login(user_id, &session.session_key).await?;
        Ok((session, outcome))
    }

    /// 登记新会话键，并尽力删除旧会话的记录
    ///
    /// 删除旧记录失败不会影响本次登录，只有登记新键失败才返回错误。
    pub async fn on_login(
        &self,
        user_id: i64,
        new_key: &str,
    ) -> Result<LoginOutcome, SessionError> {
        let previous = self.logins.swap(user_id, new_key).await?;

        let evicted = previous.filter(|prev| !prev.is_empty() && prev != new_key);
        if let Some(prev) = &evicted {
            match self.store.delete(prev).await {
                Ok(true) => info!(user_id, "Evicted previous session"),
                Ok(false) => debug!(user_id, "Previous session was already gone"),
                Err(e) => warn!(user_id, error = %e, "Failed to evict previous session"),
            }
        }

        Ok(LoginOutcome { evicted })
    }

    /// 解析会话键；已被删除或过期的会话返回 None
    pub async fn resolve(&self, session_key: &str) -> Result<Option<CachedSession>, SessionError> {
        let session = self.store.load(session_key).await?;
        Ok(session.filter(|s| s.expires_at > chrono::Utc::now().timestamp()))
    }

    pub async fn on_logout(&self, user_id: i64) -> Result<(), SessionError> {
        self.logins.clear(user_id).await
    }

    /// 注销会话：删除会话记录并清除登记
    pub async fn logout(&self, session: &CachedSession) -> Result<(), SessionError> {
        self.store.delete(&session.session_key).await?;
        self.on_logout(session.user_id).await
    }

    /// 强制终止会话键对应的会话
    ///
    /// 只有当该键仍是用户登记的当前会话时才清除登记，避免误清新登录。
    pub async fn terminate(&self, session_key: &str) -> Result<(), SessionError> {
        let session = self.store.load(session_key).await?;
        self.store.delete(session_key).await?;

        if let Some(session) = session {
            let current = self.logins.current(session.user_id).await?;
            if current.as_deref() == Some(session_key) {
                self.on_logout(session.user_id).await?;
            }
        }

        Ok(())
    }
}
