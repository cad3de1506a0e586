use async_trait::async_trait;
use sqlx::PgPool;

use crate::session::{LoginRegistry, SessionError};

/// 登录登记表，每个用户一行
#[derive(Clone)]
pub struct PgLoginRegistry {
    pool: PgPool,
}

impl PgLoginRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginRegistry for PgLoginRegistry {
    async fn swap(&self, user_id: i64, session_key: &str) -> Result<Option<String>, SessionError> {
        // 锁住已有行后再覆盖，同一用户的并发登录按顺序看到彼此的键
        let previous: Option<String> = sqlx::query_scalar(
            r#"
            WITH previous AS (
                SELECT session_key FROM logged_in_users WHERE user_id = $1 FOR UPDATE
            )
            INSERT INTO logged_in_users (user_id, session_key)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET session_key = EXCLUDED.session_key
            RETURNING (SELECT session_key FROM previous)
            "#,
        )
        .bind(user_id)
        .bind(session_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(previous)
    }

    async fn current(&self, user_id: i64) -> Result<Option<String>, SessionError> {
        let key: Option<String> = sqlx::query_scalar(
            "SELECT session_key FROM logged_in_users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key.filter(|k| !k.is_empty()))
    }

    async fn clear(&self, user_id: i64) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM logged_in_users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
