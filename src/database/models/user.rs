use serde::Serialize;
use sqlx::FromRow;

use crate::utils::verify_password;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
}

impl User {
    /// 校验登录密码，停用账号一律拒绝
    pub async fn verify_login(&self, password: &str) -> Result<bool, bcrypt::BcryptError> {
        if !self.is_active {
            return Ok(false);
        }

        let password = password.to_owned();
        let hash = self.password_hash.clone();
        // bcrypt 计算较慢，放到阻塞线程池
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .unwrap_or(Err(bcrypt::BcryptError::InvalidHash(String::new())))
    }
}
