// 数据库模块
// 用户目录与登录登记表

pub mod models;
pub mod repositories;

use async_trait::async_trait;

pub use models::user::User;
pub use repositories::logged_in_user::PgLoginRegistry;
pub use repositories::user::PgUserDirectory;

/// 用户目录
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error>;
}
