// 缓存模块
// 会话记录保存在 Redis 中，删除记录即令会话失效

pub mod keys;
pub mod models;
pub mod operations;

pub use models::session::CachedSession;
pub use operations::session::RedisSessionStore;
