//! 遥测快照存储
//!
//! 快照存储由外部写入进程维护，这里只做只读访问：列出键、按键读取 JSON 值。

mod filter;
mod redis_store;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

pub use filter::KeyFilter;
pub use redis_store::RedisSnapshotStore;

/// 一次扫描的结果：键 → 任意 JSON 值
pub type Snapshot = BTreeMap<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot store connection failed: {0}")]
    Connection(#[source] redis::RedisError),
    #[error("failed to read key {key}: {source}")]
    Fetch {
        key: String,
        source: redis::RedisError,
    },
    #[error("timed out reading key {key}")]
    Timeout { key: String },
    #[error("key {key} does not hold valid JSON: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    /// 单键错误只影响当前键，连接错误终止整个扫描
    pub fn is_transient(&self) -> bool {
        !matches!(self, StoreError::Connection(_))
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 获取一个存储句柄，句柄释放即归还连接
    async fn open(&self) -> Result<Box<dyn SnapshotHandle>, StoreError>;
}

#[async_trait]
pub trait SnapshotHandle: Send {
    /// 列出所有键，不保证顺序
    async fn list_keys(&mut self) -> Result<Vec<String>, StoreError>;

    /// 读取并解析键的 JSON 值，键不存在时返回 None
    async fn get_json(&mut self, key: &str) -> Result<Option<Value>, StoreError>;
}

/// 扫描一次存储，返回过滤后的完整快照
pub async fn collect(
    handle: &mut dyn SnapshotHandle,
    filter: &KeyFilter,
) -> Result<Snapshot, StoreError> {
    let keys = handle.list_keys().await?;
    let mut snapshot = Snapshot::new();

    for key in keys.into_iter().filter(|k| filter.allows(k)) {
        match handle.get_json(&key).await {
            Ok(Some(value)) => {
                snapshot.insert(key, value);
            }
            // 列出后被删除
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                tracing::debug!(key = %key, error = %e, "Skipping snapshot key");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::MemorySnapshotStore;

    fn filter() -> KeyFilter {
        KeyFilter::new(["command_response", "commands", "fmbxxx"])
    }

    #[tokio::test]
    async fn only_numeric_non_reserved_keys_are_collected() {
        let store = MemorySnapshotStore::new();
        store.put("101", json!({"lat": 4.6, "lng": -74.1}));
        store.put("command_response", json!({"ok": true}));
        store.put("abc", json!({"x": 1}));

        let mut handle = store.open().await.unwrap();
        let snapshot = collect(handle.as_mut(), &filter()).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["101"], json!({"lat": 4.6, "lng": -74.1}));
    }

    #[tokio::test]
    async fn transient_failure_skips_only_that_key() {
        let store = MemorySnapshotStore::new();
        store.put("101", json!(1));
        store.put("102", json!(2));
        store.fail_key("102", 1);

        let mut handle = store.open().await.unwrap();
        let first = collect(handle.as_mut(), &filter()).await.unwrap();
        assert_eq!(first.keys().collect::<Vec<_>>(), ["101"]);

        let second = collect(handle.as_mut(), &filter()).await.unwrap();
        assert_eq!(second.keys().collect::<Vec<_>>(), ["101", "102"]);
    }

    #[tokio::test]
    async fn key_deleted_between_list_and_get_is_absent() {
        let store = MemorySnapshotStore::new();
        store.put("101", json!(1));
        store.put("102", json!(2));
        store.vanish_on_read("101");

        let mut handle = store.open().await.unwrap();
        let snapshot = collect(handle.as_mut(), &filter()).await.unwrap();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), ["102"]);
    }

    #[tokio::test]
    async fn connection_failure_aborts_the_scan() {
        let store = MemorySnapshotStore::new();
        store.put("101", json!(1));
        let mut handle = store.open().await.unwrap();
        store.break_connection();

        let err = collect(handle.as_mut(), &filter()).await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn decode_and_timeout_errors_are_transient() {
        let decode = StoreError::Decode {
            key: "101".into(),
            source: serde_json::from_str::<Value>("{").unwrap_err(),
        };
        assert!(decode.is_transient());
        assert!(StoreError::Timeout { key: "101".into() }.is_transient());
    }
}
