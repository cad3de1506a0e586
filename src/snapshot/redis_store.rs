use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{Client as RedisClient, RedisError, aio::MultiplexedConnection};
use serde_json::Value;

use super::{SnapshotHandle, SnapshotStore, StoreError};

/// SCAN 每批返回的键数量提示
const SCAN_BATCH: usize = 500;

/// 基于 RedisJSON 的快照存储
#[derive(Clone)]
pub struct RedisSnapshotStore {
    redis: Arc<RedisClient>,
    fetch_timeout: Duration,
}

impl RedisSnapshotStore {
    pub fn new(redis: Arc<RedisClient>, fetch_timeout: Duration) -> Self {
        Self {
            redis,
            fetch_timeout,
        }
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn open(&self) -> Result<Box<dyn SnapshotHandle>, StoreError> {
        let conn = self
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::Connection)?;

        Ok(Box::new(RedisSnapshotHandle {
            conn,
            fetch_timeout: self.fetch_timeout,
        }))
    }
}

struct RedisSnapshotHandle {
    conn: MultiplexedConnection,
    fetch_timeout: Duration,
}

#[async_trait]
impl SnapshotHandle for RedisSnapshotHandle {
    async fn list_keys(&mut self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut self.conn)
                .await
                .map_err(StoreError::Connection)?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN 可能重复返回同一个键
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn get_json(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut cmd = redis::cmd("JSON.GET");
        cmd.arg(key);
        let read = cmd.query_async::<Option<String>>(&mut self.conn);

        let raw = match tokio::time::timeout(self.fetch_timeout, read).await {
            Ok(result) => result.map_err(|e| classify(key, e))?,
            Err(_) => {
                return Err(StoreError::Timeout {
                    key: key.to_string(),
                });
            }
        };

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }
}

/// 连接层面的错误上抛，其余（类型错误、超时等）只影响该键
fn classify(key: &str, err: RedisError) -> StoreError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        StoreError::Connection(err)
    } else {
        StoreError::Fetch {
            key: key.to_string(),
            source: err,
        }
    }
}
