//! 快照推送循环
//!
//! 连接建立后先做一次完整扫描并推送（即使为空），之后按固定间隔重新扫描，
//! 只在快照非空时推送。存储句柄在循环退出的任何路径上都会被释放。

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::registry::RoomRegistry;
use crate::config::Config;
use crate::snapshot::{KeyFilter, Snapshot, SnapshotStore, StoreError, collect};

/// 推送循环结束的原因
#[derive(Debug)]
pub enum FeedExit {
    /// 出站队列已关闭（客户端断开）
    Disconnected,
    /// 存储连接失败
    StoreFailed(StoreError),
}

#[derive(Clone)]
pub struct SnapshotFeed {
    store: Arc<dyn SnapshotStore>,
    filter: Arc<KeyFilter>,
    interval: Duration,
}

impl SnapshotFeed {
    pub fn new(store: Arc<dyn SnapshotStore>, filter: KeyFilter, interval: Duration) -> Self {
        Self {
            store,
            filter: Arc::new(filter),
            interval,
        }
    }

    pub fn from_config(store: Arc<dyn SnapshotStore>, config: &Config) -> Self {
        Self::new(store, config.key_filter(), config.broadcast_interval())
    }

    /// 读取一次当前快照
    pub async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let mut handle = self.store.open().await?;
        collect(handle.as_mut(), &self.filter).await
    }

    /// 只推送首次快照（共享模式下之后由房间广播接管）
    pub async fn send_initial(&self, outbound: &mpsc::Sender<Message>) -> Result<(), FeedExit> {
        let snapshot = self.snapshot().await.map_err(FeedExit::StoreFailed)?;
        send(outbound, &snapshot)
            .await
            .map_err(|_| FeedExit::Disconnected)
    }

    /// 单个连接的推送循环
    pub async fn run(&self, outbound: &mpsc::Sender<Message>) -> FeedExit {
        let mut handle = match self.store.open().await {
            Ok(handle) => handle,
            Err(e) => return FeedExit::StoreFailed(e),
        };

        // 首次加载，空快照也推送
        match collect(handle.as_mut(), &self.filter).await {
            Ok(snapshot) => {
                if send(outbound, &snapshot).await.is_err() {
                    return FeedExit::Disconnected;
                }
            }
            Err(e) => return FeedExit::StoreFailed(e),
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = outbound.closed() => return FeedExit::Disconnected,
            }

            let snapshot = match collect(handle.as_mut(), &self.filter).await {
                Ok(snapshot) => snapshot,
                Err(e) => return FeedExit::StoreFailed(e),
            };

            if snapshot.is_empty() {
                continue;
            }
            if send(outbound, &snapshot).await.is_err() {
                return FeedExit::Disconnected;
            }
        }
    }

    /// 共享模式：进程内单个轮询任务，向房间广播非空快照
    pub async fn run_shared(&self, rooms: &RoomRegistry, room: &str) -> StoreError {
        let mut handle = match self.store.open().await {
            Ok(handle) => handle,
            Err(e) => return e,
        };
        info!(room, "Shared snapshot feed started");

        loop {
            tokio::time::sleep(self.interval).await;

            if rooms.member_count(room) == 0 {
                continue;
            }

            let snapshot = match collect(handle.as_mut(), &self.filter).await {
                Ok(snapshot) => snapshot,
                Err(e) => return e,
            };
            if snapshot.is_empty() {
                continue;
            }

            if let Some(message) = encode(&snapshot) {
                let delivered = rooms.broadcast(room, message);
                debug!(room, delivered, keys = snapshot.len(), "Broadcast snapshot");
            }
        }
    }

    /// 共享推送的监督循环，存储失败后等待一个间隔再重新连接
    pub async fn supervise_shared(self, rooms: Arc<RoomRegistry>, room: String) {
        loop {
            let e = self.run_shared(&rooms, &room).await;
            warn!(room = %room, error = %e, "Shared snapshot feed stopped, restarting");
            tokio::time::sleep(self.interval).await;
        }
    }
}

fn encode(snapshot: &Snapshot) -> Option<Message> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(error = %e, "Failed to serialize snapshot");
            None
        }
    }
}

async fn send(outbound: &mpsc::Sender<Message>, snapshot: &Snapshot) -> Result<(), ()> {
    match encode(snapshot) {
        Some(message) => outbound.send(message).await.map_err(|_| ()),
        None => Ok(()),
    }
}
