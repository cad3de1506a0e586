//! 房间登记表
//!
//! 记录每个在线连接所属的房间，支持按房间扇出。只保存在进程内存中，
//! 不提供跨进程广播。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// 会话被顶替时的关闭码
pub const CLOSE_SESSION_SUPERSEDED: u16 = 4001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// 一个在线连接的出站端
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    /// 打开连接时使用的会话键
    pub session_key: Option<String>,
    pub sender: mpsc::Sender<Message>,
    /// 与数据队列分开的关闭信号，队列已满时也能送达
    pub shutdown: Arc<Notify>,
}

impl Connection {
    pub fn new(session_key: Option<String>, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id: ConnectionId::generate(),
            session_key,
            sender,
            shutdown: Arc::new(Notify::new()),
        }
    }
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, HashMap<ConnectionId, Connection>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, connection: Connection, room: &str) {
        debug!(conn_id = %connection.id, room, "Joining room");
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection.id, connection);
    }

    pub fn leave(&self, id: ConnectionId, room: &str) {
        debug!(conn_id = %id, room, "Leaving room");
        let emptied = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.remove(&id);
                members.is_empty()
            }
            None => false,
        };
        if emptied {
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }
    }

    /// 向房间内所有连接尝试发送消息，返回成功入队的数量
    ///
    /// 不等待慢连接：队列已满的连接本次直接跳过。
    pub fn broadcast(&self, room: &str, message: Message) -> usize {
        let Some(members) = self.rooms.get(room) else {
            return 0;
        };

        let mut delivered = 0;
        for connection in members.values() {
            match connection.sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(conn_id = %connection.id, room, "Outbound queue full, dropping message");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// 通知使用指定会话键打开的所有连接关闭，返回通知的数量
    ///
    /// 关闭帧由连接自身直接写入套接字，不经过出站队列。
    pub fn disconnect_session(&self, session_key: &str) -> usize {
        let mut closed = 0;
        for members in self.rooms.iter() {
            for connection in members.values() {
                if connection.session_key.as_deref() == Some(session_key) {
                    // 没有等待者时保留许可，稍后进入等待也会立即返回
                    connection.shutdown.notify_one();
                    closed += 1;
                }
            }
        }
        closed
    }

    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }
}

/// 房间成员资格，释放时自动离开房间
pub struct Membership {
    registry: Arc<RoomRegistry>,
    id: ConnectionId,
    room: String,
}

impl Membership {
    pub fn enter(registry: Arc<RoomRegistry>, connection: Connection, room: &str) -> Self {
        let id = connection.id;
        registry.join(connection, room);
        Self {
            registry,
            id,
            room: room.to_string(),
        }
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.registry.leave(self.id, &self.room);
    }
}
