//! 测试用的内存实现

use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::AppState;
use crate::cache::CachedSession;
use crate::config::Config;
use crate::database::{User, UserDirectory};
use crate::session::{LoginRegistry, SessionAuthority, SessionError, SessionStore};
use crate::snapshot::{SnapshotHandle, SnapshotStore, StoreError};
use crate::utils::generate_session_key;
use crate::ws::RoomRegistry;

fn io_error(msg: &'static str) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::IoError, msg))
}

#[derive(Default)]
struct SnapshotState {
    entries: HashMap<String, Value>,
    failing: HashMap<String, usize>,
    vanishing: HashSet<String>,
    broken: bool,
}

#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    state: Arc<Mutex<SnapshotState>>,
    open: Arc<AtomicUsize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, value: Value) {
        self.state.lock().unwrap().entries.insert(key.to_string(), value);
    }

    /// 接下来 `times` 次读取该键超时
    pub fn fail_key(&self, key: &str, times: usize) {
        self.state.lock().unwrap().failing.insert(key.to_string(), times);
    }

    /// 键仍会被列出，但读取时已被删除
    pub fn vanish_on_read(&self, key: &str) {
        self.state.lock().unwrap().vanishing.insert(key.to_string());
    }

    pub fn break_connection(&self) {
        self.state.lock().unwrap().broken = true;
    }

    pub fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn open(&self) -> Result<Box<dyn SnapshotHandle>, StoreError> {
        if self.state.lock().unwrap().broken {
            return Err(StoreError::Connection(io_error("connection refused")));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySnapshotHandle {
            state: self.state.clone(),
            open: self.open.clone(),
        }))
    }
}

struct MemorySnapshotHandle {
    state: Arc<Mutex<SnapshotState>>,
    open: Arc<AtomicUsize>,
}

impl Drop for MemorySnapshotHandle {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotHandle for MemorySnapshotHandle {
    async fn list_keys(&mut self) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().unwrap();
        if state.broken {
            return Err(StoreError::Connection(io_error("connection reset")));
        }
        Ok(state.entries.keys().cloned().collect())
    }

    async fn get_json(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.broken {
            return Err(StoreError::Connection(io_error("connection reset")));
        }
        if let Some(remaining) = state.failing.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Timeout {
                    key: key.to_string(),
                });
            }
        }
        if state.vanishing.remove(key) {
            state.entries.remove(key);
            return Ok(None);
        }
        Ok(state.entries.get(key).cloned())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, CachedSession>>,
    fail_deletes: AtomicBool,
}

impl MemorySessionStore {
    pub fn insert(&self, session: CachedSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.session_key.clone(), session);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: i64, ttl: Duration) -> Result<CachedSession, SessionError> {
        let session = CachedSession::new(generate_session_key(), user_id, ttl.as_secs());
        self.insert(session.clone());
        Ok(session)
    }

    async fn load(&self, key: &str) -> Result<Option<CachedSession>, SessionError> {
        Ok(self.sessions.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, SessionError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(SessionError::Store(io_error("delete failed")));
        }
        Ok(self.sessions.lock().unwrap().remove(key).is_some())
    }
}

#[derive(Default)]
pub struct MemoryLoginRegistry {
    current: Mutex<HashMap<i64, String>>,
}

#[async_trait]
impl LoginRegistry for MemoryLoginRegistry {
    async fn swap(&self, user_id: i64, session_key: &str) -> Result<Option<String>, SessionError> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .insert(user_id, session_key.to_string()))
    }

    async fn current(&self, user_id: i64) -> Result<Option<String>, SessionError> {
        Ok(self.current.lock().unwrap().get(&user_id).cloned())
    }

    async fn clear(&self, user_id: i64) -> Result<(), SessionError> {
        self.current.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<i64, User>>,
}

impl MemoryUserDirectory {
    pub fn add_user(&self, id: i64, username: &str, password: &str) {
        let user = User {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: bcrypt::hash(password, 4).unwrap(),
            is_active: true,
        };
        self.users.lock().unwrap().insert(id, user);
    }

    pub fn remove_user(&self, id: i64) {
        self.users.lock().unwrap().remove(&id);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}

pub fn test_config() -> Config {
    Config::from_vars(|key| match key {
        "DATABASE_URL" => Ok("postgres://localhost/fleetcast_test".into()),
        "REDIS_URL" => Ok("redis://127.0.0.1/".into()),
        _ => Err(env::VarError::NotPresent),
    })
    .unwrap()
}

/// 由内存实现组装的应用状态
pub struct TestApp {
    pub state: AppState,
    pub users: Arc<MemoryUserDirectory>,
    pub sessions: Arc<MemorySessionStore>,
    pub logins: Arc<MemoryLoginRegistry>,
    pub snapshots: MemorySnapshotStore,
}

impl TestApp {
    pub fn new() -> Self {
        let config = test_config();
        let users = Arc::new(MemoryUserDirectory::default());
        let sessions = Arc::new(MemorySessionStore::default());
        let logins = Arc::new(MemoryLoginRegistry::default());
        let snapshots = MemorySnapshotStore::new();

        let state = AppState {
            users: users.clone(),
            sessions: Arc::new(SessionAuthority::new(
                sessions.clone(),
                logins.clone(),
                config.session_ttl(),
            )),
            snapshots: Arc::new(snapshots.clone()),
            rooms: Arc::new(RoomRegistry::new()),
            config,
        };

        Self {
            state,
            users,
            sessions,
            logins,
            snapshots,
        }
    }
}
