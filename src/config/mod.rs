use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::snapshot::KeyFilter;

/// 默认排除的非遥测键
const DEFAULT_DENYLIST: &str = "command_response,commands,fmbxxx";

/// 广播模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastMode {
    /// 每个连接独立轮询
    PerConnection,
    /// 进程内单个轮询任务，按房间扇出
    Shared,
}

impl FromStr for BroadcastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_connection" | "per-connection" => Ok(Self::PerConnection),
            "shared" => Ok(Self::Shared),
            other => Err(format!("unknown broadcast mode: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub broadcast_interval_ms: u64,
    pub broadcast_room: String,
    pub broadcast_mode: BroadcastMode,
    pub snapshot_denylist: Vec<String>,
    pub snapshot_fetch_timeout_ms: u64,
    pub ws_queue_size: usize,
    pub session_ttl_secs: u64,
    pub session_cookie: String,
    pub login_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key))
    }

    /// 从任意变量来源构建配置，必填项缺失时返回错误
    pub fn from_vars<F>(var: F) -> Result<Self, env::VarError>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let optional = |key: &str| var(key).ok().filter(|v| !v.trim().is_empty());

        let broadcast_mode = optional("BROADCAST_MODE")
            .and_then(|v| match v.parse() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    tracing::warn!("{}, falling back to per_connection", e);
                    None
                }
            })
            .unwrap_or(BroadcastMode::PerConnection);

        let snapshot_denylist = parse_list(
            optional("SNAPSHOT_DENYLIST")
                .as_deref()
                .unwrap_or(DEFAULT_DENYLIST),
        );

        Ok(Config {
            database_url: var("DATABASE_URL")?,
            redis_url: var("REDIS_URL")?,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "::".into()),
            server_port: parse_or(optional("SERVER_PORT"), 3000),
            broadcast_interval_ms: parse_or(optional("BROADCAST_INTERVAL_MS"), 500),
            broadcast_room: optional("BROADCAST_ROOM").unwrap_or_else(|| "gps_updates".into()),
            broadcast_mode,
            snapshot_denylist,
            snapshot_fetch_timeout_ms: parse_or(optional("SNAPSHOT_FETCH_TIMEOUT_MS"), 250),
            ws_queue_size: parse_or(optional("WS_QUEUE_SIZE"), 16).max(1),
            session_ttl_secs: parse_or(optional("SESSION_TTL_SECS"), 12 * 3600),
            session_cookie: optional("SESSION_COOKIE").unwrap_or_else(|| "sessionid".into()),
            login_path: optional("LOGIN_PATH").unwrap_or_else(|| "/login/".into()),
        })
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    pub fn snapshot_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_fetch_timeout_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// 房间的组注册键，始终不参与广播
    pub fn group_registration_key(&self) -> String {
        format!("asgi:group:{}", self.broadcast_room)
    }

    pub fn key_filter(&self) -> KeyFilter {
        KeyFilter::new(
            self.snapshot_denylist
                .iter()
                .cloned()
                .chain(std::iter::once(self.group_registration_key())),
        )
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
