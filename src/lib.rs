use std::sync::Arc;

use config::Config;
use database::UserDirectory;
use session::SessionAuthority;
use snapshot::SnapshotStore;
use ws::RoomRegistry;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod result;
pub mod router;
pub mod routes;
pub mod session;
pub mod snapshot;
pub mod utils;
pub mod ws;

#[cfg(test)]
pub(crate) mod test_support;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserDirectory>,
    pub sessions: Arc<SessionAuthority>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub rooms: Arc<RoomRegistry>,
}
