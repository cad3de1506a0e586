//! 实时位置推送通道 `/ws/gps/`

mod broadcaster;
mod handler;
mod registry;

pub use broadcaster::{FeedExit, SnapshotFeed};
pub use handler::gps_socket;
pub use registry::{CLOSE_SESSION_SUPERSEDED, Connection, ConnectionId, Membership, RoomRegistry};
