mod handler;
mod model;

pub use handler::{login, login_entry, logout, me};
pub use model::{LoginEntryResponse, LoginRequest, LoginResponse};
