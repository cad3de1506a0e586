mod error_handler;
mod session;

pub use error_handler::{log_errors, recover_stale_session};
pub use session::{CurrentSession, clear_session_cookie, require_session, session_cookie};
