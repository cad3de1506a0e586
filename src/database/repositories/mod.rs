pub mod logged_in_user;
pub mod user;
