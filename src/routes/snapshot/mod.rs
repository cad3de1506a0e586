mod handler;

pub use handler::current_snapshot;
