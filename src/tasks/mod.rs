pub mod errors;
pub mod feed_monitor;
pub mod manager;
pub mod scheduler;
pub mod types;

pub use manager::JobManager;
