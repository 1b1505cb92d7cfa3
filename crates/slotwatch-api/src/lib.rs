// slotwatch-api: Async Rust client for a process node's slot and cron endpoints

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::NodeClient;
pub use error::Error;
pub use models::CronTask;
pub use transport::TransportConfig;
