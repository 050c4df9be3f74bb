pub mod config;
pub mod error;

pub use config::{AppConfig, FeedConfig, SyncConfig};
pub use error::{AppError, Result};
