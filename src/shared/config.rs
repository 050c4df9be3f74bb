use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Records fetched per page.
    pub page_size: usize,
    /// Upper bound accepted from callers that override `page_size`.
    pub max_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum change events applied per `process_pending` drain.
    pub drain_batch: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_page_size: 100,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { drain_batch: 256 }
    }
}
