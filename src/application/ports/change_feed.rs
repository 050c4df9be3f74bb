use crate::domain::value_objects::RawChangeEvent;
use crate::shared::error::AppError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Proof of an active channel subscription. Owned by whoever subscribed
/// (the Reconciler), never stored in process-wide state; `unsubscribe`
/// consumes it so a released handle cannot be reused.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub id: u64,
    pub table: String,
}

/// Push-based change feed keyed by table name.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Start delivering change events for `table` into `sender`.
    async fn subscribe(
        &self,
        table: &str,
        sender: mpsc::UnboundedSender<RawChangeEvent>,
    ) -> Result<SubscriptionHandle, AppError>;

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), AppError>;
}
