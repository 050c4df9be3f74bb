use crate::application::ports::cache::FeedCache;
use crate::application::ports::change_feed::{ChangeFeed, SubscriptionHandle};
use crate::domain::value_objects::{ChangeEvent, RawChangeEvent, POSTS_TABLE};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Active {
        handle: SubscriptionHandle,
        events: mpsc::UnboundedReceiver<RawChangeEvent>,
    },
}

/// Applies post-table change events from the push feed to the feed cache.
///
/// The push feed is a freshness optimization layered on top of authoritative
/// pagination: duplicates are tolerated, an update arriving before its insert
/// is dropped, and the viewer's own echoes are skipped because the
/// optimistic mutator already applied them at lower latency.
pub struct Reconciler {
    cache: Arc<dyn FeedCache>,
    feed: Arc<dyn ChangeFeed>,
    viewer_id: String,
    state: Mutex<SubscriptionState>,
    drain_batch: usize,
}

impl Reconciler {
    pub fn new(
        cache: Arc<dyn FeedCache>,
        feed: Arc<dyn ChangeFeed>,
        viewer_id: impl Into<String>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            cache,
            feed,
            viewer_id: viewer_id.into(),
            state: Mutex::new(SubscriptionState::Unsubscribed),
            drain_batch: config.drain_batch,
        }
    }

    /// Open a channel for post-table events. At most one channel is active
    /// per reconciler; an existing one is torn down first so events are
    /// never delivered twice.
    pub async fn subscribe(&self) -> Result<(), AppError> {
        self.teardown().await?;

        {
            let mut state = self.state.lock().await;
            *state = SubscriptionState::Subscribing;
        }

        let (sender, events) = mpsc::unbounded_channel();
        match self.feed.subscribe(POSTS_TABLE, sender).await {
            Ok(handle) => {
                let mut state = self.state.lock().await;
                *state = SubscriptionState::Active { handle, events };
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                *state = SubscriptionState::Unsubscribed;
                Err(err)
            }
        }
    }

    /// Release the active channel, if any. In-flight events still queued on
    /// the channel are discarded with it.
    pub async fn teardown(&self) -> Result<(), AppError> {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, SubscriptionState::Unsubscribed)
        };

        if let SubscriptionState::Active { handle, .. } = previous {
            self.feed.unsubscribe(handle).await?;
        }
        Ok(())
    }

    pub async fn is_active(&self) -> bool {
        matches!(*self.state.lock().await, SubscriptionState::Active { .. })
    }

    /// Drain queued events and apply them, up to the configured batch size.
    /// Returns how many events were taken off the channel.
    pub async fn process_pending(&self) -> usize {
        let pending = {
            let mut state = self.state.lock().await;
            let SubscriptionState::Active { events, .. } = &mut *state else {
                return 0;
            };
            let mut pending = Vec::new();
            while pending.len() < self.drain_batch {
                match events.try_recv() {
                    Ok(raw) => pending.push(raw),
                    Err(_) => break,
                }
            }
            pending
        };

        let count = pending.len();
        for raw in pending {
            self.handle_change_event(raw).await;
        }
        count
    }

    /// Apply one change event. Side effect only: a bad event is logged and
    /// dropped so the stream keeps flowing.
    pub async fn handle_change_event(&self, raw: RawChangeEvent) {
        if raw.table != POSTS_TABLE {
            debug!(table = %raw.table, "ignoring change event for unwatched table");
            return;
        }

        if raw.author_id.as_deref() == Some(self.viewer_id.as_str()) {
            debug!("dropping self-originated change event");
            return;
        }

        let event = match ChangeEvent::parse(&raw) {
            Ok(event) => event,
            Err(err) => {
                warn!(table = %raw.table, op = ?raw.op, error = %err, "dropping malformed change event");
                return;
            }
        };

        // Untagged events can still reveal the author in the record itself.
        if event.record_author_id() == Some(self.viewer_id.as_str()) {
            debug!("dropping self-originated change event");
            return;
        }

        match event {
            ChangeEvent::Insert(post) => {
                // The record may already be here via a concurrent page fetch.
                if self.cache.find(&post.id).await.is_some() {
                    debug!(post_id = %post.id, "insert already materialized, skipping");
                    return;
                }
                self.cache.upsert(*post).await;
            }
            ChangeEvent::Update(patch) => {
                let Some(mut existing) = self.cache.find(&patch.id).await else {
                    // No synthesis from partials; the record will arrive
                    // whole through pagination if it matters.
                    debug!(post_id = %patch.id, "update for uncached record, skipping");
                    return;
                };
                existing.merge(&patch);
                self.cache.upsert(existing).await;
            }
            ChangeEvent::Delete { id } => {
                self.cache.remove(&id).await;
            }
        }
    }
}
