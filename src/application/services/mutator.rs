use crate::application::ports::cache::FeedCache;
use crate::application::ports::remote_store::PostStore;
use crate::domain::entities::{NewPost, Post, PostPatch};
use crate::domain::value_objects::ToggleField;
use crate::shared::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Local-first mutations over the feed cache: the cache is written before
/// the remote call is issued, and restored to the captured pre-state if the
/// call fails. No partial mutation survives a failure.
pub struct OptimisticMutator {
    cache: Arc<dyn FeedCache>,
    store: Arc<dyn PostStore>,
    viewer_id: String,
    in_flight: Mutex<HashSet<(String, ToggleField)>>,
}

impl OptimisticMutator {
    pub fn new(
        cache: Arc<dyn FeedCache>,
        store: Arc<dyn PostStore>,
        viewer_id: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            store,
            viewer_id: viewer_id.into(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Toggle the viewer's like. Returns the new local liked state.
    pub async fn toggle_like(&self, post_id: &str) -> Result<bool, AppError> {
        self.apply_toggle(post_id, ToggleField::Liked).await
    }

    /// Toggle the viewer's bookmark. Returns the new local bookmarked state.
    pub async fn toggle_bookmark(&self, post_id: &str) -> Result<bool, AppError> {
        self.apply_toggle(post_id, ToggleField::Bookmarked).await
    }

    async fn apply_toggle(&self, post_id: &str, field: ToggleField) -> Result<bool, AppError> {
        let prior = self.cache.find(post_id).await.ok_or_else(|| {
            AppError::NotFound(format!("post {post_id} is not in the feed"))
        })?;

        // One in-flight toggle per (id, field); a second is rejected, never
        // queued, so two rapid toggles cannot race their rollbacks.
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert((post_id.to_string(), field)) {
                return Err(AppError::Busy(format!(
                    "{} toggle already in flight for post {post_id}",
                    field.as_str()
                )));
            }
        }

        let mut updated = prior.clone();
        updated.toggle(field);
        let local_state = updated.flag(field);
        self.cache.upsert(updated).await;

        let result = match field {
            ToggleField::Liked => self.store.toggle_post_like(post_id, &self.viewer_id).await,
            ToggleField::Bookmarked => {
                self.store
                    .toggle_post_bookmark(post_id, &self.viewer_id)
                    .await
            }
        };

        let outcome = match result {
            Ok(remote_state) => {
                if remote_state != local_state {
                    // The authoritative correction arrives through the change
                    // feed; never merged arithmetically here.
                    debug!(
                        post_id,
                        field = field.as_str(),
                        "remote toggle state differs from local"
                    );
                }
                Ok(local_state)
            }
            Err(err) => {
                warn!(post_id, field = field.as_str(), error = %err, "toggle failed, rolling back");
                self.cache.upsert(prior).await;
                Err(err)
            }
        };

        let mut in_flight = self.in_flight.lock().await;
        in_flight.remove(&(post_id.to_string(), field));
        outcome
    }

    /// Create a post. Not optimistic: the id is server-assigned, so the
    /// record enters the cache (at the front) only once the store returns it.
    pub async fn create_post(&self, draft: NewPost) -> Result<Post, AppError> {
        let post = self.store.create_post(draft).await?;
        self.cache.upsert(post.clone()).await;
        Ok(post)
    }

    /// Edit a post in place. Rollback restores the prior field values.
    pub async fn edit_post(&self, patch: PostPatch) -> Result<Post, AppError> {
        let prior = self.cache.find(&patch.id).await.ok_or_else(|| {
            AppError::NotFound(format!("post {} is not in the feed", patch.id))
        })?;

        let mut updated = prior.clone();
        updated.merge(&patch);
        self.cache.upsert(updated.clone()).await;

        match self.store.update_post(&patch).await {
            Ok(_canonical) => Ok(updated),
            Err(err) => {
                warn!(post_id = %patch.id, error = %err, "edit failed, restoring prior record");
                self.cache.upsert(prior).await;
                Err(err)
            }
        }
    }

    /// Delete a post. Rollback re-inserts the record at its prior position.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), AppError> {
        let Some((index, prior)) = self.cache.remove(post_id).await else {
            return Err(AppError::NotFound(format!(
                "post {post_id} is not in the feed"
            )));
        };

        match self.store.delete_post(post_id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(post_id, error = %err, "delete failed, re-inserting record");
                self.cache.insert_at(index, prior).await;
                Err(err)
            }
        }
    }
}
