use crate::domain::entities::Post;
use async_trait::async_trait;

/// Ordered cache of the posts currently materialized for display.
///
/// Order is whatever the Paginator established (newest-first); mutations
/// preserve record positions. Ids are unique at every observable point.
#[async_trait]
pub trait FeedCache: Send + Sync {
    /// Discard prior contents and install a new ordered sequence.
    async fn replace_all(&self, posts: Vec<Post>);

    /// Append a page to the end. Does not deduplicate; the caller guarantees
    /// the page does not overlap already-loaded records.
    async fn append_page(&self, posts: Vec<Post>);

    /// Replace in place when the id exists, otherwise insert at the front.
    async fn upsert(&self, post: Post);

    /// Remove by id, returning the prior position and record so a failed
    /// optimistic delete can be rolled back. No-op when absent.
    async fn remove(&self, id: &str) -> Option<(usize, Post)>;

    /// Re-insert a record at a specific position (rollback path). Indexes
    /// past the end append.
    async fn insert_at(&self, index: usize, post: Post);

    /// Read-only lookup by id.
    async fn find(&self, id: &str) -> Option<Post>;

    /// Copy of the current ordered sequence.
    async fn snapshot(&self) -> Vec<Post>;

    async fn clear(&self);

    async fn len(&self) -> usize;
}
