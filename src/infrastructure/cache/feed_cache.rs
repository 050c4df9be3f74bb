use crate::application::ports::cache::FeedCache;
use crate::domain::entities::Post;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Vec-backed ordered feed cache. One instance per screen/session context;
/// position equals display position.
#[derive(Clone)]
pub struct FeedCacheService {
    posts: Arc<RwLock<Vec<Post>>>,
}

impl FeedCacheService {
    pub fn new() -> Self {
        Self {
            posts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn replace_all(&self, posts: Vec<Post>) {
        let mut guard = self.posts.write().await;
        *guard = posts;
    }

    pub async fn append_page(&self, mut posts: Vec<Post>) {
        let mut guard = self.posts.write().await;
        guard.append(&mut posts);
    }

    /// Replace in place when the id exists so the record keeps its display
    /// position; otherwise the record is new and goes to the front.
    pub async fn upsert(&self, post: Post) {
        let mut guard = self.posts.write().await;
        match guard.iter().position(|existing| existing.id == post.id) {
            Some(index) => guard[index] = post,
            None => guard.insert(0, post),
        }
    }

    pub async fn remove(&self, id: &str) -> Option<(usize, Post)> {
        let mut guard = self.posts.write().await;
        let index = guard.iter().position(|post| post.id == id)?;
        Some((index, guard.remove(index)))
    }

    pub async fn insert_at(&self, index: usize, post: Post) {
        let mut guard = self.posts.write().await;
        let index = index.min(guard.len());
        guard.insert(index, post);
    }

    pub async fn find(&self, id: &str) -> Option<Post> {
        let guard = self.posts.read().await;
        guard.iter().find(|post| post.id == id).cloned()
    }

    pub async fn snapshot(&self) -> Vec<Post> {
        let guard = self.posts.read().await;
        guard.clone()
    }

    pub async fn clear(&self) {
        let mut guard = self.posts.write().await;
        guard.clear();
    }

    pub async fn len(&self) -> usize {
        let guard = self.posts.read().await;
        guard.len()
    }
}

impl Default for FeedCacheService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedCache for FeedCacheService {
    async fn replace_all(&self, posts: Vec<Post>) {
        FeedCacheService::replace_all(self, posts).await;
    }

    async fn append_page(&self, posts: Vec<Post>) {
        FeedCacheService::append_page(self, posts).await;
    }

    async fn upsert(&self, post: Post) {
        FeedCacheService::upsert(self, post).await;
    }

    async fn remove(&self, id: &str) -> Option<(usize, Post)> {
        FeedCacheService::remove(self, id).await
    }

    async fn insert_at(&self, index: usize, post: Post) {
        FeedCacheService::insert_at(self, index, post).await;
    }

    async fn find(&self, id: &str) -> Option<Post> {
        FeedCacheService::find(self, id).await
    }

    async fn snapshot(&self) -> Vec<Post> {
        FeedCacheService::snapshot(self).await
    }

    async fn clear(&self) {
        FeedCacheService::clear(self).await;
    }

    async fn len(&self) -> usize {
        FeedCacheService::len(self).await
    }
}
