use crate::application::ports::cache::FeedCache;
use crate::application::ports::remote_store::CommentStore;
use crate::domain::entities::{Author, Comment, Reply};
use crate::shared::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Per-post comment threads with the same local-first contract as the feed:
/// toggles and deletes hit the local thread before the remote store and roll
/// back on failure.
///
/// Creating a top-level comment bumps the parent post's `comments` counter
/// in the feed cache; creating a reply does not (the counter counts
/// top-level comments only).
pub struct CommentService {
    store: Arc<dyn CommentStore>,
    feed_cache: Arc<dyn FeedCache>,
    viewer_id: String,
    threads: RwLock<HashMap<String, Vec<Comment>>>,
    in_flight: Mutex<HashSet<String>>,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        feed_cache: Arc<dyn FeedCache>,
        viewer_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            feed_cache,
            viewer_id: viewer_id.into(),
            threads: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Fetch and materialize the full thread for a post: comments with
    /// replies inline and viewer like-state already joined by the store.
    pub async fn load_thread(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        let comments = self.store.fetch_comments(post_id).await?;
        let mut threads = self.threads.write().await;
        threads.insert(post_id.to_string(), comments.clone());
        Ok(comments)
    }

    /// Snapshot of a materialized thread, if loaded.
    pub async fn thread(&self, post_id: &str) -> Option<Vec<Comment>> {
        let threads = self.threads.read().await;
        threads.get(post_id).cloned()
    }

    pub async fn clear(&self) {
        let mut threads = self.threads.write().await;
        threads.clear();
    }

    /// Create a top-level comment. The id is server-assigned, so the thread
    /// and the post counter are updated once the store returns the record.
    pub async fn create_comment(
        &self,
        post_id: &str,
        author: Author,
        body: String,
    ) -> Result<Comment, AppError> {
        let comment = self.store.create_comment(post_id, author, body).await?;

        {
            let mut threads = self.threads.write().await;
            threads
                .entry(post_id.to_string())
                .or_default()
                .push(comment.clone());
        }

        if let Some(mut post) = self.feed_cache.find(post_id).await {
            post.increment_comments();
            self.feed_cache.upsert(post).await;
        }

        Ok(comment)
    }

    /// Delete a top-level comment. Rollback re-inserts the comment at its
    /// prior position and restores the post counter.
    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), AppError> {
        let (index, removed) = {
            let mut threads = self.threads.write().await;
            let thread = threads.get_mut(post_id).ok_or_else(|| {
                AppError::NotFound(format!("thread for post {post_id} is not loaded"))
            })?;
            let index = thread
                .iter()
                .position(|comment| comment.id == comment_id)
                .ok_or_else(|| {
                    AppError::NotFound(format!("comment {comment_id} is not in the thread"))
                })?;
            (index, thread.remove(index))
        };

        let prior_post = self.feed_cache.find(post_id).await;
        if let Some(post) = &prior_post {
            let mut decremented = post.clone();
            decremented.decrement_comments();
            self.feed_cache.upsert(decremented).await;
        }

        match self.store.delete_comment(comment_id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(post_id, comment_id, error = %err, "comment delete failed, rolling back");
                {
                    let mut threads = self.threads.write().await;
                    if let Some(thread) = threads.get_mut(post_id) {
                        let index = index.min(thread.len());
                        thread.insert(index, removed);
                    }
                }
                if let Some(post) = prior_post {
                    self.feed_cache.upsert(post).await;
                }
                Err(err)
            }
        }
    }

    /// Create a reply under a comment. Does not touch the post counter.
    pub async fn create_reply(
        &self,
        post_id: &str,
        comment_id: &str,
        author: Author,
        body: String,
    ) -> Result<Reply, AppError> {
        let reply = self.store.create_reply(comment_id, author, body).await?;

        let mut threads = self.threads.write().await;
        let Some(thread) = threads.get_mut(post_id) else {
            debug!(post_id, "reply created for unloaded thread");
            return Ok(reply);
        };
        if let Some(comment) = thread.iter_mut().find(|comment| comment.id == comment_id) {
            comment.add_reply(reply.clone());
        }
        Ok(reply)
    }

    /// Delete a reply. Rollback restores it at its prior position.
    pub async fn delete_reply(
        &self,
        post_id: &str,
        comment_id: &str,
        reply_id: &str,
    ) -> Result<(), AppError> {
        let (index, removed) = {
            let mut threads = self.threads.write().await;
            let comment = Self::find_comment(&mut threads, post_id, comment_id)?;
            let index = comment
                .replies
                .iter()
                .position(|reply| reply.id == reply_id)
                .ok_or_else(|| {
                    AppError::NotFound(format!("reply {reply_id} is not in the thread"))
                })?;
            (index, comment.replies.remove(index))
        };

        match self.store.delete_reply(reply_id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(post_id, comment_id, reply_id, error = %err, "reply delete failed, rolling back");
                let mut threads = self.threads.write().await;
                if let Ok(comment) = Self::find_comment(&mut threads, post_id, comment_id) {
                    let index = index.min(comment.replies.len());
                    comment.replies.insert(index, removed);
                }
                Err(err)
            }
        }
    }

    /// Toggle the viewer's like on a comment. Returns the new local state.
    pub async fn toggle_comment_like(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<bool, AppError> {
        self.claim(comment_id).await?;
        let prior = {
            let mut threads = self.threads.write().await;
            match Self::find_comment(&mut threads, post_id, comment_id) {
                Ok(comment) => {
                    let prior = comment.clone();
                    comment.toggle_like();
                    prior
                }
                Err(err) => {
                    drop(threads);
                    self.release(comment_id).await;
                    return Err(err);
                }
            }
        };

        let result = self
            .store
            .toggle_comment_like(comment_id, &self.viewer_id)
            .await;
        let outcome = match result {
            Ok(_) => Ok(!prior.liked_by_viewer),
            Err(err) => {
                warn!(post_id, comment_id, error = %err, "comment like failed, rolling back");
                let mut threads = self.threads.write().await;
                if let Ok(comment) = Self::find_comment(&mut threads, post_id, comment_id) {
                    *comment = prior;
                }
                Err(err)
            }
        };
        self.release(comment_id).await;
        outcome
    }

    /// Toggle the viewer's like on a reply. Returns the new local state.
    pub async fn toggle_reply_like(
        &self,
        post_id: &str,
        comment_id: &str,
        reply_id: &str,
    ) -> Result<bool, AppError> {
        self.claim(reply_id).await?;
        let prior = {
            let mut threads = self.threads.write().await;
            let found = Self::find_comment(&mut threads, post_id, comment_id).and_then(|comment| {
                comment
                    .replies
                    .iter_mut()
                    .find(|reply| reply.id == reply_id)
                    .ok_or_else(|| {
                        AppError::NotFound(format!("reply {reply_id} is not in the thread"))
                    })
            });
            match found {
                Ok(reply) => {
                    let prior = reply.clone();
                    reply.toggle_like();
                    prior
                }
                Err(err) => {
                    drop(threads);
                    self.release(reply_id).await;
                    return Err(err);
                }
            }
        };

        let result = self.store.toggle_reply_like(reply_id, &self.viewer_id).await;
        let outcome = match result {
            Ok(_) => Ok(!prior.liked_by_viewer),
            Err(err) => {
                warn!(post_id, comment_id, reply_id, error = %err, "reply like failed, rolling back");
                let mut threads = self.threads.write().await;
                if let Ok(comment) = Self::find_comment(&mut threads, post_id, comment_id) {
                    if let Some(reply) = comment
                        .replies
                        .iter_mut()
                        .find(|reply| reply.id == reply_id)
                    {
                        *reply = prior;
                    }
                }
                Err(err)
            }
        };
        self.release(reply_id).await;
        outcome
    }

    fn find_comment<'a>(
        threads: &'a mut HashMap<String, Vec<Comment>>,
        post_id: &str,
        comment_id: &str,
    ) -> Result<&'a mut Comment, AppError> {
        let thread = threads.get_mut(post_id).ok_or_else(|| {
            AppError::NotFound(format!("thread for post {post_id} is not loaded"))
        })?;
        thread
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| AppError::NotFound(format!("comment {comment_id} is not in the thread")))
    }

    async fn claim(&self, entity_id: &str) -> Result<(), AppError> {
        let mut in_flight = self.in_flight.lock().await;
        if !in_flight.insert(entity_id.to_string()) {
            return Err(AppError::Busy(format!(
                "like toggle already in flight for {entity_id}"
            )));
        }
        Ok(())
    }

    async fn release(&self, entity_id: &str) {
        let mut in_flight = self.in_flight.lock().await;
        in_flight.remove(entity_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Post;
    use crate::infrastructure::cache::FeedCacheService;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    struct TestCommentStore {
        fail: AtomicBool,
        seeded: Vec<Comment>,
    }

    impl TestCommentStore {
        fn new() -> Self {
            Self {
                fail: AtomicBool::new(false),
                seeded: Vec::new(),
            }
        }

        fn with_thread(seeded: Vec<Comment>) -> Self {
            Self {
                fail: AtomicBool::new(false),
                seeded,
            }
        }

        fn check(&self) -> Result<(), AppError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::RemoteFailure("injected failure".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CommentStore for TestCommentStore {
        async fn fetch_comments(&self, _: &str) -> Result<Vec<Comment>, AppError> {
            self.check()?;
            Ok(self.seeded.clone())
        }

        async fn create_comment(
            &self,
            post_id: &str,
            author: Author,
            body: String,
        ) -> Result<Comment, AppError> {
            self.check()?;
            Ok(Comment::new(Uuid::new_v4().to_string(), post_id, author, body))
        }

        async fn delete_comment(&self, _: &str) -> Result<(), AppError> {
            self.check()
        }

        async fn create_reply(
            &self,
            comment_id: &str,
            author: Author,
            body: String,
        ) -> Result<Reply, AppError> {
            self.check()?;
            Ok(Reply::new(Uuid::new_v4().to_string(), comment_id, author, body))
        }

        async fn delete_reply(&self, _: &str) -> Result<(), AppError> {
            self.check()
        }

        async fn toggle_comment_like(&self, _: &str, _: &str) -> Result<bool, AppError> {
            self.check()?;
            Ok(true)
        }

        async fn toggle_reply_like(&self, _: &str, _: &str) -> Result<bool, AppError> {
            self.check()?;
            Ok(true)
        }
    }

    fn sample_author() -> Author {
        Author::new("viewer-1", "Viewer")
    }

    fn sample_comment(id: &str, post_id: &str) -> Comment {
        Comment::new(id, post_id, Author::new("other", "Other"), "text")
    }

    async fn setup(
        store: TestCommentStore,
    ) -> (CommentService, Arc<FeedCacheService>, Arc<TestCommentStore>) {
        let cache = Arc::new(FeedCacheService::new());
        cache
            .replace_all(vec![Post::new(
                "post-1",
                Author::new("other", "Other"),
                "title",
                "body",
            )])
            .await;
        let store = Arc::new(store);
        let service = CommentService::new(
            Arc::clone(&store) as Arc<dyn CommentStore>,
            Arc::clone(&cache) as Arc<dyn FeedCache>,
            "viewer-1",
        );
        (service, cache, store)
    }

    #[tokio::test]
    async fn load_thread_materializes_comments() {
        let seeded = vec![sample_comment("c1", "post-1"), sample_comment("c2", "post-1")];
        let (service, _cache, _store) = setup(TestCommentStore::with_thread(seeded)).await;

        let thread = service.load_thread("post-1").await.unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(service.thread("post-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_comment_bumps_post_counter() {
        let (service, cache, _store) = setup(TestCommentStore::new()).await;
        service.load_thread("post-1").await.unwrap();

        service
            .create_comment("post-1", sample_author(), "hello".into())
            .await
            .unwrap();

        assert_eq!(cache.find("post-1").await.unwrap().comments, 1);
        assert_eq!(service.thread("post-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_reply_does_not_bump_post_counter() {
        let seeded = vec![sample_comment("c1", "post-1")];
        let (service, cache, _store) = setup(TestCommentStore::with_thread(seeded)).await;
        service.load_thread("post-1").await.unwrap();

        service
            .create_reply("post-1", "c1", sample_author(), "reply".into())
            .await
            .unwrap();

        assert_eq!(cache.find("post-1").await.unwrap().comments, 0);
        let thread = service.thread("post-1").await.unwrap();
        assert_eq!(thread[0].replies.len(), 1);
    }

    #[tokio::test]
    async fn failed_comment_delete_rolls_back_thread_and_counter() {
        let seeded = vec![sample_comment("c1", "post-1"), sample_comment("c2", "post-1")];
        let (service, cache, store) = setup(TestCommentStore::with_thread(seeded)).await;
        service.load_thread("post-1").await.unwrap();

        let mut post = cache.find("post-1").await.unwrap();
        post.comments = 2;
        cache.upsert(post).await;

        store.fail.store(true, Ordering::SeqCst);
        let err = service.delete_comment("post-1", "c1").await.unwrap_err();
        assert!(err.is_retryable());

        let thread = service.thread("post-1").await.unwrap();
        let ids: Vec<&str> = thread.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(cache.find("post-1").await.unwrap().comments, 2);
    }

    #[tokio::test]
    async fn successful_comment_delete_decrements_counter() {
        let seeded = vec![sample_comment("c1", "post-1")];
        let (service, cache, _store) = setup(TestCommentStore::with_thread(seeded)).await;
        service.load_thread("post-1").await.unwrap();

        let mut post = cache.find("post-1").await.unwrap();
        post.comments = 1;
        cache.upsert(post).await;

        service.delete_comment("post-1", "c1").await.unwrap();
        assert!(service.thread("post-1").await.unwrap().is_empty());
        assert_eq!(cache.find("post-1").await.unwrap().comments, 0);
    }

    #[tokio::test]
    async fn failed_comment_like_restores_prior_state() {
        let mut seeded = sample_comment("c1", "post-1");
        seeded.likes = 3;
        let (service, _cache, store) = setup(TestCommentStore::with_thread(vec![seeded])).await;
        service.load_thread("post-1").await.unwrap();

        store.fail.store(true, Ordering::SeqCst);
        let err = service.toggle_comment_like("post-1", "c1").await.unwrap_err();
        assert!(err.is_retryable());

        let thread = service.thread("post-1").await.unwrap();
        assert_eq!(thread[0].likes, 3);
        assert!(!thread[0].liked_by_viewer);
    }

    #[tokio::test]
    async fn comment_like_is_visible_locally_on_success() {
        let seeded = vec![sample_comment("c1", "post-1")];
        let (service, _cache, _store) = setup(TestCommentStore::with_thread(seeded)).await;
        service.load_thread("post-1").await.unwrap();

        let liked = service.toggle_comment_like("post-1", "c1").await.unwrap();
        assert!(liked);

        let thread = service.thread("post-1").await.unwrap();
        assert_eq!(thread[0].likes, 1);
        assert!(thread[0].liked_by_viewer);
    }

    #[tokio::test]
    async fn reply_like_rolls_back_on_failure() {
        let mut comment = sample_comment("c1", "post-1");
        comment.add_reply(Reply::new("r1", "c1", Author::new("other", "Other"), "reply"));
        let (service, _cache, store) = setup(TestCommentStore::with_thread(vec![comment])).await;
        service.load_thread("post-1").await.unwrap();

        store.fail.store(true, Ordering::SeqCst);
        let err = service
            .toggle_reply_like("post-1", "c1", "r1")
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let thread = service.thread("post-1").await.unwrap();
        let reply = &thread[0].replies[0];
        assert_eq!(reply.likes, 0);
        assert!(!reply.liked_by_viewer);
    }

    #[tokio::test]
    async fn toggle_on_unloaded_thread_is_not_found() {
        let (service, _cache, _store) = setup(TestCommentStore::new()).await;

        let err = service.toggle_comment_like("post-1", "c1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // The rejected call must release its slot for the next attempt.
        let err = service.toggle_comment_like("post-1", "c1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn clear_drops_all_threads() {
        let seeded = vec![sample_comment("c1", "post-1")];
        let (service, _cache, _store) = setup(TestCommentStore::with_thread(seeded)).await;
        service.load_thread("post-1").await.unwrap();

        service.clear().await;
        assert!(service.thread("post-1").await.is_none());
    }
}
