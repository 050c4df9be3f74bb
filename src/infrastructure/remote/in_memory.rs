use crate::application::ports::change_feed::{ChangeFeed, SubscriptionHandle};
use crate::application::ports::remote_store::{CommentStore, PostStore};
use crate::domain::entities::{Author, Comment, NewPost, Post, PostPatch, Reply};
use crate::domain::value_objects::{RawChangeEvent, POSTS_TABLE};
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Backend stand-in for local runs and tests. Posts are kept newest-first,
/// like the hosted feed query. Every mutation is echoed onto the table's
/// change channel tagged with the acting viewer, which is exactly the
/// self-origination traffic the reconciler has to skip.
pub struct InMemoryRemoteStore {
    viewer_id: String,
    posts: RwLock<Vec<Post>>,
    comments: RwLock<HashMap<String, Vec<Comment>>>,
    post_likes: RwLock<HashSet<(String, String)>>,
    post_bookmarks: RwLock<HashSet<(String, String)>>,
    comment_likes: RwLock<HashSet<(String, String)>>,
    reply_likes: RwLock<HashSet<(String, String)>>,
    subscribers: RwLock<HashMap<u64, (String, mpsc::UnboundedSender<RawChangeEvent>)>>,
    next_subscription: AtomicU64,
}

impl InMemoryRemoteStore {
    pub fn new(viewer_id: impl Into<String>) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            posts: RwLock::new(Vec::new()),
            comments: RwLock::new(HashMap::new()),
            post_likes: RwLock::new(HashSet::new()),
            post_bookmarks: RwLock::new(HashSet::new()),
            comment_likes: RwLock::new(HashSet::new()),
            reply_likes: RwLock::new(HashSet::new()),
            subscribers: RwLock::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Seed the backing post list directly, newest-first, without emitting
    /// change events.
    pub async fn seed_posts(&self, posts: Vec<Post>) {
        let mut guard = self.posts.write().await;
        *guard = posts;
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Push a raw event to every subscriber of its table, as if it came
    /// from another client.
    pub async fn emit_raw(&self, event: RawChangeEvent) {
        let subscribers = self.subscribers.read().await;
        for (table, sender) in subscribers.values() {
            if *table == event.table {
                let _ = sender.send(event.clone());
            }
        }
    }

    async fn emit_post_event(&self, event: RawChangeEvent) {
        self.emit_raw(event.from_author(&self.viewer_id)).await;
    }

    fn post_not_found(id: &str) -> AppError {
        AppError::NotFound(format!("post {id} does not exist"))
    }
}

#[async_trait]
impl PostStore for InMemoryRemoteStore {
    async fn fetch_posts(&self, limit: usize, offset: usize) -> Result<Vec<Post>, AppError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn create_post(&self, draft: NewPost) -> Result<Post, AppError> {
        let post = Post::new(
            Uuid::new_v4().to_string(),
            draft.author,
            draft.title,
            draft.body,
        )
        .with_images(draft.images)
        .with_tags(draft.tags);

        {
            let mut posts = self.posts.write().await;
            posts.insert(0, post.clone());
        }

        let record = serde_json::to_value(&post)
            .map_err(|err| AppError::Internal(err.to_string()))?;
        self.emit_post_event(RawChangeEvent::insert(POSTS_TABLE, record))
            .await;
        Ok(post)
    }

    async fn update_post(&self, patch: &PostPatch) -> Result<Post, AppError> {
        let updated = {
            let mut posts = self.posts.write().await;
            let post = posts
                .iter_mut()
                .find(|post| post.id == patch.id)
                .ok_or_else(|| Self::post_not_found(&patch.id))?;
            post.merge(patch);
            post.clone()
        };

        let record = serde_json::to_value(patch)
            .map_err(|err| AppError::Internal(err.to_string()))?;
        self.emit_post_event(RawChangeEvent::update(POSTS_TABLE, record))
            .await;
        Ok(updated)
    }

    async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        {
            let mut posts = self.posts.write().await;
            let index = posts
                .iter()
                .position(|post| post.id == id)
                .ok_or_else(|| Self::post_not_found(id))?;
            posts.remove(index);
        }

        self.emit_post_event(RawChangeEvent::delete(
            POSTS_TABLE,
            serde_json::json!({ "id": id }),
        ))
        .await;
        Ok(())
    }

    async fn toggle_post_like(&self, id: &str, viewer_id: &str) -> Result<bool, AppError> {
        let key = (id.to_string(), viewer_id.to_string());
        let liked = {
            let mut likes = self.post_likes.write().await;
            if likes.remove(&key) {
                false
            } else {
                likes.insert(key);
                true
            }
        };

        let new_count = {
            let mut posts = self.posts.write().await;
            let post = posts
                .iter_mut()
                .find(|post| post.id == id)
                .ok_or_else(|| Self::post_not_found(id))?;
            if liked {
                post.increment_likes();
            } else {
                post.decrement_likes();
            }
            post.likes
        };

        debug!(id, viewer_id, liked, "post like toggled");
        let patch = PostPatch::for_post(id).likes(new_count);
        let record = serde_json::to_value(&patch)
            .map_err(|err| AppError::Internal(err.to_string()))?;
        self.emit_raw(RawChangeEvent::update(POSTS_TABLE, record).from_author(viewer_id))
            .await;
        Ok(liked)
    }

    async fn toggle_post_bookmark(&self, id: &str, viewer_id: &str) -> Result<bool, AppError> {
        {
            let posts = self.posts.read().await;
            if !posts.iter().any(|post| post.id == id) {
                return Err(Self::post_not_found(id));
            }
        }

        let key = (id.to_string(), viewer_id.to_string());
        let mut bookmarks = self.post_bookmarks.write().await;
        let bookmarked = if bookmarks.remove(&key) {
            false
        } else {
            bookmarks.insert(key);
            true
        };
        // Bookmarks are per-viewer state, no shared counter to broadcast.
        Ok(bookmarked)
    }
}

#[async_trait]
impl CommentStore for InMemoryRemoteStore {
    async fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        let comments = self.comments.read().await;
        Ok(comments.get(post_id).cloned().unwrap_or_default())
    }

    async fn create_comment(
        &self,
        post_id: &str,
        author: Author,
        body: String,
    ) -> Result<Comment, AppError> {
        let comment = Comment::new(Uuid::new_v4().to_string(), post_id, author, body);

        {
            let mut comments = self.comments.write().await;
            comments
                .entry(post_id.to_string())
                .or_default()
                .push(comment.clone());
        }

        let new_count = {
            let mut posts = self.posts.write().await;
            posts.iter_mut().find(|post| post.id == post_id).map(|post| {
                post.increment_comments();
                post.comments
            })
        };
        if let Some(count) = new_count {
            let patch = PostPatch::for_post(post_id).comments(count);
            let record = serde_json::to_value(&patch)
                .map_err(|err| AppError::Internal(err.to_string()))?;
            self.emit_post_event(RawChangeEvent::update(POSTS_TABLE, record))
                .await;
        }

        Ok(comment)
    }

    async fn delete_comment(&self, id: &str) -> Result<(), AppError> {
        let post_id = {
            let mut comments = self.comments.write().await;
            let mut owner = None;
            for (post_id, thread) in comments.iter_mut() {
                if let Some(index) = thread.iter().position(|comment| comment.id == id) {
                    thread.remove(index);
                    owner = Some(post_id.clone());
                    break;
                }
            }
            owner.ok_or_else(|| AppError::NotFound(format!("comment {id} does not exist")))?
        };

        let new_count = {
            let mut posts = self.posts.write().await;
            posts.iter_mut().find(|post| post.id == post_id).map(|post| {
                post.decrement_comments();
                post.comments
            })
        };
        if let Some(count) = new_count {
            let patch = PostPatch::for_post(&post_id).comments(count);
            let record = serde_json::to_value(&patch)
                .map_err(|err| AppError::Internal(err.to_string()))?;
            self.emit_post_event(RawChangeEvent::update(POSTS_TABLE, record))
                .await;
        }

        Ok(())
    }

    async fn create_reply(
        &self,
        comment_id: &str,
        author: Author,
        body: String,
    ) -> Result<Reply, AppError> {
        let reply = Reply::new(Uuid::new_v4().to_string(), comment_id, author, body);

        let mut comments = self.comments.write().await;
        let comment = comments
            .values_mut()
            .flat_map(|thread| thread.iter_mut())
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| AppError::NotFound(format!("comment {comment_id} does not exist")))?;
        comment.add_reply(reply.clone());
        Ok(reply)
    }

    async fn delete_reply(&self, id: &str) -> Result<(), AppError> {
        let mut comments = self.comments.write().await;
        for comment in comments.values_mut().flat_map(|thread| thread.iter_mut()) {
            if let Some(index) = comment.replies.iter().position(|reply| reply.id == id) {
                comment.replies.remove(index);
                return Ok(());
            }
        }
        Err(AppError::NotFound(format!("reply {id} does not exist")))
    }

    async fn toggle_comment_like(&self, id: &str, viewer_id: &str) -> Result<bool, AppError> {
        let key = (id.to_string(), viewer_id.to_string());
        let liked = {
            let mut likes = self.comment_likes.write().await;
            if likes.remove(&key) {
                false
            } else {
                likes.insert(key);
                true
            }
        };

        let mut comments = self.comments.write().await;
        let comment = comments
            .values_mut()
            .flat_map(|thread| thread.iter_mut())
            .find(|comment| comment.id == id)
            .ok_or_else(|| AppError::NotFound(format!("comment {id} does not exist")))?;
        if liked {
            comment.likes += 1;
        } else if comment.likes > 0 {
            comment.likes -= 1;
        }
        Ok(liked)
    }

    async fn toggle_reply_like(&self, id: &str, viewer_id: &str) -> Result<bool, AppError> {
        let key = (id.to_string(), viewer_id.to_string());
        let liked = {
            let mut likes = self.reply_likes.write().await;
            if likes.remove(&key) {
                false
            } else {
                likes.insert(key);
                true
            }
        };

        let mut comments = self.comments.write().await;
        let reply = comments
            .values_mut()
            .flat_map(|thread| thread.iter_mut())
            .flat_map(|comment| comment.replies.iter_mut())
            .find(|reply| reply.id == id)
            .ok_or_else(|| AppError::NotFound(format!("reply {id} does not exist")))?;
        if liked {
            reply.likes += 1;
        } else if reply.likes > 0 {
            reply.likes -= 1;
        }
        Ok(liked)
    }
}

#[async_trait]
impl ChangeFeed for InMemoryRemoteStore {
    async fn subscribe(
        &self,
        table: &str,
        sender: mpsc::UnboundedSender<RawChangeEvent>,
    ) -> Result<SubscriptionHandle, AppError> {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id, (table.to_string(), sender));
        debug!(id, table, "channel subscribed");
        Ok(SubscriptionHandle {
            id,
            table: table.to_string(),
        })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), AppError> {
        let mut subscribers = self.subscribers.write().await;
        subscribers.remove(&handle.id);
        debug!(id = handle.id, table = %handle.table, "channel unsubscribed");
        Ok(())
    }
}
