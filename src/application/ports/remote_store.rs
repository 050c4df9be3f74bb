use crate::domain::entities::{Author, Comment, NewPost, Post, PostPatch, Reply};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Post CRUD and toggle operations against the hosted backend. Viewer
/// identity for the returned `liked_by_viewer` / `bookmarked_by_viewer`
/// flags is resolved by the store from its session.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn fetch_posts(&self, limit: usize, offset: usize) -> Result<Vec<Post>, AppError>;

    async fn create_post(&self, draft: NewPost) -> Result<Post, AppError>;

    async fn update_post(&self, patch: &PostPatch) -> Result<Post, AppError>;

    async fn delete_post(&self, id: &str) -> Result<(), AppError>;

    /// Returns the new liked state.
    async fn toggle_post_like(&self, id: &str, viewer_id: &str) -> Result<bool, AppError>;

    /// Returns the new bookmarked state.
    async fn toggle_post_bookmark(&self, id: &str, viewer_id: &str) -> Result<bool, AppError>;
}

/// Comment and reply operations, mirroring `PostStore`. `fetch_comments`
/// returns fully assembled threads: replies inline, viewer like-state
/// already joined.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>, AppError>;

    async fn create_comment(
        &self,
        post_id: &str,
        author: Author,
        body: String,
    ) -> Result<Comment, AppError>;

    async fn delete_comment(&self, id: &str) -> Result<(), AppError>;

    async fn create_reply(
        &self,
        comment_id: &str,
        author: Author,
        body: String,
    ) -> Result<Reply, AppError>;

    async fn delete_reply(&self, id: &str) -> Result<(), AppError>;

    async fn toggle_comment_like(&self, id: &str, viewer_id: &str) -> Result<bool, AppError>;

    async fn toggle_reply_like(&self, id: &str, viewer_id: &str) -> Result<bool, AppError>;
}
