use super::author::Author;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level comment on a post. Replies are carried inline; their count is
/// independent of the parent post's `comments` counter, which counts
/// top-level comments only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: Author,
    pub body: String,
    pub likes: u32,
    pub liked_by_viewer: bool,
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        id: impl Into<String>,
        post_id: impl Into<String>,
        author: Author,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            post_id: post_id.into(),
            author,
            body: body.into(),
            likes: 0,
            liked_by_viewer: false,
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_reply(&mut self, reply: Reply) {
        self.replies.push(reply);
    }

    pub fn toggle_like(&mut self) {
        if self.liked_by_viewer {
            self.liked_by_viewer = false;
            if self.likes > 0 {
                self.likes -= 1;
            }
        } else {
            self.liked_by_viewer = true;
            self.likes += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    pub comment_id: String,
    pub author: Author,
    pub body: String,
    pub likes: u32,
    pub liked_by_viewer: bool,
    pub created_at: DateTime<Utc>,
}

impl Reply {
    pub fn new(
        id: impl Into<String>,
        comment_id: impl Into<String>,
        author: Author,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            comment_id: comment_id.into(),
            author,
            body: body.into(),
            likes: 0,
            liked_by_viewer: false,
            created_at: Utc::now(),
        }
    }

    pub fn toggle_like(&mut self) {
        if self.liked_by_viewer {
            self.liked_by_viewer = false;
            if self.likes > 0 {
                self.likes -= 1;
            }
        } else {
            self.liked_by_viewer = true;
            self.likes += 1;
        }
    }
}
