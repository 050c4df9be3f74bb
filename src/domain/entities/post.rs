use super::author::Author;
use crate::domain::value_objects::ToggleField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: Author,
    pub title: String,
    pub body: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub likes: u32,
    pub comments: u32,
    pub liked_by_viewer: bool,
    pub bookmarked_by_viewer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Ids are server-assigned; callers construct a `Post` only from a value
    /// the Remote Store already handed out.
    pub fn new(
        id: impl Into<String>,
        author: Author,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            author,
            title: title.into(),
            body: body.into(),
            images: Vec::new(),
            tags: Vec::new(),
            likes: 0,
            comments: 0,
            liked_by_viewer: false,
            bookmarked_by_viewer: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn increment_likes(&mut self) {
        self.likes += 1;
    }

    pub fn decrement_likes(&mut self) {
        if self.likes > 0 {
            self.likes -= 1;
        }
    }

    pub fn increment_comments(&mut self) {
        self.comments += 1;
    }

    pub fn decrement_comments(&mut self) {
        if self.comments > 0 {
            self.comments -= 1;
        }
    }

    pub fn flag(&self, field: ToggleField) -> bool {
        match field {
            ToggleField::Liked => self.liked_by_viewer,
            ToggleField::Bookmarked => self.bookmarked_by_viewer,
        }
    }

    /// Flip a viewer flag and adjust its paired counter. Likes carry a
    /// counter; bookmarks are a bare flag.
    pub fn toggle(&mut self, field: ToggleField) {
        match field {
            ToggleField::Liked => {
                if self.liked_by_viewer {
                    self.liked_by_viewer = false;
                    self.decrement_likes();
                } else {
                    self.liked_by_viewer = true;
                    self.increment_likes();
                }
            }
            ToggleField::Bookmarked => {
                self.bookmarked_by_viewer = !self.bookmarked_by_viewer;
            }
        }
    }

    /// Merge a partial update onto this record. Fields absent from the patch
    /// keep their cached values.
    pub fn merge(&mut self, patch: &PostPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(body) = &patch.body {
            self.body = body.clone();
        }
        if let Some(images) = &patch.images {
            self.images = images.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(likes) = patch.likes {
            self.likes = likes;
        }
        if let Some(comments) = patch.comments {
            self.comments = comments;
        }
        if let Some(liked) = patch.liked_by_viewer {
            self.liked_by_viewer = liked;
        }
        if let Some(bookmarked) = patch.bookmarked_by_viewer {
            self.bookmarked_by_viewer = bookmarked;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Partial update for a post. Deserializing a payload without an `id` fails,
/// which is how malformed change events surface at the boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPatch {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_viewer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmarked_by_viewer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PostPatch {
    pub fn for_post(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn likes(mut self, likes: u32) -> Self {
        self.likes = Some(likes);
        self
    }

    pub fn comments(mut self, comments: u32) -> Self {
        self.comments = Some(comments);
        self
    }
}

/// Fields the client supplies when creating a post; everything else
/// (id, counters, timestamps) is assigned by the Remote Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub author: Author,
    pub title: String,
    pub body: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
}

impl NewPost {
    pub fn new(author: Author, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author,
            title: title.into(),
            body: body.into(),
            images: Vec::new(),
            tags: Vec::new(),
        }
    }
}
