use crate::domain::entities::{Post, PostPatch};
use crate::shared::error::AppError;
use serde::{Deserialize, Serialize};

/// Change-feed table carrying post records.
pub const POSTS_TABLE: &str = "posts";
/// Change-feed table carrying comment records.
pub const COMMENTS_TABLE: &str = "comments";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A change event exactly as the push channel delivers it: table name, the
/// operation, the affected record as raw JSON, and the originating author id
/// when the channel knows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChangeEvent {
    pub table: String,
    pub op: ChangeOp,
    pub record: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

impl RawChangeEvent {
    pub fn insert(table: impl Into<String>, record: serde_json::Value) -> Self {
        Self {
            table: table.into(),
            op: ChangeOp::Insert,
            record,
            author_id: None,
        }
    }

    pub fn update(table: impl Into<String>, record: serde_json::Value) -> Self {
        Self {
            table: table.into(),
            op: ChangeOp::Update,
            record,
            author_id: None,
        }
    }

    pub fn delete(table: impl Into<String>, record: serde_json::Value) -> Self {
        Self {
            table: table.into(),
            op: ChangeOp::Delete,
            record,
            author_id: None,
        }
    }

    pub fn from_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }
}

/// A post-table change event after payload validation.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Insert(Box<Post>),
    Update(PostPatch),
    Delete { id: String },
}

impl ChangeEvent {
    /// Validate and type a raw post-table payload. Any payload missing its
    /// record id comes back as `MalformedEvent`.
    pub fn parse(raw: &RawChangeEvent) -> Result<Self, AppError> {
        match raw.op {
            ChangeOp::Insert => {
                let post: Post = serde_json::from_value(raw.record.clone())?;
                if post.id.is_empty() {
                    return Err(AppError::MalformedEvent("insert record has empty id".into()));
                }
                Ok(ChangeEvent::Insert(Box::new(post)))
            }
            ChangeOp::Update => {
                let patch: PostPatch = serde_json::from_value(raw.record.clone())?;
                if patch.id.is_empty() {
                    return Err(AppError::MalformedEvent("update record has empty id".into()));
                }
                Ok(ChangeEvent::Update(patch))
            }
            ChangeOp::Delete => {
                #[derive(Deserialize)]
                struct DeleteRecord {
                    id: String,
                }
                let record: DeleteRecord = serde_json::from_value(raw.record.clone())?;
                if record.id.is_empty() {
                    return Err(AppError::MalformedEvent("delete record has empty id".into()));
                }
                Ok(ChangeEvent::Delete { id: record.id })
            }
        }
    }

    /// Author id of the affected record, when the payload itself carries one.
    pub fn record_author_id(&self) -> Option<&str> {
        match self {
            ChangeEvent::Insert(post) => Some(post.author.id.as_str()),
            ChangeEvent::Update(_) | ChangeEvent::Delete { .. } => None,
        }
    }
}
