use serde::{Deserialize, Serialize};

/// Viewer-toggleable fields on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleField {
    Liked,
    Bookmarked,
}

impl ToggleField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleField::Liked => "liked",
            ToggleField::Bookmarked => "bookmarked",
        }
    }
}
