pub mod author;
pub mod comment;
pub mod post;

pub use author::Author;
pub use comment::{Comment, Reply};
pub use post::{NewPost, Post, PostPatch};
