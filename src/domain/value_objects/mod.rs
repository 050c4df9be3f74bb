pub mod change_event;
pub mod toggle;

pub use change_event::{ChangeEvent, ChangeOp, RawChangeEvent, COMMENTS_TABLE, POSTS_TABLE};
pub use toggle::ToggleField;
