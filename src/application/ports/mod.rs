pub mod cache;
pub mod change_feed;
pub mod remote_store;

pub use cache::FeedCache;
pub use change_feed::{ChangeFeed, SubscriptionHandle};
pub use remote_store::{CommentStore, PostStore};
