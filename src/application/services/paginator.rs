use crate::application::ports::cache::FeedCache;
use crate::application::ports::remote_store::PostStore;
use crate::shared::config::FeedConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug)]
struct PageState {
    current_offset: usize,
    has_more: bool,
    loading: bool,
}

/// Drives incremental loading of the feed cache from the remote store.
///
/// `has_more` uses the fetched-count-equals-page-size heuristic: a page that
/// ends exactly on a page boundary reads as "maybe more", which costs one
/// empty fetch at worst.
pub struct Paginator {
    cache: Arc<dyn FeedCache>,
    store: Arc<dyn PostStore>,
    page_size: usize,
    state: Mutex<PageState>,
}

impl Paginator {
    pub fn new(cache: Arc<dyn FeedCache>, store: Arc<dyn PostStore>, config: &FeedConfig) -> Self {
        Self {
            cache,
            store,
            page_size: config.page_size.min(config.max_page_size),
            state: Mutex::new(PageState {
                current_offset: 0,
                has_more: true,
                loading: false,
            }),
        }
    }

    /// Full refresh: fetch from offset 0 and replace the cache wholesale.
    /// Returns the fetched count.
    pub async fn load_first_page(&self) -> Result<usize, AppError> {
        self.claim_load().await?;

        let fetched = self.store.fetch_posts(self.page_size, 0).await;

        let mut state = self.state.lock().await;
        state.loading = false;
        match fetched {
            Ok(posts) => {
                let count = posts.len();
                state.current_offset = 0;
                state.has_more = count == self.page_size;
                drop(state);
                self.cache.replace_all(posts).await;
                Ok(count)
            }
            // Prior offset/has_more survive so the caller can retry.
            Err(err) => Err(err),
        }
    }

    /// Fetch the next page and append it. No-op (Ok(0)) when exhausted or
    /// when a load is already in flight. Never partially appends.
    pub async fn load_next_page(&self) -> Result<usize, AppError> {
        let offset = {
            let mut state = self.state.lock().await;
            if !state.has_more || state.loading {
                debug!(
                    has_more = state.has_more,
                    loading = state.loading,
                    "skipping next-page load"
                );
                return Ok(0);
            }
            state.loading = true;
            state.current_offset + self.page_size
        };

        let fetched = self.store.fetch_posts(self.page_size, offset).await;

        let mut state = self.state.lock().await;
        state.loading = false;
        match fetched {
            Ok(posts) => {
                let count = posts.len();
                state.current_offset = offset;
                state.has_more = count == self.page_size;
                drop(state);
                self.cache.append_page(posts).await;
                Ok(count)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub async fn current_offset(&self) -> usize {
        self.state.lock().await.current_offset
    }

    async fn claim_load(&self) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if state.loading {
            return Err(AppError::Busy("a feed load is already in flight".into()));
        }
        state.loading = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Author, NewPost, Post, PostPatch};
    use crate::infrastructure::cache::FeedCacheService;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Serves a fixed newest-first feed of `total` posts, with a failure
    /// switch for retry tests.
    struct PagedStore {
        total: usize,
        fail: AtomicBool,
    }

    impl PagedStore {
        fn with_total(total: usize) -> Self {
            Self {
                total,
                fail: AtomicBool::new(false),
            }
        }

        fn post(index: usize) -> Post {
            Post::new(
                format!("post-{index}"),
                Author::new("u1", "User"),
                format!("title {index}"),
                "body",
            )
        }
    }

    #[async_trait]
    impl PostStore for PagedStore {
        async fn fetch_posts(&self, limit: usize, offset: usize) -> Result<Vec<Post>, AppError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::RemoteFailure("fetch failed".into()));
            }
            let end = (offset + limit).min(self.total);
            Ok((offset.min(self.total)..end).map(Self::post).collect())
        }

        async fn create_post(&self, _: NewPost) -> Result<Post, AppError> {
            unimplemented!("not used by paginator tests")
        }

        async fn update_post(&self, _: &PostPatch) -> Result<Post, AppError> {
            unimplemented!("not used by paginator tests")
        }

        async fn delete_post(&self, _: &str) -> Result<(), AppError> {
            unimplemented!("not used by paginator tests")
        }

        async fn toggle_post_like(&self, _: &str, _: &str) -> Result<bool, AppError> {
            unimplemented!("not used by paginator tests")
        }

        async fn toggle_post_bookmark(&self, _: &str, _: &str) -> Result<bool, AppError> {
            unimplemented!("not used by paginator tests")
        }
    }

    fn setup(store: PagedStore) -> (Paginator, Arc<FeedCacheService>, Arc<PagedStore>) {
        let cache = Arc::new(FeedCacheService::new());
        let store = Arc::new(store);
        let paginator = Paginator::new(
            Arc::clone(&cache) as Arc<dyn FeedCache>,
            Arc::clone(&store) as Arc<dyn PostStore>,
            &FeedConfig::default(),
        );
        (paginator, cache, store)
    }

    #[tokio::test]
    async fn first_and_next_page_do_not_overlap() {
        let (paginator, cache, _store) = setup(PagedStore::with_total(40));

        assert_eq!(paginator.load_first_page().await.unwrap(), 20);
        assert_eq!(paginator.load_next_page().await.unwrap(), 20);

        let ids: Vec<String> = cache.snapshot().await.into_iter().map(|p| p.id).collect();
        let expected: Vec<String> = (0..40).map(|i| format!("post-{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn short_page_clears_has_more() {
        let (paginator, cache, _store) = setup(PagedStore::with_total(30));

        paginator.load_first_page().await.unwrap();
        assert!(paginator.has_more().await);

        assert_eq!(paginator.load_next_page().await.unwrap(), 10);
        assert!(!paginator.has_more().await);

        // Exhausted: further calls are no-ops.
        assert_eq!(paginator.load_next_page().await.unwrap(), 0);
        assert_eq!(cache.len().await, 30);
    }

    #[tokio::test]
    async fn exact_boundary_costs_one_empty_fetch() {
        let (paginator, _cache, _store) = setup(PagedStore::with_total(20));

        paginator.load_first_page().await.unwrap();
        assert!(paginator.has_more().await);

        assert_eq!(paginator.load_next_page().await.unwrap(), 0);
        assert!(!paginator.has_more().await);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_state_retryable() {
        let (paginator, cache, store) = setup(PagedStore::with_total(40));
        paginator.load_first_page().await.unwrap();
        let offset_before = paginator.current_offset().await;

        store.fail.store(true, Ordering::SeqCst);
        let err = paginator.load_next_page().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(paginator.current_offset().await, offset_before);
        assert!(paginator.has_more().await);
        assert_eq!(cache.len().await, 20);

        store.fail.store(false, Ordering::SeqCst);
        assert_eq!(paginator.load_next_page().await.unwrap(), 20);
        assert_eq!(cache.len().await, 40);
    }

    #[tokio::test]
    async fn refresh_replaces_wholesale() {
        let (paginator, cache, _store) = setup(PagedStore::with_total(40));
        paginator.load_first_page().await.unwrap();
        paginator.load_next_page().await.unwrap();
        assert_eq!(cache.len().await, 40);

        paginator.load_first_page().await.unwrap();
        assert_eq!(cache.len().await, 20);
        assert_eq!(paginator.current_offset().await, 0);
    }
}
