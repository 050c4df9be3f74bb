pub mod comment_service;
pub mod mutator;
pub mod paginator;
pub mod reconciler;

pub use comment_service::CommentService;
pub use mutator::OptimisticMutator;
pub use paginator::Paginator;
pub use reconciler::Reconciler;
