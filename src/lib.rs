pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use shared::{AppError, Result};

/// Initialize structured logging. Respects `RUST_LOG`, defaulting to debug
/// output for this crate and info elsewhere.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manabi_core=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
