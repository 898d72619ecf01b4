use std::io;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks between debug and warn.
pub fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // try_init: a second call (tests, embedding) must not panic
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr) // Keep stdout clean for streamed replies
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .try_init();
}

/// Log an info message with emoji prefix
pub fn log_info(emoji: &str, message: impl std::fmt::Display) {
    info!("{} {}", emoji, message);
}

/// Log a warning message with emoji prefix
pub fn log_warn(emoji: &str, message: impl std::fmt::Display) {
    warn!("{} {}", emoji, message);
}

/// Log an error message with emoji prefix
pub fn log_error(emoji: &str, message: impl std::fmt::Display) {
    error!("{} {}", emoji, message);
}

/// Log a debug message
pub fn log_debug(message: impl std::fmt::Display) {
    debug!("{}", message);
}
