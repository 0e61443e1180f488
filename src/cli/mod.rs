pub mod commands;
pub mod run_once;
pub mod validate;

pub use commands::{RunOnceCli, ValidateCli};

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the `-d` flag.
pub fn init_logging(debug: bool, no_color: bool) {
    let log_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!no_color)
        .init();
}
