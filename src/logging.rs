// Logging setup with tracing-subscriber.
//
// RUST_LOG selects the level (default `info`), e.g. `RUST_LOG=subcon_quality=debug`.
use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so they never interleave with the report previews.
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Debug-level logging captured by the test harness. Safe to call repeatedly.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
