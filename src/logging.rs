//! Log output setup.
//!
//! The crate logs through the `log` facade; `tracing-subscriber` installs
//! the `log` bridge and formats to stderr. Level comes from `RUST_LOG`,
//! defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Subscriber for tests: debug level, captured by the test harness.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
