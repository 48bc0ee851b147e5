use tracing_subscriber::EnvFilter;

/// Log directives applied when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "ERROR,kvbench=TRACE,kvbench_test=TRACE";

/// Initialize the logger for testing.
///
/// Logs go to the output captured by the Rust test runner. Without `RUST_LOG`, only the
/// benchmark crates log, at all levels. Calling this more than once is harmless.
///
/// # Example
///
/// ```
/// kvbench_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}
