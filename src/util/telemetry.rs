//! Telemetry helpers for structured logging and tracing.

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "credit_ledger=info";

/// Install the default subscriber unless the host already installed one.
///
/// Engine decisions are emitted under the `credit_ledger` target: committed
/// operations at `info`, rejections at `warn`, store failures at `error`, and
/// lock and credit checks at `debug`.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_FILTER);
}

/// Like [`init_tracing`], falling back to `default_filter` when `RUST_LOG`
/// is unset. Returns whether a subscriber was installed by this call.
pub fn init_tracing_with(default_filter: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
