//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Install a JSON subscriber.
///
/// `RUST_LOG` wins over `default_directives` when it is set and parses.
pub fn init_with_default(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    // JSON logs + timestamps. A second call finds a global subscriber and is ignored.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init_with_default("warn");
        super::init_with_default("debug");
        crate::init();
    }
}
