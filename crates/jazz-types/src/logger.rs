//! # Logger installation
//!
//! SPEC_FULL.md §10.1. A thin wrapper around `tracing_subscriber::fmt`,
//! grounded on the teacher's `node-runtime/src/main.rs` subscriber setup and
//! the original's five-level scheme (`jazz01_utils/jazz_logger.cpp`).
//! Installs once per process; mirrors the original's `J_LOGGER` singleton
//! without exposing a runtime-mutable global — every caller passes the
//! returned guard or simply ignores the result, since logging never fails
//! in a way that should abort startup.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install a global `tracing` subscriber.
///
/// `default_level` is used when `RUST_LOG` is unset, mirroring the
/// original's compile-time default verbosity. Safe to call more than once
/// in a process (e.g. from tests): subsequent calls are no-ops.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    // A second call during tests (or a double-init in main) is harmless:
    // the original's logger was similarly idempotent once opened.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init("info");
        init("debug");
    }
}
