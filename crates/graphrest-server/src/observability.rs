//! Tracing setup.
//!
//! The subscriber starts at `info` before the configuration is read. Once
//! `logging.level` is known it is swapped in through a reload handle, unless
//! `RUST_LOG` was given.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

const STARTUP_LEVEL: &str = "info";

fn rust_log_filter() -> Option<EnvFilter> {
    std::env::var_os("RUST_LOG")?;
    EnvFilter::try_from_default_env().ok()
}

/// Installs the global subscriber. Calling it twice is a no-op.
pub fn init_tracing() {
    let filter = rust_log_filter().unwrap_or_else(|| EnvFilter::new(STARTUP_LEVEL));
    let (filter, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    if installed {
        let _ = FILTER.set(handle);
    }
}

/// Switches the active filter to `level`.
pub fn apply_logging_level(level: &str) {
    if rust_log_filter().is_some() {
        return;
    }
    let Some(handle) = FILTER.get() else {
        return;
    };
    if let Err(err) = handle.reload(EnvFilter::new(level)) {
        tracing::warn!(error = %err, level, "Could not apply logging level");
    }
}
