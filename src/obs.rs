//! Tracing bootstrap for the server binary.

// crates.io
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber, honoring `RUST_LOG` and defaulting to `info`.
pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
