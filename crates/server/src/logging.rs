//! Tracing initialization for the server binary.

use tracing_subscriber::EnvFilter;

/// Initializes global tracing; `RUST_LOG` wins over the built-in default.
pub fn init_logging(verbose: bool) {
	let default = if verbose {
		"genbridge=debug,genbridge_server=debug,info"
	} else {
		"genbridge=info,genbridge_server=info,warn"
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(true)
		.init();
}
