use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use genbridge::config::Config;
use genbridge::driver::cdp::CdpProvider;
use genbridge::extract::ClipboardExtract;
use genbridge::orchestrator::Orchestrator;
use genbridge_server::{logging, routes};
use tracing::{debug, error, info};

/// How many consecutive ports to try past the preferred one.
const PORT_SCAN_RANGE: u16 = 10;

#[derive(Debug, Parser)]
#[command(name = "genbridged", about = "Prompt-to-code generation bridge", version)]
struct Cli {
	/// Preferred listen port; the next free port is used when occupied.
	#[arg(long, short, default_value_t = 3000)]
	port: u16,

	/// Bind address.
	#[arg(long, default_value = "127.0.0.1")]
	host: String,

	/// Verbose logging.
	#[arg(long, short)]
	verbose: bool,
}

#[tokio::main]
async fn main() {
	dotenv().ok();
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		error!(target = "genbridge", error = %err, "server failed");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let config = Config::from_env()?;
	let provider = CdpProvider::new(config.automation.clone());
	let retry = config.retry;
	let orchestrator = Orchestrator::new(config, Box::new(ClipboardExtract::new(retry)));

	let state = Arc::new(routes::AppState {
		orchestrator,
		provider: Box::new(provider),
	});
	let app = routes::router(state);

	let listener = bind_with_fallback(&cli.host, cli.port).await?;
	let addr = listener.local_addr()?;
	info!(target = "genbridge", %addr, "listening");
	println!("genbridge listening on http://{addr}");

	axum::serve(listener, app).await?;
	Ok(())
}

/// Binds the preferred port, walking forward when it is occupied.
async fn bind_with_fallback(host: &str, preferred: u16) -> anyhow::Result<tokio::net::TcpListener> {
	let end = preferred.saturating_add(PORT_SCAN_RANGE);
	for port in preferred..end {
		match tokio::net::TcpListener::bind((host, port)).await {
			Ok(listener) => {
				if port != preferred {
					info!(target = "genbridge", preferred, port, "preferred port occupied; using fallback");
				}
				return Ok(listener);
			}
			Err(err) => {
				debug!(target = "genbridge", port, error = %err, "bind failed");
			}
		}
	}
	anyhow::bail!("no free port in {preferred}..{end}")
}
