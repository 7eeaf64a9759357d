use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pupd::{config, server};

#[tokio::main]
async fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();

	let mut config_path: Option<PathBuf> = None;
	let mut port: Option<u16> = None;

	let mut iter = args.iter();
	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"help" | "--help" | "-h" => {
				print_usage();
				return;
			}
			"version" | "--version" | "-V" => {
				println!("pupd {}", env!("CARGO_PKG_VERSION"));
				return;
			}
			"--config" | "-c" => match iter.next() {
				Some(path) => config_path = Some(PathBuf::from(path)),
				None => usage_error("--config needs a path"),
			},
			"--port" | "-p" => match iter.next().map(|p| p.parse::<u16>()) {
				Some(Ok(p)) if p > 0 => port = Some(p),
				_ => usage_error("--port needs a number between 1 and 65535"),
			},
			other => usage_error(&format!("unknown argument: {}", other)),
		}
	}

	dotenv::dotenv().ok();

	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let mut config = config::load(config_path.as_deref());
	if let Some(port) = port {
		config.server.port = port;
	}

	if let Err(e) = server::run(config).await {
		tracing::error!("server error: {}", e);
		std::process::exit(1);
	}
}

fn usage_error(message: &str) -> ! {
	eprintln!("error: {}", message);
	eprintln!();
	print_usage();
	std::process::exit(2);
}

fn print_usage() {
	eprintln!("pupd: HTTP control plane for supervised processes");
	eprintln!();
	eprintln!("usage: pupd [options]");
	eprintln!();
	eprintln!("options:");
	eprintln!("  -c, --config <path>   Config file (default: $PUPD_CONFIG or ./pupd.toml)");
	eprintln!("  -p, --port <port>     Listen port (overrides $PORT and the config file)");
	eprintln!("  -h, --help            Show this help");
	eprintln!("  -V, --version         Show version");
	eprintln!();
	eprintln!("environment:");
	eprintln!("  PORT                  Listen port (default: 5566)");
	eprintln!("  RUST_LOG              Log filter (default: info)");
}
