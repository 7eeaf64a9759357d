use pupd_engine::{Engine, NativeEngine};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::logs::LogStore;
use crate::registry::Registry;

/// Creates the log directory, starts the engine, and serves the HTTP API
/// until ctrl-c or SIGTERM. Supervised processes are stopped on the way out.
pub async fn run(config: Config) -> io::Result<()> {
	let logs = LogStore::new(&config.logs.dir);
	logs.ensure_dir()?;

	let engine = NativeEngine::new(config.supervisor.engine_config());
	engine.init().await.map_err(io::Error::other)?;

	let registry = Arc::new(Registry::new(engine.clone()));
	let app = api::router(AppState { registry, logs });

	let listener = TcpListener::bind(config.server.addr()).await?;
	tracing::info!("server listening on http://{}", listener.local_addr()?);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("shutting down");
	if let Err(e) = engine.shutdown().await {
		tracing::warn!("failed to stop supervised processes: {}", e);
	}
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("failed to listen for ctrl-c: {}", e);
			std::future::pending::<()>().await;
		}
	};

	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			}
			Err(e) => {
				tracing::error!("failed to listen for SIGTERM: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
