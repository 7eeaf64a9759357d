use pupd_engine::{EngineConfig, RestartPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "PUPD_CONFIG";
pub const PORT_ENV: &str = "PORT";
const DEFAULT_CONFIG_FILE: &str = "pupd.toml";

// ── pupd.toml ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
	#[serde(default)]
	pub server: ServerConfig,
	#[serde(default)]
	pub logs: LogsConfig,
	#[serde(default)]
	pub supervisor: SupervisorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self { host: default_host(), port: default_port() }
	}
}

impl ServerConfig {
	pub fn addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5566 }

#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
	#[serde(default = "default_log_dir")]
	pub dir: PathBuf,
}

impl Default for LogsConfig {
	fn default() -> Self {
		Self { dir: default_log_dir() }
	}
}

fn default_log_dir() -> PathBuf { PathBuf::from("./logs") }

#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorConfig {
	#[serde(default = "default_true")]
	pub restart: bool,
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	#[serde(default = "default_restart_delay")]
	pub restart_delay_secs: u64,
	#[serde(default = "default_stop_timeout")]
	pub stop_timeout_secs: u64,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			restart: true,
			max_retries: default_max_retries(),
			restart_delay_secs: default_restart_delay(),
			stop_timeout_secs: default_stop_timeout(),
		}
	}
}

impl SupervisorConfig {
	pub fn engine_config(&self) -> EngineConfig {
		EngineConfig {
			restart: RestartPolicy {
				restart: self.restart,
				max_retries: self.max_retries,
				restart_delay: Duration::from_secs(self.restart_delay_secs),
			},
			stop_timeout: Duration::from_secs(self.stop_timeout_secs),
		}
	}
}

fn default_true() -> bool { true }
fn default_max_retries() -> u32 { 3 }
fn default_restart_delay() -> u64 { 1 }
fn default_stop_timeout() -> u64 { 5 }

// ── Loading ──────────────────────────────────────────────────────────────────

pub fn parse(content: &str) -> Result<Config, toml::de::Error> {
	toml::from_str(content)
}

/// `explicit`, then `$PUPD_CONFIG`, then `./pupd.toml` if it exists.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
	if let Some(path) = explicit {
		return Some(path.to_path_buf());
	}
	if let Ok(path) = std::env::var(CONFIG_ENV) {
		return Some(PathBuf::from(path));
	}
	let local = PathBuf::from(DEFAULT_CONFIG_FILE);
	local.exists().then_some(local)
}

/// Loads the config file (falling back to defaults with a warning) and
/// applies `$PORT`.
pub fn load(explicit: Option<&Path>) -> Config {
	let mut config = match config_path(explicit) {
		Some(path) => load_file(&path),
		None => Config::default(),
	};
	apply_port_override(&mut config, std::env::var(PORT_ENV).ok().as_deref());
	config
}

fn load_file(path: &Path) -> Config {
	match std::fs::read_to_string(path) {
		Ok(content) => match parse(&content) {
			Ok(config) => {
				tracing::debug!("loaded config from {}", path.display());
				return config;
			}
			Err(e) => tracing::warn!("failed to parse {}: {}", path.display(), e),
		},
		Err(e) => tracing::warn!("failed to read {}: {}", path.display(), e),
	}
	Config::default()
}

pub fn apply_port_override(config: &mut Config, port: Option<&str>) {
	let Some(raw) = port.map(str::trim).filter(|p| !p.is_empty()) else {
		return;
	};
	match raw.parse::<u16>() {
		Ok(port) if port > 0 => config.server.port = port,
		_ => tracing::warn!("ignoring invalid {}={:?}", PORT_ENV, raw),
	}
}
