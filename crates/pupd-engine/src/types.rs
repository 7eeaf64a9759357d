use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where a process's output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
	pub stdout: Option<PathBuf>,
	pub stderr: Option<PathBuf>,
	#[serde(default)]
	pub console: bool,
}

impl LoggerConfig {
	/// Both streams appended to one file, nothing echoed to the console.
	pub fn single_file(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		Self {
			stdout: Some(path.clone()),
			stderr: Some(path),
			console: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
	pub id: String,
	pub argv: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cwd: Option<PathBuf>,
	#[serde(default)]
	pub logger: LoggerConfig,
}

#[derive(Debug, Clone)]
pub struct RestartPolicy {
	pub restart: bool,
	pub max_retries: u32,
	pub restart_delay: Duration,
}

impl Default for RestartPolicy {
	fn default() -> Self {
		Self {
			restart: true,
			max_retries: 3,
			restart_delay: Duration::from_secs(1),
		}
	}
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
	pub restart: RestartPolicy,
	/// Grace period between SIGTERM and SIGKILL when stopping.
	pub stop_timeout: Duration,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			restart: RestartPolicy::default(),
			stop_timeout: Duration::from_secs(5),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProcessState {
	Running { pid: u32 },
	Stopped,
	Crashed { exit_code: i32, retries: u32 },
	Failed { exit_code: i32 },
}

impl ProcessState {
	pub fn is_running(&self) -> bool {
		matches!(self, ProcessState::Running { .. })
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStatus {
	pub id: String,
	pub config: ProcessConfig,
	pub state: ProcessState,
	pub uptime_secs: Option<u64>,
}
