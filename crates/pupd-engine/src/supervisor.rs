use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::output::{OutputCapture, Stream};
use crate::types::*;

type ProcessTable = Arc<RwLock<HashMap<String, ManagedProcess>>>;

/// Supervises child processes on the tokio runtime.
pub struct NativeEngine {
	processes: ProcessTable,
	config: EngineConfig,
	initialized: AtomicBool,
	generation: AtomicU64,
}

struct ManagedProcess {
	config: ProcessConfig,
	state: ProcessState,
	started_at: Option<Instant>,
	generation: u64,
	task: Option<SupervisionTask>,
}

struct SupervisionTask {
	cancel: watch::Sender<Option<String>>,
	handle: JoinHandle<()>,
}

impl NativeEngine {
	pub fn new(config: EngineConfig) -> Arc<Self> {
		Arc::new(Self {
			processes: Arc::new(RwLock::new(HashMap::new())),
			config,
			initialized: AtomicBool::new(false),
			generation: AtomicU64::new(0),
		})
	}

	pub async fn status(&self, id: &str) -> Option<ProcessStatus> {
		let processes = self.processes.read().await;
		processes.get(id).map(|mp| status_of(id, mp))
	}

	fn next_generation(&self) -> u64 {
		self.generation.fetch_add(1, Ordering::SeqCst) + 1
	}
}

#[async_trait]
impl Engine for NativeEngine {
	async fn init(&self) -> Result<()> {
		if self.initialized.swap(true, Ordering::SeqCst) {
			tracing::debug!("engine already initialized");
		} else {
			tracing::info!("process engine initialized");
		}
		Ok(())
	}

	async fn register(&self, config: ProcessConfig) -> Result<()> {
		if config.argv.first().map_or(true, |program| program.trim().is_empty()) {
			return Err(EngineError::InvalidConfig {
				id: config.id,
				reason: "argv must start with an executable".to_string(),
			});
		}

		let mut processes = self.processes.write().await;
		if processes.contains_key(&config.id) {
			return Err(EngineError::AlreadyRegistered(config.id));
		}

		tracing::debug!(id = %config.id, argv = ?config.argv, "process registered");
		processes.insert(
			config.id.clone(),
			ManagedProcess {
				config,
				state: ProcessState::Stopped,
				started_at: None,
				generation: self.next_generation(),
				task: None,
			},
		);
		Ok(())
	}

	async fn unregister(&self, id: &str) -> Result<ProcessConfig> {
		self.stop(id, "unregister").await?;
		let mut processes = self.processes.write().await;
		let mp = processes
			.remove(id)
			.ok_or_else(|| EngineError::NotFound(id.to_string()))?;
		tracing::debug!(id, "process unregistered");
		Ok(mp.config)
	}

	async fn start(&self, id: &str, reason: &str) -> Result<()> {
		if !self.initialized.load(Ordering::SeqCst) {
			return Err(EngineError::NotInitialized);
		}

		let mut processes = self.processes.write().await;
		let mp = processes
			.get_mut(id)
			.ok_or_else(|| EngineError::NotFound(id.to_string()))?;

		if mp.task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
			tracing::debug!(id, "start ignored, already supervised");
			return Ok(());
		}
		mp.task = None;

		let output = OutputCapture::open(id, &mp.config.logger)?;
		let child = match spawn_process(&mp.config) {
			Ok(c) => c,
			Err(e) => {
				output.event(&format!("failed to spawn: {}", e)).await;
				mp.state = ProcessState::Failed { exit_code: -1 };
				mp.started_at = None;
				tracing::error!(id, reason, "{}", e);
				return Err(e);
			}
		};

		let pid = child.id().unwrap_or(0);
		let generation = self.next_generation();
		mp.generation = generation;
		mp.state = ProcessState::Running { pid };
		mp.started_at = Some(Instant::now());
		output
			.event(&format!("started `{}` (pid {}, reason: {})", mp.config.argv.join(" "), pid, reason))
			.await;

		let (cancel_tx, cancel_rx) = watch::channel(None);
		let supervision = Supervision {
			table: Arc::clone(&self.processes),
			id: id.to_string(),
			config: mp.config.clone(),
			generation,
			policy: self.config.restart.clone(),
			stop_timeout: self.config.stop_timeout,
			output,
		};
		let handle = tokio::spawn(supervise(supervision, child, cancel_rx));
		mp.task = Some(SupervisionTask { cancel: cancel_tx, handle });

		tracing::info!(id, pid, reason, "process started");
		Ok(())
	}

	async fn stop(&self, id: &str, reason: &str) -> Result<()> {
		let task = {
			let mut processes = self.processes.write().await;
			let mp = processes
				.get_mut(id)
				.ok_or_else(|| EngineError::NotFound(id.to_string()))?;
			mp.task.take()
		};

		let Some(task) = task else {
			return Ok(());
		};

		let was_active = !task.handle.is_finished();
		let _ = task.cancel.send(Some(reason.to_string()));
		if let Err(e) = task.handle.await {
			tracing::warn!(id, "supervision task ended abnormally: {}", e);
		}

		if was_active {
			let mut processes = self.processes.write().await;
			if let Some(mp) = processes.get_mut(id) {
				mp.state = ProcessState::Stopped;
				mp.started_at = None;
			}
			tracing::info!(id, reason, "process stopped");
		}
		Ok(())
	}

	async fn restart(&self, id: &str, reason: &str) -> Result<()> {
		self.stop(id, reason).await?;
		self.start(id, reason).await
	}

	async fn all_processes(&self) -> Vec<ProcessStatus> {
		let processes = self.processes.read().await;
		let mut result: Vec<ProcessStatus> = processes
			.iter()
			.map(|(id, mp)| status_of(id, mp))
			.collect();
		result.sort_by(|a, b| a.id.cmp(&b.id));
		result
	}
}

fn status_of(id: &str, mp: &ManagedProcess) -> ProcessStatus {
	ProcessStatus {
		id: id.to_string(),
		config: mp.config.clone(),
		state: mp.state.clone(),
		uptime_secs: mp.started_at.map(|t| t.elapsed().as_secs()),
	}
}

/// Everything a supervision task needs after it has been detached from the
/// table lock.
struct Supervision {
	table: ProcessTable,
	id: String,
	config: ProcessConfig,
	generation: u64,
	policy: RestartPolicy,
	stop_timeout: Duration,
	output: OutputCapture,
}

impl Supervision {
	async fn set_state(&self, state: ProcessState) {
		let mut processes = self.table.write().await;
		if let Some(mp) = processes.get_mut(&self.id) {
			// A replaced entry carries a newer generation; leave it alone.
			if mp.generation != self.generation {
				return;
			}
			mp.started_at = match state {
				ProcessState::Running { .. } => Some(Instant::now()),
				_ => None,
			};
			mp.state = state;
		}
	}

	async fn stopped(&self, cancel: &watch::Receiver<Option<String>>) {
		let reason = cancel.borrow().clone().unwrap_or_else(|| "dropped".to_string());
		self.output.event(&format!("stopped (reason: {})", reason)).await;
		self.set_state(ProcessState::Stopped).await;
	}
}

async fn supervise(
	sup: Supervision,
	mut child: Child,
	mut cancel: watch::Receiver<Option<String>>,
) {
	let mut retries: u32 = 0;

	loop {
		capture_output(&mut child, &sup.output);

		let exit_result = tokio::select! {
			status = child.wait() => status,
			_ = cancel.changed() => {
				terminate(&mut child, sup.stop_timeout).await;
				sup.stopped(&cancel).await;
				return;
			}
		};

		let code = match exit_result {
			Ok(exit) if exit.success() => {
				sup.output.event("exited cleanly").await;
				sup.set_state(ProcessState::Stopped).await;
				return;
			}
			Ok(exit) => exit.code().unwrap_or(-1),
			Err(e) => {
				sup.output.event(&format!("wait failed: {}", e)).await;
				sup.set_state(ProcessState::Failed { exit_code: -1 }).await;
				return;
			}
		};

		retries += 1;
		if !sup.policy.restart || retries > sup.policy.max_retries {
			sup.output.event(&format!("failed (exit {})", code)).await;
			sup.set_state(ProcessState::Failed { exit_code: code }).await;
			tracing::warn!(id = %sup.id, code, "process failed");
			return;
		}

		sup.output
			.event(&format!(
				"crashed (exit {}), restarting ({}/{})",
				code, retries, sup.policy.max_retries
			))
			.await;
		sup.set_state(ProcessState::Crashed { exit_code: code, retries }).await;
		tracing::warn!(id = %sup.id, code, retries, "process crashed, restarting");

		tokio::select! {
			_ = tokio::time::sleep(sup.policy.restart_delay) => {}
			_ = cancel.changed() => {
				sup.stopped(&cancel).await;
				return;
			}
		}

		child = match spawn_process(&sup.config) {
			Ok(c) => c,
			Err(e) => {
				sup.output.event(&format!("failed to respawn: {}", e)).await;
				sup.set_state(ProcessState::Failed { exit_code: -1 }).await;
				return;
			}
		};
		let pid = child.id().unwrap_or(0);
		sup.output.event(&format!("restarted (pid {})", pid)).await;
		sup.set_state(ProcessState::Running { pid }).await;
	}
}

fn spawn_process(config: &ProcessConfig) -> Result<Child> {
	let (program, args) = config.argv.split_first().ok_or_else(|| EngineError::InvalidConfig {
		id: config.id.clone(),
		reason: "argv is empty".to_string(),
	})?;

	let mut cmd = Command::new(program);
	cmd.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.process_group(0)
		.kill_on_drop(true);

	if let Some(cwd) = &config.cwd {
		cmd.current_dir(cwd);
	}

	cmd.spawn().map_err(|source| EngineError::Spawn {
		id: config.id.clone(),
		source,
	})
}

fn capture_output(child: &mut Child, output: &OutputCapture) {
	if let Some(stdout) = child.stdout.take() {
		let out = output.clone();
		tokio::spawn(async move {
			pipe_output(stdout, out, Stream::Stdout).await;
		});
	}
	if let Some(stderr) = child.stderr.take() {
		let out = output.clone();
		tokio::spawn(async move {
			pipe_output(stderr, out, Stream::Stderr).await;
		});
	}
}

async fn pipe_output<R: tokio::io::AsyncRead + Unpin>(
	mut reader: R,
	output: OutputCapture,
	stream: Stream,
) {
	let mut buf = [0u8; 4096];
	loop {
		match reader.read(&mut buf).await {
			Ok(0) => break,
			Ok(n) => output.write(stream, &buf[..n]).await,
			Err(_) => break,
		}
	}
}

/// SIGTERM the process group, then SIGKILL once `timeout` runs out.
async fn terminate(child: &mut Child, timeout: Duration) {
	use nix::sys::signal::Signal;

	if let Some(pid) = child.id() {
		signal_group(pid, Signal::SIGTERM);
	}
	if tokio::time::timeout(timeout, child.wait()).await.is_err() {
		if let Some(pid) = child.id() {
			signal_group(pid, Signal::SIGKILL);
		}
		let _ = child.kill().await;
	}
}

fn signal_group(pid: u32, signal: nix::sys::signal::Signal) {
	use nix::sys::signal::killpg;
	use nix::unistd::Pid;
	let _ = killpg(Pid::from_raw(pid as i32), signal);
}
