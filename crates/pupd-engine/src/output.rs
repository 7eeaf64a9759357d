use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::types::LoggerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
	Stdout,
	Stderr,
}

type Sink = Arc<Mutex<File>>;

/// Copies child output into the files named by a [`LoggerConfig`].
///
/// When stdout and stderr point at the same path they share one handle, so
/// writes from both streams interleave in arrival order.
#[derive(Clone)]
pub struct OutputCapture {
	id: String,
	stdout: Option<Sink>,
	stderr: Option<Sink>,
	console: bool,
}

impl OutputCapture {
	pub fn open(id: &str, logger: &LoggerConfig) -> io::Result<Self> {
		let stdout = logger.stdout.as_deref().map(open_log).transpose()?;
		let stderr = match (&logger.stderr, &logger.stdout) {
			(Some(err), Some(out)) if err == out => stdout.clone(),
			(Some(err), _) => Some(open_log(err)?),
			(None, _) => None,
		};

		Ok(Self {
			id: id.to_string(),
			stdout,
			stderr,
			console: logger.console,
		})
	}

	pub async fn write(&self, stream: Stream, data: &[u8]) {
		let sink = match stream {
			Stream::Stdout => &self.stdout,
			Stream::Stderr => &self.stderr,
		};
		if let Some(sink) = sink {
			let mut file = sink.lock().await;
			if let Err(e) = file.write_all(data) {
				tracing::warn!(id = %self.id, "failed to write process output: {}", e);
			}
		}

		if self.console {
			let _ = match stream {
				Stream::Stdout => io::stdout().lock().write_all(data),
				Stream::Stderr => io::stderr().lock().write_all(data),
			};
		}
	}

	/// Appends a supervisor line such as `[pupd] 1 exited cleanly`.
	pub async fn event(&self, message: &str) {
		let line = format!("[pupd] {} {}\n", self.id, message);
		let stream = if self.stdout.is_some() { Stream::Stdout } else { Stream::Stderr };
		self.write(stream, line.as_bytes()).await;
	}
}

fn open_log(path: &Path) -> io::Result<Sink> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}
	let file = OpenOptions::new().create(true).append(true).open(path)?;
	Ok(Arc::new(Mutex::new(file)))
}
