use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ProcessConfig, ProcessStatus};

/// Operations a process-supervision backend exposes to the control plane.
///
/// Ids are opaque strings. `reason` is recorded in the process log and in
/// tracing output; it does not change behaviour.
#[async_trait]
pub trait Engine: Send + Sync {
	async fn init(&self) -> Result<()>;

	/// Accepts a new process definition without starting it.
	async fn register(&self, config: ProcessConfig) -> Result<()>;

	/// Stops the process if needed and forgets it.
	async fn unregister(&self, id: &str) -> Result<ProcessConfig>;

	async fn start(&self, id: &str, reason: &str) -> Result<()>;

	/// Returns once the OS process has exited.
	async fn stop(&self, id: &str, reason: &str) -> Result<()>;

	async fn restart(&self, id: &str, reason: &str) -> Result<()>;

	async fn all_processes(&self) -> Vec<ProcessStatus>;

	async fn shutdown(&self) -> Result<()> {
		for process in self.all_processes().await {
			self.stop(&process.id, "shutdown").await?;
		}
		Ok(())
	}
}
