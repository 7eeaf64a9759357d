use pupd_engine::{Engine, EngineError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::RegistryError;
use crate::types::{ProcessDefinition, ProcessId};

/// Reason passed to the engine for operations triggered over HTTP.
pub const API_REASON: &str = "api";

/// Live handle bound to one definition. Lifecycle calls go to the engine
/// under the definition's id.
#[derive(Clone)]
pub struct SupervisedProcess {
	definition: ProcessDefinition,
	engine: Arc<dyn Engine>,
}

impl SupervisedProcess {
	pub fn id(&self) -> &ProcessId {
		&self.definition.id
	}

	pub fn definition(&self) -> &ProcessDefinition {
		&self.definition
	}

	pub async fn start(&self, reason: &str) -> Result<(), EngineError> {
		self.engine.start(self.id().as_str(), reason).await
	}

	pub async fn stop(&self, reason: &str) -> Result<(), EngineError> {
		self.engine.stop(self.id().as_str(), reason).await
	}

	pub async fn restart(&self, reason: &str) -> Result<(), EngineError> {
		self.engine.restart(self.id().as_str(), reason).await
	}
}

impl fmt::Debug for SupervisedProcess {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SupervisedProcess")
			.field("definition", &self.definition)
			.finish_non_exhaustive()
	}
}

/// Maps client ids to supervised processes.
///
/// Every operation holds one lock for its whole read-modify-write sequence,
/// engine calls included, so replace and delete are atomic with respect to
/// each other and no id can end up with two live engine processes.
pub struct Registry {
	engine: Arc<dyn Engine>,
	processes: Mutex<BTreeMap<ProcessId, SupervisedProcess>>,
}

impl Registry {
	pub fn new(engine: Arc<dyn Engine>) -> Self {
		Self {
			engine,
			processes: Mutex::new(BTreeMap::new()),
		}
	}

	pub async fn list(&self) -> Vec<ProcessDefinition> {
		let processes = self.processes.lock().await;
		processes.values().map(|p| p.definition.clone()).collect()
	}

	pub async fn get(&self, id: &ProcessId) -> Option<SupervisedProcess> {
		self.processes.lock().await.get(id).cloned()
	}

	pub async fn contains(&self, id: &ProcessId) -> bool {
		self.processes.lock().await.contains_key(id)
	}

	/// Registers and starts `definition`, first stopping and removing any
	/// process already holding its id.
	///
	/// If the engine fails to start the new process it stays registered and
	/// the engine error is returned.
	pub async fn create_or_replace(
		&self,
		definition: ProcessDefinition,
	) -> Result<ProcessDefinition, RegistryError> {
		if definition.argv.is_empty() {
			return Err(RegistryError::EmptyCommand);
		}

		let mut processes = self.processes.lock().await;

		if let Some(existing) = processes.get(&definition.id).cloned() {
			existing.stop(API_REASON).await?;
			self.engine.unregister(existing.id().as_str()).await?;
			processes.remove(existing.id());
			tracing::info!(id = %definition.id, "replacing existing process");
		}

		self.engine.register(definition.to_engine_config()).await?;
		let process = SupervisedProcess {
			definition: definition.clone(),
			engine: Arc::clone(&self.engine),
		};
		processes.insert(definition.id.clone(), process.clone());

		process.start(API_REASON).await?;
		tracing::info!(id = %definition.id, argv = ?definition.argv, "process created");
		Ok(definition)
	}

	pub async fn stop(&self, id: &ProcessId, reason: &str) -> Result<ProcessDefinition, RegistryError> {
		let processes = self.processes.lock().await;
		let process = processes
			.get(id)
			.ok_or_else(|| RegistryError::NotFound(id.clone()))?;
		process.stop(reason).await?;
		Ok(process.definition.clone())
	}

	pub async fn restart(&self, id: &ProcessId, reason: &str) -> Result<ProcessDefinition, RegistryError> {
		let processes = self.processes.lock().await;
		let process = processes
			.get(id)
			.ok_or_else(|| RegistryError::NotFound(id.clone()))?;
		process.restart(reason).await?;
		Ok(process.definition.clone())
	}

	pub async fn delete(&self, id: &ProcessId) -> Result<ProcessDefinition, RegistryError> {
		let mut processes = self.processes.lock().await;
		let process = processes
			.get(id)
			.cloned()
			.ok_or_else(|| RegistryError::NotFound(id.clone()))?;

		process.stop(API_REASON).await?;
		self.engine.unregister(id.as_str()).await?;
		processes.remove(id);
		tracing::info!(id = %id, "process deleted");
		Ok(process.definition)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use pupd_engine::{ProcessConfig, ProcessState, ProcessStatus};
	use std::collections::HashMap;
	use std::path::PathBuf;

	/// Engine double that records every call and tracks what is registered.
	#[derive(Default)]
	struct RecordingEngine {
		calls: std::sync::Mutex<Vec<String>>,
		registered: std::sync::Mutex<HashMap<String, ProcessConfig>>,
		fail_start: bool,
	}

	impl RecordingEngine {
		fn calls(&self) -> Vec<String> {
			self.calls.lock().unwrap().clone()
		}

		fn record(&self, call: String) {
			self.calls.lock().unwrap().push(call);
		}

		fn live(&self) -> usize {
			self.registered.lock().unwrap().len()
		}
	}

	#[async_trait]
	impl Engine for RecordingEngine {
		async fn init(&self) -> pupd_engine::Result<()> {
			Ok(())
		}

		async fn register(&self, config: ProcessConfig) -> pupd_engine::Result<()> {
			self.record(format!("register {}", config.id));
			let mut registered = self.registered.lock().unwrap();
			if registered.contains_key(&config.id) {
				return Err(EngineError::AlreadyRegistered(config.id));
			}
			registered.insert(config.id.clone(), config);
			Ok(())
		}

		async fn unregister(&self, id: &str) -> pupd_engine::Result<ProcessConfig> {
			self.record(format!("unregister {}", id));
			self.registered
				.lock()
				.unwrap()
				.remove(id)
				.ok_or_else(|| EngineError::NotFound(id.to_string()))
		}

		async fn start(&self, id: &str, reason: &str) -> pupd_engine::Result<()> {
			self.record(format!("start {} {}", id, reason));
			if self.fail_start {
				return Err(EngineError::Spawn {
					id: id.to_string(),
					source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such binary"),
				});
			}
			Ok(())
		}

		async fn stop(&self, id: &str, reason: &str) -> pupd_engine::Result<()> {
			self.record(format!("stop {} {}", id, reason));
			Ok(())
		}

		async fn restart(&self, id: &str, reason: &str) -> pupd_engine::Result<()> {
			self.record(format!("restart {} {}", id, reason));
			Ok(())
		}

		async fn all_processes(&self) -> Vec<ProcessStatus> {
			self.registered
				.lock()
				.unwrap()
				.values()
				.map(|config| ProcessStatus {
					id: config.id.clone(),
					config: config.clone(),
					state: ProcessState::Stopped,
					uptime_secs: None,
				})
				.collect()
		}
	}

	fn definition(id: i64, command: &str) -> ProcessDefinition {
		ProcessDefinition::new(
			ProcessId::from(id),
			crate::cmd::tokenize(command),
			None,
			PathBuf::from(format!("logs/{}.log", id)),
		)
	}

	fn setup() -> (Arc<RecordingEngine>, Registry) {
		let engine = Arc::new(RecordingEngine::default());
		let registry = Registry::new(engine.clone());
		(engine, registry)
	}

	#[tokio::test]
	async fn create_registers_then_starts() {
		let (engine, registry) = setup();

		let def = registry.create_or_replace(definition(1, "sleep 5")).await.unwrap();
		assert_eq!(def.id.as_str(), "1");
		assert_eq!(def.argv, vec!["sleep", "5"]);
		assert_eq!(engine.calls(), vec!["register 1", "start 1 api"]);
		assert_eq!(registry.list().await, vec![def]);
	}

	#[tokio::test]
	async fn replace_stops_old_before_starting_new() {
		let (engine, registry) = setup();

		registry.create_or_replace(definition(1, "sleep 5")).await.unwrap();
		registry.create_or_replace(definition(1, "sleep 10")).await.unwrap();

		assert_eq!(
			engine.calls(),
			vec![
				"register 1",
				"start 1 api",
				"stop 1 api",
				"unregister 1",
				"register 1",
				"start 1 api",
			]
		);
		let listed = registry.list().await;
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].argv, vec!["sleep", "10"]);
		assert_eq!(engine.live(), 1);
	}

	#[tokio::test]
	async fn empty_command_is_rejected_without_touching_existing() {
		let (engine, registry) = setup();
		registry.create_or_replace(definition(1, "sleep 5")).await.unwrap();

		let result = registry.create_or_replace(definition(1, "   ")).await;
		assert!(matches!(result, Err(RegistryError::EmptyCommand)));
		assert_eq!(engine.calls(), vec!["register 1", "start 1 api"]);
		assert_eq!(registry.get(&ProcessId::from(1)).await.unwrap().definition().argv, vec!["sleep", "5"]);
	}

	#[tokio::test]
	async fn unknown_id_fails_without_engine_calls() {
		let (engine, registry) = setup();
		let id = ProcessId::from(7);

		assert!(matches!(registry.stop(&id, API_REASON).await, Err(RegistryError::NotFound(_))));
		assert!(matches!(registry.restart(&id, API_REASON).await, Err(RegistryError::NotFound(_))));
		assert!(matches!(registry.delete(&id).await, Err(RegistryError::NotFound(_))));
		assert!(engine.calls().is_empty());
	}

	#[tokio::test]
	async fn stop_and_restart_keep_membership() {
		let (engine, registry) = setup();
		registry.create_or_replace(definition(2, "sleep 5")).await.unwrap();
		let id = ProcessId::from(2);

		let stopped = registry.stop(&id, API_REASON).await.unwrap();
		let restarted = registry.restart(&id, API_REASON).await.unwrap();
		assert_eq!(stopped, restarted);
		assert!(registry.contains(&id).await);
		assert_eq!(&engine.calls()[2..], ["stop 2 api", "restart 2 api"]);
	}

	#[tokio::test]
	async fn delete_stops_then_removes() {
		let (engine, registry) = setup();
		registry.create_or_replace(definition(3, "sleep 5")).await.unwrap();
		let id = ProcessId::from(3);

		let def = registry.delete(&id).await.unwrap();
		assert_eq!(def.argv, vec!["sleep", "5"]);
		assert!(registry.get(&id).await.is_none());
		assert!(registry.list().await.is_empty());
		assert_eq!(&engine.calls()[2..], ["stop 3 api", "unregister 3"]);
		assert_eq!(engine.live(), 0);
	}

	#[tokio::test]
	async fn failed_start_leaves_entry_registered() {
		let engine = Arc::new(RecordingEngine {
			fail_start: true,
			..Default::default()
		});
		let registry = Registry::new(engine.clone());

		let result = registry.create_or_replace(definition(4, "missing-binary")).await;
		assert!(matches!(result, Err(RegistryError::Engine(EngineError::Spawn { .. }))));
		assert!(registry.contains(&ProcessId::from(4)).await);
	}

	#[tokio::test]
	async fn ids_stay_unique_across_mixed_operations() {
		let (engine, registry) = setup();

		for step in 0..40i64 {
			let id = step % 3;
			if step % 5 == 4 {
				let _ = registry.delete(&ProcessId::from(id)).await;
			} else {
				registry
					.create_or_replace(definition(id, &format!("sleep {}", step)))
					.await
					.unwrap();
			}

			let listed = registry.list().await;
			let mut ids: Vec<&ProcessId> = listed.iter().map(|d| &d.id).collect();
			ids.dedup();
			assert_eq!(ids.len(), listed.len());
			assert_eq!(engine.live(), listed.len());
		}
	}

	#[tokio::test]
	async fn concurrent_creates_leave_one_instance() {
		let (engine, registry) = setup();
		let registry = Arc::new(registry);

		let mut handles = Vec::new();
		for n in 0..8 {
			let registry = Arc::clone(&registry);
			handles.push(tokio::spawn(async move {
				registry
					.create_or_replace(definition(1, &format!("sleep {}", n)))
					.await
			}));
		}
		for handle in handles {
			handle.await.unwrap().unwrap();
		}

		assert_eq!(registry.list().await.len(), 1);
		assert_eq!(engine.live(), 1);
		let stops = engine.calls().iter().filter(|c| c.starts_with("stop")).count();
		assert_eq!(stops, 7);
	}
}
