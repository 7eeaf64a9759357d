use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
	#[error("engine not initialized")]
	NotInitialized,

	#[error("process {0} not found")]
	NotFound(String),

	#[error("process {0} already registered")]
	AlreadyRegistered(String),

	#[error("invalid config for process {id}: {reason}")]
	InvalidConfig { id: String, reason: String },

	#[error("failed to spawn process {id}: {source}")]
	Spawn {
		id: String,
		#[source]
		source: std::io::Error,
	},

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
