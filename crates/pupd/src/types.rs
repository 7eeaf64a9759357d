use pupd_engine::{LoggerConfig, ProcessConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Client-facing process identifier.
///
/// Create requests carry a numeric id which is keyed by its decimal string
/// form (`1` becomes `"1"`); path parameters are taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<i64> for ProcessId {
	fn from(id: i64) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for ProcessId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<&str> for ProcessId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl fmt::Display for ProcessId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Desired configuration of a supervised process, independent of whether it
/// is currently running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
	pub id: ProcessId,
	pub argv: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cwd: Option<PathBuf>,
	pub logger: LoggerConfig,
}

impl ProcessDefinition {
	/// stdout and stderr both go to `log_path`; console echo is off.
	pub fn new(id: ProcessId, argv: Vec<String>, cwd: Option<PathBuf>, log_path: PathBuf) -> Self {
		Self {
			id,
			argv,
			cwd,
			logger: LoggerConfig::single_file(log_path),
		}
	}

	pub fn to_engine_config(&self) -> ProcessConfig {
		ProcessConfig {
			id: self.id.to_string(),
			argv: self.argv.clone(),
			cwd: self.cwd.clone(),
			logger: self.logger.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numeric_id_is_keyed_by_decimal_string() {
		assert_eq!(ProcessId::from(1), ProcessId::new("1"));
		assert_eq!(ProcessId::from(-42).as_str(), "-42");
	}

	#[test]
	fn definition_serializes_like_the_wire_contract() {
		let def = ProcessDefinition::new(
			ProcessId::from(1),
			vec!["sleep".into(), "5".into()],
			None,
			PathBuf::from("logs/1.log"),
		);
		let json = serde_json::to_value(&def).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"id": "1",
				"argv": ["sleep", "5"],
				"logger": { "stdout": "logs/1.log", "stderr": "logs/1.log", "console": false },
			})
		);
	}

	#[test]
	fn engine_config_carries_everything() {
		let def = ProcessDefinition::new(
			ProcessId::from(3),
			vec!["ls".into()],
			Some(PathBuf::from("/tmp")),
			PathBuf::from("logs/3.log"),
		);
		let config = def.to_engine_config();
		assert_eq!(config.id, "3");
		assert_eq!(config.argv, vec!["ls"]);
		assert_eq!(config.cwd, Some(PathBuf::from("/tmp")));
		assert_eq!(config.logger, def.logger);
	}
}
