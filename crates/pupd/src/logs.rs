use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::types::ProcessId;

/// Per-process log files laid out as `{dir}/{id}.log`.
#[derive(Debug, Clone)]
pub struct LogStore {
	dir: PathBuf,
}

impl LogStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn path(&self, id: &ProcessId) -> PathBuf {
		self.dir.join(format!("{}.log", id))
	}

	pub fn ensure_dir(&self) -> std::io::Result<()> {
		std::fs::create_dir_all(&self.dir)
	}

	/// Whole file as it is on disk right now. The engine may be appending
	/// concurrently; nothing is locked.
	pub async fn read(&self, id: &ProcessId) -> Result<String, LogError> {
		let bytes = tokio::fs::read(self.path(id))
			.await
			.map_err(|e| LogError::NotFound(e.to_string()))?;
		Ok(String::from_utf8_lossy(&bytes).into_owned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn path_convention() {
		let store = LogStore::new("/var/log/pupd");
		assert_eq!(store.path(&ProcessId::from(12)), PathBuf::from("/var/log/pupd/12.log"));
	}

	#[test]
	fn ensure_dir_creates_nested() {
		let tmp = tempfile::tempdir().unwrap();
		let store = LogStore::new(tmp.path().join("a").join("logs"));
		store.ensure_dir().unwrap();
		assert!(store.dir().is_dir());
	}

	#[tokio::test]
	async fn reads_whole_file() {
		let tmp = tempfile::tempdir().unwrap();
		let store = LogStore::new(tmp.path());
		std::fs::write(store.path(&ProcessId::from(1)), "line one\nline two\n").unwrap();

		let text = store.read(&ProcessId::from(1)).await.unwrap();
		assert_eq!(text, "line one\nline two\n");
	}

	#[tokio::test]
	async fn missing_file_is_not_found_with_io_message() {
		let tmp = tempfile::tempdir().unwrap();
		let store = LogStore::new(tmp.path());

		let err = store.read(&ProcessId::from(404)).await.unwrap_err();
		let LogError::NotFound(message) = err;
		assert!(!message.is_empty());
	}

	#[tokio::test]
	async fn invalid_utf8_is_replaced() {
		let tmp = tempfile::tempdir().unwrap();
		let store = LogStore::new(tmp.path());
		std::fs::write(store.path(&ProcessId::from(2)), b"ok \xff end").unwrap();

		let text = store.read(&ProcessId::from(2)).await.unwrap();
		assert_eq!(text, "ok \u{FFFD} end");
	}
}
