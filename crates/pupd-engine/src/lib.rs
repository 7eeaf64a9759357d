//! # pupd-engine
//!
//! Process supervision engine behind `pupd`.
//!
//! Registers process definitions, spawns them on request, restarts them when
//! they crash, and appends their stdout/stderr to per-process log files.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pupd_engine::{Engine, EngineConfig, LoggerConfig, NativeEngine, ProcessConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = NativeEngine::new(EngineConfig::default());
//! engine.init().await.unwrap();
//!
//! engine
//! 	.register(ProcessConfig {
//! 		id: "web".into(),
//! 		argv: vec!["sleep".into(), "60".into()],
//! 		cwd: None,
//! 		logger: LoggerConfig::single_file("logs/web.log"),
//! 	})
//! 	.await
//! 	.unwrap();
//! engine.start("web", "example").await.unwrap();
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod output;
pub mod supervisor;
pub mod types;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use output::OutputCapture;
pub use supervisor::NativeEngine;
pub use types::*;
