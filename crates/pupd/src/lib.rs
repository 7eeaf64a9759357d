//! # pupd
//!
//! HTTP control plane for supervised processes.
//!
//! Clients register a command under a numeric id, then stop, restart, delete
//! it and read its captured output. Actual spawning and crash handling is
//! delegated to an [`Engine`](pupd_engine::Engine); this crate owns the
//! id → process registry and the HTTP contract.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | GET | `/v1/processes` | list definitions |
//! | POST | `/v1/processes/start` | create or replace |
//! | PUT | `/v1/processes/{id}/stop` | stop |
//! | PUT | `/v1/processes/{id}/restart` | restart |
//! | DELETE | `/v1/processes/{id}` | stop and remove |
//! | GET | `/v1/processes/{id}/logs` | full log text |

pub mod api;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logs;
pub mod registry;
pub mod response;
pub mod server;
pub mod types;
pub mod validate;

pub use api::{router, AppState};
pub use config::Config;
pub use error::{ApiError, FieldError, LogError, RegistryError};
pub use logs::LogStore;
pub use registry::{Registry, SupervisedProcess};
pub use types::{ProcessDefinition, ProcessId};
