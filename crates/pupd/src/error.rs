use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pupd_engine::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::response;
use crate::types::ProcessId;

pub const PROCESS_NOT_FOUND: &str = "Process not found";

#[derive(Error, Debug)]
pub enum RegistryError {
	#[error("process {0} not found")]
	NotFound(ProcessId),

	#[error("command is empty")]
	EmptyCommand,

	#[error(transparent)]
	Engine(#[from] EngineError),
}

#[derive(Error, Debug)]
pub enum LogError {
	/// Carries the underlying read error's message.
	#[error("{0}")]
	NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
	pub name: String,
	pub message: String,
}

impl FieldError {
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
		}
	}
}

/// Errors that cross the HTTP boundary. Rendered as the error envelope.
#[derive(Error, Debug)]
pub enum ApiError {
	#[error("Validation error")]
	Validation(Vec<FieldError>),

	#[error("{0}")]
	NotFound(String),

	#[error("{0}")]
	Internal(String),
}

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			ApiError::Validation(_) => StatusCode::BAD_REQUEST,
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
			ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn fields(&self) -> &[FieldError] {
		match self {
			ApiError::Validation(fields) => fields,
			_ => &[],
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		if let ApiError::Internal(message) = &self {
			tracing::error!("internal error: {}", message);
		}
		response::error_response(self.status(), self.to_string(), self.fields().to_vec())
	}
}

impl From<RegistryError> for ApiError {
	fn from(err: RegistryError) -> Self {
		match err {
			RegistryError::NotFound(_) => ApiError::NotFound(PROCESS_NOT_FOUND.to_string()),
			RegistryError::EmptyCommand => ApiError::Validation(vec![FieldError::new(
				"cmd",
				"Command must contain at least one token",
			)]),
			RegistryError::Engine(e) => e.into(),
		}
	}
}

impl From<EngineError> for ApiError {
	fn from(err: EngineError) -> Self {
		match err {
			EngineError::NotFound(_) => ApiError::NotFound(PROCESS_NOT_FOUND.to_string()),
			other => ApiError::Internal(other.to_string()),
		}
	}
}

impl From<LogError> for ApiError {
	fn from(err: LogError) -> Self {
		match err {
			LogError::NotFound(message) => ApiError::NotFound(message),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_codes() {
		assert_eq!(ApiError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
		assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
		assert_eq!(ApiError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn registry_not_found_uses_fixed_message() {
		let err: ApiError = RegistryError::NotFound(ProcessId::from(9)).into();
		assert!(matches!(err, ApiError::NotFound(ref m) if m == PROCESS_NOT_FOUND));
	}

	#[test]
	fn empty_command_points_at_cmd_field() {
		let err: ApiError = RegistryError::EmptyCommand.into();
		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
		assert_eq!(err.fields()[0].name, "cmd");
	}

	#[test]
	fn engine_failures_pass_their_message_through() {
		let err: ApiError = RegistryError::Engine(EngineError::NotInitialized).into();
		assert!(matches!(err, ApiError::Internal(ref m) if m == "engine not initialized"));
	}

	#[test]
	fn log_errors_keep_io_message() {
		let err: ApiError = LogError::NotFound("No such file or directory (os error 2)".into()).into();
		assert_eq!(err.to_string(), "No such file or directory (os error 2)");
		assert_eq!(err.status(), StatusCode::NOT_FOUND);
	}
}
