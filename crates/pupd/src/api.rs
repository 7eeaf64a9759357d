use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Deserialize;
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cmd;
use crate::error::{ApiError, FieldError, PROCESS_NOT_FOUND};
use crate::logs::LogStore;
use crate::registry::{Registry, API_REASON};
use crate::response::ApiResponse;
use crate::types::{ProcessDefinition, ProcessId};
use crate::validate::{self, Field, FieldKind};

#[derive(Clone)]
pub struct AppState {
	pub registry: Arc<Registry>,
	pub logs: LogStore,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/v1/processes", get(list_processes))
		.route("/v1/processes/start", post(start_process))
		.route("/v1/processes/{id}", delete(delete_process))
		.route("/v1/processes/{id}/stop", put(stop_process))
		.route("/v1/processes/{id}/restart", put(restart_process))
		.route("/v1/processes/{id}/logs", get(process_logs))
		.fallback(not_found)
		.method_not_allowed_fallback(not_found)
		.layer(CatchPanicLayer::custom(handle_panic))
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state)
}

const START_SCHEMA: &[Field] = &[
	Field::required("id", FieldKind::Integer),
	Field::required("cmd", FieldKind::String),
	Field::optional("cwd", FieldKind::String),
];

/// Body of `POST /v1/processes/start`. `id` becomes the string key
/// `ProcessId::from(id)`.
#[derive(Debug, Deserialize)]
struct StartRequest {
	id: i64,
	cmd: String,
	cwd: Option<String>,
}

/// `{id}` path segment. A segment that does not decode is reported as a
/// validation error on `id` instead of axum's plain-text rejection.
struct IdPath(ProcessId);

impl<S: Send + Sync> FromRequestParts<S> for IdPath {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let Path(id) = Path::<String>::from_request_parts(parts, state)
			.await
			.map_err(|e| ApiError::Validation(vec![FieldError::new("id", e.body_text())]))?;
		Ok(Self(ProcessId::new(id)))
	}
}

async fn list_processes(State(state): State<AppState>) -> ApiResponse<Vec<ProcessDefinition>> {
	ApiResponse(state.registry.list().await)
}

async fn start_process(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<ApiResponse<ProcessDefinition>, ApiError> {
	let request: StartRequest = validate::validate_body(&body, START_SCHEMA)?;

	let id = ProcessId::from(request.id);
	let log_path = state.logs.path(&id);
	let definition = ProcessDefinition::new(
		id,
		cmd::tokenize(&request.cmd),
		request.cwd.map(PathBuf::from),
		log_path,
	);

	let definition = state.registry.create_or_replace(definition).await?;
	Ok(ApiResponse(definition))
}

async fn stop_process(
	State(state): State<AppState>,
	IdPath(id): IdPath,
) -> Result<ApiResponse<ProcessDefinition>, ApiError> {
	let definition = state.registry.stop(&id, API_REASON).await?;
	Ok(ApiResponse(definition))
}

async fn restart_process(
	State(state): State<AppState>,
	IdPath(id): IdPath,
) -> Result<ApiResponse<ProcessDefinition>, ApiError> {
	let definition = state.registry.restart(&id, API_REASON).await?;
	Ok(ApiResponse(definition))
}

async fn delete_process(
	State(state): State<AppState>,
	IdPath(id): IdPath,
) -> Result<ApiResponse<ProcessDefinition>, ApiError> {
	let definition = state.registry.delete(&id).await?;
	Ok(ApiResponse(definition))
}

async fn process_logs(
	State(state): State<AppState>,
	IdPath(id): IdPath,
) -> Result<ApiResponse<String>, ApiError> {
	if !state.registry.contains(&id).await {
		return Err(ApiError::NotFound(PROCESS_NOT_FOUND.to_string()));
	}
	let log = state.logs.read(&id).await?;
	Ok(ApiResponse(log))
}

async fn not_found() -> ApiError {
	ApiError::NotFound("Not found".to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
	let detail = if let Some(s) = err.downcast_ref::<String>() {
		s.clone()
	} else if let Some(s) = err.downcast_ref::<&str>() {
		s.to_string()
	} else {
		"unknown panic payload".to_string()
	};
	tracing::error!("handler panicked: {}", detail);
	ApiError::Internal("Internal server error".to_string()).into_response()
}
