use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::FieldError;

/// `{data, error}` wrapper shared by every response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
	pub data: Option<T>,
	pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
	pub code: u16,
	pub message: String,
	pub fields: Vec<FieldError>,
}

/// Successful response; `T` becomes the envelope's `data`.
pub struct ApiResponse<T>(pub T);

impl<T: Serialize> IntoResponse for ApiResponse<T> {
	fn into_response(self) -> Response {
		Json(Envelope {
			data: Some(self.0),
			error: None,
		})
		.into_response()
	}
}

pub fn error_response(status: StatusCode, message: String, fields: Vec<FieldError>) -> Response {
	let body = Envelope::<()> {
		data: None,
		error: Some(ErrorBody {
			code: status.as_u16(),
			message,
			fields,
		}),
	};
	(status, Json(body)).into_response()
}
