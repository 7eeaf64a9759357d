use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	Integer,
	String,
}

impl FieldKind {
	fn name(self) -> &'static str {
		match self {
			FieldKind::Integer => "integer",
			FieldKind::String => "string",
		}
	}

	fn check(self, value: &Value) -> Option<String> {
		match (self, value) {
			(FieldKind::String, Value::String(_)) => None,
			(FieldKind::Integer, Value::Number(n)) if n.is_i64() => None,
			(FieldKind::Integer, Value::Number(n)) if n.is_u64() => {
				Some(format!("Number must be less than or equal to {}", i64::MAX))
			}
			(FieldKind::Integer, Value::Number(_)) => Some("Expected integer, received float".to_string()),
			(kind, other) => Some(format!("Expected {}, received {}", kind.name(), type_name(other))),
		}
	}
}

/// One entry of a request body schema.
#[derive(Debug, Clone, Copy)]
pub struct Field {
	pub name: &'static str,
	pub kind: FieldKind,
	pub required: bool,
}

impl Field {
	pub const fn required(name: &'static str, kind: FieldKind) -> Self {
		Self { name, kind, required: true }
	}

	pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
		Self { name, kind, required: false }
	}
}

/// Parses `body` as a JSON object, checks it against `schema`, and
/// deserializes it into `T`.
///
/// Every failing field is reported, not just the first. Keys outside the
/// schema are ignored. An optional field set to `null` counts as absent.
pub fn validate_body<T: DeserializeOwned>(body: &[u8], schema: &[Field]) -> Result<T, ApiError> {
	let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
		Value::Null
	} else {
		serde_json::from_slice(body).map_err(|e| {
			ApiError::Validation(vec![FieldError::new("", format!("Invalid JSON: {}", e))])
		})?
	};

	let Value::Object(object) = &value else {
		return Err(ApiError::Validation(vec![FieldError::new(
			"",
			format!("Expected object, received {}", type_name(&value)),
		)]));
	};

	let mut fields = Vec::new();
	for field in schema {
		match object.get(field.name) {
			None if field.required => fields.push(FieldError::new(field.name, "Required")),
			None | Some(Value::Null) if !field.required => {}
			Some(v) => {
				if let Some(message) = field.kind.check(v) {
					fields.push(FieldError::new(field.name, message));
				}
			}
			None => {}
		}
	}

	if !fields.is_empty() {
		return Err(ApiError::Validation(fields));
	}

	serde_json::from_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
