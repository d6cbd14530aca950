use std::collections::BTreeMap;

use axum::{
	body::Body,
	http::Response,
	response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Field name to list of human-readable problems with it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// The response envelope every endpoint uses: `{data?, message?, errors?,
/// timestamp}`. Paginated listings use [`crate::pagination::Page`] instead,
/// which carries `meta` and `links` alongside `data`.
#[derive(Debug, Serialize)]
pub struct Envelope<T = serde_json::Value> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub errors: Option<FieldErrors>,
	pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> Envelope<T> {
	#[must_use]
	pub fn data(data: T) -> Self {
		Self {
			data: Some(data),
			message: None,
			errors: None,
			timestamp: Utc::now(),
		}
	}
}

impl Envelope {
	#[must_use]
	pub fn message(message: impl Into<String>) -> Self {
		Self {
			data: None,
			message: Some(message.into()),
			errors: None,
			timestamp: Utc::now(),
		}
	}

	#[must_use]
	pub fn invalid(message: impl Into<String>, errors: FieldErrors) -> Self {
		Self {
			data: None,
			message: Some(message.into()),
			errors: Some(errors),
			timestamp: Utc::now(),
		}
	}
}

impl<T: Serialize> IntoResponse for Envelope<T> {
	fn into_response(self) -> Response<Body> {
		axum::Json(self).into_response()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn empty_fields_are_omitted() {
		let body = serde_json::to_value(Envelope::message("ok")).unwrap();

		assert_eq!(body["message"], "ok");
		assert!(body.get("data").is_none());
		assert!(body.get("errors").is_none());
		assert!(body.get("timestamp").is_some());
	}
}
