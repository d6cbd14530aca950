use axum::{
	body::Body,
	extract::rejection::{JsonRejection, QueryRejection},
	http::{Response, StatusCode},
	response::IntoResponse,
};

use crate::{
	auth::AuthFailure,
	response::{Envelope, FieldErrors},
	store::StoreError,
};

/// Error type for the application.
///
/// The Display text is written for logs and may contain sensitive detail;
/// what reaches the client is decided in `into_response`, which only ever
/// emits the short messages of the response envelope.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("body error: {0}")]
	Json(#[from] JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("auth error: {0}")]
	Auth(#[from] AuthFailure),
	#[error("{0} not found")]
	NotFound(&'static str),
	#[error("rate limit exceeded")]
	RateLimited,
	#[error("storage error: {0}")]
	Storage(#[from] StoreError),
}

impl Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) => StatusCode::UNPROCESSABLE_ENTITY,
			Self::Json(..) | Self::Query(..) => StatusCode::BAD_REQUEST,
			Self::Auth(..) => StatusCode::UNAUTHORIZED,
			Self::NotFound(..) => StatusCode::NOT_FOUND,
			Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
			Self::Storage(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		let envelope = match self {
			Self::Validation(errors) => {
				Envelope::invalid("validation failed", field_errors(&errors))
			}
			Self::Json(rejection) => Envelope::message(rejection.body_text()),
			Self::Query(rejection) => Envelope::message(rejection.body_text()),
			Self::Auth(failure) => Envelope::message(failure.to_string()),
			Self::NotFound(resource) => Envelope::message(format!("{resource} not found")),
			Self::RateLimited => Envelope::message("too many requests"),
			Self::Storage(error) => {
				tracing::error!(%error, "storage failure");
				Envelope::message("internal server error")
			}
		};

		(status, envelope).into_response()
	}
}

/// Flattens [`validator::ValidationErrors`] into the per-field map the 422
/// envelope carries, falling back to the error code when a rule has no
/// message.
fn field_errors(errors: &validator::ValidationErrors) -> FieldErrors {
	errors
		.field_errors()
		.into_iter()
		.map(|(field, errors)| {
			(
				field.to_string(),
				errors
					.iter()
					.map(|error| {
						error
							.message
							.as_ref()
							.map_or_else(|| error.code.to_string(), ToString::to_string)
					})
					.collect(),
			)
		})
		.collect()
}
