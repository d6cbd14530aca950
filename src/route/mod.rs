pub mod admin;
pub mod auth;
pub mod posts;

use std::sync::Arc;

use axum::{
	body::Body,
	http::{Method, Response, StatusCode, Uri},
	middleware,
	response::IntoResponse,
	routing::{get, post},
	Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::{
	cors,
	ratelimit::{self, MemoryStore, RateLimiter},
	response::Envelope,
	AppState,
};

/// Assembles the gateway: the route table, the auth requirements per route
/// and the cross-cutting phases (CORS outermost, then admission, then
/// routing). `/health` sits outside the admission layer so probes are never
/// throttled.
pub fn router(state: AppState, mount_prefix: Option<&str>) -> Router {
	let login_limiter = RateLimiter::new(
		Arc::new(MemoryStore::default()),
		ratelimit::LOGIN_MAX,
		ratelimit::LOGIN_WINDOW,
	);

	let api = Router::new()
		.route(
			"/login",
			post(auth::login).layer(middleware::from_fn_with_state(
				login_limiter,
				ratelimit::middleware,
			)),
		)
		.route("/logout", post(auth::logout))
		.route("/user", get(auth::user))
		.route("/posts", get(posts::list))
		.route("/posts/:id", get(posts::get))
		.route("/admin/posts", get(admin::list).post(admin::create))
		.route(
			"/admin/posts/:id",
			get(admin::get).put(admin::update).delete(admin::delete),
		)
		.fallback(not_found)
		.layer(middleware::from_fn_with_state(
			state.clone(),
			ratelimit::middleware,
		));

	let app = Router::new()
		.route("/health", get(health))
		.merge(api)
		.layer(CatchPanicLayer::custom(panic_response))
		.layer(middleware::from_fn_with_state(
			state.clone(),
			cors::middleware,
		))
		.layer(TraceLayer::new_for_http())
		.with_state(state);

	match mount_prefix {
		Some(prefix) => Router::new().nest(prefix, app).fallback(not_found),
		None => app,
	}
}

/// Liveness probe.
async fn health() -> Envelope {
	Envelope::message("ok")
}

/// Unmatched routes get a diagnostic body with the parsed method and path
/// segments. Meant for operators wiring up a client, not for end users.
async fn not_found(method: Method, uri: Uri) -> (StatusCode, Envelope) {
	let segments: Vec<&str> = uri
		.path()
		.split('/')
		.filter(|segment| !segment.is_empty())
		.collect();

	(
		StatusCode::NOT_FOUND,
		Envelope {
			data: Some(json!({
				"method": method.as_str(),
				"segments": segments,
			})),
			message: Some("no route matched".to_owned()),
			errors: None,
			timestamp: Utc::now(),
		},
	)
}

/// Final catch-all: an unwinding handler becomes a generic 500, never a
/// stack trace in the body.
fn panic_response(_err: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
	tracing::error!("handler panicked");

	(
		StatusCode::INTERNAL_SERVER_ERROR,
		Envelope::message("internal server error"),
	)
		.into_response()
}
