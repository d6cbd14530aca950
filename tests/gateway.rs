//! Cross-cutting gateway behaviour: preflight, CORS header merging,
//! admission control and the 404 diagnostic fallback.

mod common;

use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	http::{header, Method, Request, StatusCode},
};
use common::{server, server_with, MemoryPosts, ADMIN_EMAIL, ORIGIN};
use serde_json::{json, Value};
use tower::ServiceExt;

#[tokio::test]
async fn preflight_short_circuits_with_204() {
	let app = common::router_with(
		Arc::new(MemoryPosts::default()),
		100,
		Duration::from_secs(900),
	);

	let response = app
		.oneshot(
			Request::builder()
				.method(Method::OPTIONS)
				.uri("/posts")
				.header(header::ORIGIN, ORIGIN)
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::NO_CONTENT);
	assert_eq!(
		response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
		ORIGIN
	);
	assert!(response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
		.to_str()
		.unwrap()
		.contains("DELETE"));

	// Preflights are answered before admission, so no quota was spent.
	assert!(response.headers().get("x-ratelimit-limit").is_none());
}

#[tokio::test]
async fn preflight_never_hits_a_route() {
	let app = common::router_with(
		Arc::new(MemoryPosts::default()),
		100,
		Duration::from_secs(900),
	);

	// A path with no route at all still gets the bare 204.
	let response = app
		.oneshot(
			Request::builder()
				.method(Method::OPTIONS)
				.uri("/no/such/path")
				.header(header::ORIGIN, ORIGIN)
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn allowed_origins_are_echoed() {
	let app = server(Arc::new(MemoryPosts::default()));

	let response = app
		.get("/posts")
		.add_header(header::ORIGIN, "https://preview-42.vercel.app".parse().unwrap())
		.await;

	assert_eq!(
		response.header("access-control-allow-origin"),
		"https://preview-42.vercel.app"
	);
}

#[tokio::test]
async fn unknown_origins_get_the_fallback() {
	let app = server(Arc::new(MemoryPosts::default()));

	let response = app
		.get("/posts")
		.add_header(header::ORIGIN, "https://attacker.test".parse().unwrap())
		.await;

	assert_eq!(response.header("access-control-allow-origin"), ORIGIN);
}

#[tokio::test]
async fn unmatched_routes_return_a_diagnostic_404() {
	let app = server(Arc::new(MemoryPosts::default()));

	let response = app.get("/nope/42").await;

	assert_eq!(response.status_code(), 404);

	let body = response.json::<Value>();

	assert_eq!(body["data"]["method"], "GET");
	assert_eq!(body["data"]["segments"][0], "nope");
	assert_eq!(body["data"]["segments"][1], "42");

	// Even the fallback passes through CORS and admission.
	assert_eq!(response.header("access-control-allow-origin"), ORIGIN);
	assert_eq!(response.header("x-ratelimit-limit"), "100");
}

#[tokio::test]
async fn requests_over_the_limit_are_rejected_until_the_window_resets() {
	let app = server_with(
		Arc::new(MemoryPosts::default()),
		2,
		Duration::from_millis(200),
	);

	let first = app.get("/posts").await;

	assert_eq!(first.status_code(), 200);
	assert_eq!(first.header("x-ratelimit-limit"), "2");
	assert_eq!(first.header("x-ratelimit-remaining"), "1");

	let second = app.get("/posts").await;

	assert_eq!(second.status_code(), 200);
	assert_eq!(second.header("x-ratelimit-remaining"), "0");

	let third = app.get("/posts").await;

	assert_eq!(third.status_code(), 429);
	assert_eq!(third.header("x-ratelimit-remaining"), "0");
	assert_eq!(third.json::<Value>()["message"], "too many requests");

	tokio::time::sleep(Duration::from_millis(250)).await;

	let fourth = app.get("/posts").await;

	assert_eq!(fourth.status_code(), 200);
	assert_eq!(fourth.header("x-ratelimit-remaining"), "1");
}

#[tokio::test]
async fn login_reports_its_own_stricter_window() {
	let app = server(Arc::new(MemoryPosts::default()));

	let attempt = || {
		app.post("/login").json(&json!({
			"email": ADMIN_EMAIL,
			"password": "wrong",
		}))
	};

	for used in 1..=10 {
		let response = attempt().await;

		assert_eq!(response.status_code(), 401);
		assert_eq!(response.header("x-ratelimit-limit"), "10");
		assert_eq!(
			response.header("x-ratelimit-remaining"),
			(10 - used).to_string().as_str()
		);
	}

	let rejected = attempt().await;

	assert_eq!(rejected.status_code(), 429);
	assert_eq!(rejected.header("x-ratelimit-limit"), "10");
	assert_eq!(rejected.header("x-ratelimit-remaining"), "0");
}

#[tokio::test]
async fn health_bypasses_admission() {
	let app = server_with(
		Arc::new(MemoryPosts::default()),
		1,
		Duration::from_secs(900),
	);

	assert_eq!(app.get("/posts").await.status_code(), 200);
	assert_eq!(app.get("/posts").await.status_code(), 429);

	// The probe still answers after the quota is gone.
	assert_eq!(app.get("/health").await.status_code(), 200);
}

#[tokio::test]
async fn malformed_bodies_are_a_400_not_a_500() {
	let app = server(Arc::new(MemoryPosts::default()));

	let response = app
		.post("/login")
		.content_type("application/json")
		.text("{not json")
		.await;

	assert_eq!(response.status_code(), 400);
}
