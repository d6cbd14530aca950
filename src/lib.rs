#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod extract;
pub mod model;
pub mod pagination;
pub mod ratelimit;
pub mod response;
pub mod route;
pub mod store;

use std::sync::Arc;

pub use config::Config;
pub use error::Error;

pub type Database = sqlx::Pool<sqlx::Postgres>;

/// Post storage, injected so the gateway core stays testable without Postgres.
pub type Posts = Arc<dyn store::PostStore>;

/// Identity provider handling login, token introspection and logout.
pub type Provider = Arc<dyn auth::IdentityProvider>;

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access:
/// the post store, the identity provider, the gateway-wide rate limiter and
/// the CORS policy. Each field is extractable on its own through `FromRef`.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub posts: Posts,
	pub identity: Provider,
	pub limiter: ratelimit::RateLimiter,
	pub cors: cors::CorsPolicy,
}

pub type AppState = State;
