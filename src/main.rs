#![warn(clippy::pedantic)]

use std::{sync::Arc, time::Duration};

use marque::{
	auth::SqlIdentity,
	cors::CorsPolicy,
	ratelimit::{MemoryStore, RateLimiter},
	route,
	store::PgPosts,
	Config, Database, State,
};

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt::init();
	dotenvy::dotenv().ok();

	let config = Config::from_env();

	let database = Database::connect(&config.database_url)
		.await
		.expect("failed to connect to database");

	let limiter = RateLimiter::new(
		Arc::new(MemoryStore::default()),
		config.rate_limit_max,
		config.rate_limit_window,
	);

	limiter.spawn_sweeper(Duration::from_secs(60));

	let state = State {
		posts: Arc::new(PgPosts::new(database.clone())),
		identity: Arc::new(SqlIdentity::new(database)),
		limiter,
		cors: CorsPolicy::new(&config.allowed_origins, &config.fallback_origin),
	};

	let app = route::router(state, config.mount_prefix.as_deref());

	let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on port {}", config.port);

	axum::serve(listener, app).await.unwrap();
}
