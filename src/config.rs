use std::time::Duration;

/// Runtime configuration, read once at startup from the environment.
///
/// Missing optional values fall back to development defaults; a missing
/// `DATABASE_URL` is fatal since the gateway cannot serve anything without
/// its storage adapter.
#[derive(Debug, Clone)]
pub struct Config {
	pub port: u16,
	pub database_url: String,
	/// Exact origins or `*.suffix` wildcards allowed by the CORS resolver.
	pub allowed_origins: Vec<String>,
	/// Origin echoed back when the request origin is not on the allow-list.
	pub fallback_origin: String,
	pub rate_limit_max: u32,
	pub rate_limit_window: Duration,
	/// Optional prefix the gateway is mounted under, e.g. `/api`.
	pub mount_prefix: Option<String>,
}

impl Config {
	/// Reads configuration from the environment.
	///
	/// # Panics
	///
	/// Panics when `DATABASE_URL` is unset or a numeric variable fails to
	/// parse. Only called from `main` before the server starts.
	#[must_use]
	pub fn from_env() -> Self {
		Self {
			port: std::env::var("PORT").map_or_else(
				|_| 3000,
				|port| port.parse().expect("PORT must be a number"),
			),
			database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
			allowed_origins: std::env::var("ALLOWED_ORIGINS").map_or_else(
				|_| {
					vec![
						"http://localhost:3000".to_owned(),
						"*.vercel.app".to_owned(),
					]
				},
				|raw| {
					raw.split(',')
						.map(str::trim)
						.filter(|s| !s.is_empty())
						.map(ToOwned::to_owned)
						.collect()
				},
			),
			fallback_origin: std::env::var("FALLBACK_ORIGIN")
				.unwrap_or_else(|_| "http://localhost:3000".to_owned()),
			rate_limit_max: std::env::var("RATE_LIMIT_MAX").map_or_else(
				|_| 100,
				|max| max.parse().expect("RATE_LIMIT_MAX must be a number"),
			),
			rate_limit_window: Duration::from_secs(std::env::var("RATE_LIMIT_WINDOW_SECS")
				.map_or_else(
					|_| 900,
					|secs| secs.parse().expect("RATE_LIMIT_WINDOW_SECS must be a number"),
				)),
			mount_prefix: std::env::var("MOUNT_PREFIX").ok().filter(|p| !p.is_empty()),
		}
	}
}
