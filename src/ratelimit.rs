use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
	time::Duration,
};

use axum::{
	body::Body,
	extract::{Request, State},
	http::{HeaderMap, HeaderName, HeaderValue, Response},
	middleware::Next,
	response::IntoResponse,
};
use chrono::{DateTime, Utc};

use crate::Error;

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Narrower window applied to `/login` on top of the gateway-wide limit,
/// since credential stuffing is cheaper to stop here than at the provider.
pub const LOGIN_MAX: u32 = 10;
pub const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// One fixed window for one client key.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
	pub count: u32,
	pub reset_at: DateTime<Utc>,
}

/// Counter storage behind the limiter.
///
/// The in-memory implementation is per-process; under horizontal scaling
/// each instance counts on its own. That is an accepted limitation, and the
/// trait is the seam where an external cache would slot in.
#[axum::async_trait]
pub trait RateStore: Send + Sync {
	/// Atomically fetches the window for `key`, starting a new one when the
	/// old one has expired, and increments it.
	async fn hit(&self, key: &str, window: Duration) -> RateLimitEntry;

	/// Drops expired windows. Only reclaims memory; a missed sweep never
	/// changes an allow/deny decision.
	async fn sweep(&self);
}

/// [`RateStore`] over a mutexed map. The critical section is a single
/// get-or-create-then-increment, so one lock is enough.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl MemoryStore {
	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RateLimitEntry>> {
		self.entries
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
	}
}

#[axum::async_trait]
impl RateStore for MemoryStore {
	async fn hit(&self, key: &str, window: Duration) -> RateLimitEntry {
		let now = Utc::now();
		let mut entries = self.lock();

		let entry = entries
			.entry(key.to_owned())
			.and_modify(|entry| {
				if now > entry.reset_at {
					entry.count = 1;
					entry.reset_at = now + window;
				} else {
					entry.count += 1;
				}
			})
			.or_insert(RateLimitEntry {
				count: 1,
				reset_at: now + window,
			});

		*entry
	}

	async fn sweep(&self) {
		let now = Utc::now();
		let mut entries = self.lock();

		entries.retain(|_, entry| entry.reset_at > now);

		tracing::debug!("rate limiting storage size: {}", entries.len());
	}
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
	pub allowed: bool,
	pub limit: u32,
	pub remaining: u32,
	pub reset_at: DateTime<Utc>,
}

/// Fixed-window request counter keyed by client identity.
#[derive(Clone)]
pub struct RateLimiter {
	store: Arc<dyn RateStore>,
	limit: u32,
	window: Duration,
}

impl RateLimiter {
	#[must_use]
	pub fn new(store: Arc<dyn RateStore>, limit: u32, window: Duration) -> Self {
		Self {
			store,
			limit,
			window,
		}
	}

	pub async fn check(&self, key: &str) -> Decision {
		let entry = self.store.hit(key, self.window).await;

		Decision {
			allowed: entry.count <= self.limit,
			limit: self.limit,
			remaining: self.limit.saturating_sub(entry.count),
			reset_at: entry.reset_at,
		}
	}

	/// Periodically sweeps expired windows out of the store.
	pub fn spawn_sweeper(&self, interval: Duration) {
		let store = Arc::clone(&self.store);

		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);

			loop {
				ticker.tick().await;
				store.sweep().await;
			}
		});
	}
}

/// Derives the client key from proxy headers, first hop first. Clients
/// behind a proxy that strips all of them share the `"unknown"` bucket;
/// that is accepted, not a bug to fix here.
#[must_use]
pub fn client_key(headers: &HeaderMap) -> String {
	let forwarded_first_hop = headers
		.get("x-forwarded-for")
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.split(',').next())
		.map(str::trim)
		.filter(|ip| !ip.is_empty());

	headers
		.get("x-vercel-forwarded-for")
		.and_then(|value| value.to_str().ok())
		.or(forwarded_first_hop)
		.or_else(|| {
			headers
				.get("x-real-ip")
				.and_then(|value| value.to_str().ok())
		})
		.unwrap_or("unknown")
		.to_owned()
}

/// Admission phase: rejects with 429 before any routing, and stamps the
/// `X-RateLimit-*` headers on every response that passes through.
pub async fn middleware(
	State(limiter): State<RateLimiter>,
	req: Request,
	next: Next,
) -> Response<Body> {
	let key = client_key(req.headers());
	let decision = limiter.check(&key).await;

	let mut response = if decision.allowed {
		next.run(req).await
	} else {
		tracing::warn!(%key, "rate limit exceeded");
		Error::RateLimited.into_response()
	};

	apply_headers(response.headers_mut(), &decision);
	response
}

fn apply_headers(headers: &mut HeaderMap, decision: &Decision) {
	// When limiters nest (the login window inside the gateway window), the
	// innermost one stamps first and its headers win; it is the window the
	// client actually has to respect.
	if headers.contains_key(&LIMIT_HEADER) {
		return;
	}

	headers.insert(LIMIT_HEADER, numeric(u64::from(decision.limit)));
	headers.insert(REMAINING_HEADER, numeric(u64::from(decision.remaining)));
	headers.insert(
		RESET_HEADER,
		numeric(decision.reset_at.timestamp().unsigned_abs()),
	);
}

fn numeric(value: u64) -> HeaderValue {
	HeaderValue::from_str(&value.to_string())
		.unwrap_or_else(|_| HeaderValue::from_static("0"))
}
