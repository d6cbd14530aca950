use axum::{
	body::Body,
	extract::{Request, State},
	http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode},
	middleware::Next,
	response::IntoResponse,
};

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";

/// Origin allow-list: exact origins and `*.suffix` wildcards.
///
/// An unrecognized origin gets the configured fallback echoed instead of a
/// permissive header; the browser enforces the denial. No request is ever
/// rejected here.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
	rules: Vec<OriginRule>,
	fallback: HeaderValue,
}

#[derive(Debug, Clone)]
enum OriginRule {
	Exact(String),
	Suffix(String),
}

impl CorsPolicy {
	#[must_use]
	pub fn new(origins: &[String], fallback: &str) -> Self {
		Self {
			rules: origins
				.iter()
				.map(|origin| match origin.strip_prefix('*') {
					Some(suffix) => OriginRule::Suffix(suffix.to_owned()),
					None => OriginRule::Exact(origin.clone()),
				})
				.collect(),
			fallback: HeaderValue::from_str(fallback)
				.unwrap_or_else(|_| HeaderValue::from_static("null")),
		}
	}

	fn allows(&self, origin: &str) -> bool {
		self.rules.iter().any(|rule| match rule {
			OriginRule::Exact(exact) => origin == exact,
			OriginRule::Suffix(suffix) => origin.ends_with(suffix),
		})
	}

	fn resolve(&self, origin: Option<&str>) -> HeaderValue {
		origin
			.filter(|origin| self.allows(origin))
			.and_then(|origin| HeaderValue::from_str(origin).ok())
			.unwrap_or_else(|| self.fallback.clone())
	}

	/// Writes the CORS header set onto a response.
	pub fn apply(&self, headers: &mut HeaderMap, origin: Option<&str>) {
		headers.insert(
			header::ACCESS_CONTROL_ALLOW_ORIGIN,
			self.resolve(origin),
		);
		headers.insert(
			header::ACCESS_CONTROL_ALLOW_METHODS,
			HeaderValue::from_static(ALLOW_METHODS),
		);
		headers.insert(
			header::ACCESS_CONTROL_ALLOW_HEADERS,
			HeaderValue::from_static(ALLOW_HEADERS),
		);
		headers.insert(
			header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
			HeaderValue::from_static("true"),
		);
	}
}

/// Outermost gateway phase: preflights short-circuit to a bare 204 before
/// rate limiting or routing, and every other response gets the CORS header
/// set merged on.
pub async fn middleware(
	State(policy): State<CorsPolicy>,
	req: Request,
	next: Next,
) -> Response<Body> {
	let origin = req
		.headers()
		.get(header::ORIGIN)
		.and_then(|value| value.to_str().ok())
		.map(ToOwned::to_owned);

	if req.method() == Method::OPTIONS {
		let mut response = StatusCode::NO_CONTENT.into_response();
		policy.apply(response.headers_mut(), origin.as_deref());
		return response;
	}

	let mut response = next.run(req).await;
	policy.apply(response.headers_mut(), origin.as_deref());
	response
}
