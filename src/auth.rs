use std::convert::Infallible;

use argon2::Argon2;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::Error, Database, Provider};

pub const AUTHORIZATION_PREFIX: &str = "Bearer ";

const KEY_LENGTH: usize = 32;

/// A validated identity, as returned by the identity provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
	pub user_id: i64,
	pub email: String,
	pub name: String,
}

/// Per-request authentication context for routes that accept both
/// anonymous and authenticated callers. Never persisted.
#[derive(Debug, Default)]
pub struct AuthContext {
	pub user: Option<Identity>,
}

impl AuthContext {
	#[must_use]
	pub fn is_authenticated(&self) -> bool {
		self.user.is_some()
	}
}

/// A failure to authenticate.
///
/// Display text is shown to the client on a 401, so provider internals stay
/// in the `Unavailable` payload, which is only logged.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
	#[error("invalid email or password")]
	InvalidCredentials,
	#[error("missing bearer token")]
	MissingToken,
	#[error("invalid bearer token")]
	InvalidToken,
	#[error("authentication unavailable")]
	Unavailable(String),
}

/// External identity provider contract.
///
/// The gateway fails closed: any provider error surfaces as a 401, never as
/// an authenticated context.
#[axum::async_trait]
pub trait IdentityProvider: Send + Sync {
	/// Exchanges credentials for an identity and an opaque bearer token.
	async fn login(&self, email: &str, password: &str) -> Result<(Identity, String), AuthFailure>;

	/// Introspects a bearer token.
	async fn validate(&self, token: &str) -> Result<Identity, AuthFailure>;

	/// Invalidates the session behind a bearer token.
	async fn logout(&self, token: &str) -> Result<(), AuthFailure>;
}

/// Extracts and validates the bearer token from the request.
///
/// Routes marked as requiring auth take this extractor; a missing or
/// malformed header, or a token the provider rejects, turns into a 401
/// before the handler body runs.
///
/// ```rust,ignore
/// async fn route(auth: Auth) {
///   println!("{:?}", auth.identity);
/// }
/// ```
#[derive(Debug)]
pub struct Auth {
	pub identity: Identity,
	/// The raw token, kept so logout can invalidate it.
	pub token: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Auth
where
	Provider: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = Error;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let token = bearer_token(&parts.headers)?.to_owned();

		let provider = Provider::from_ref(state);
		let identity = provider.validate(&token).await.map_err(|failure| {
			tracing::warn!(%failure, "rejected bearer token");
			failure
		})?;

		Ok(Self { identity, token })
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
	Provider: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = Infallible;

	/// Same token handling as [`Auth`], but failures yield an anonymous
	/// context instead of a 401.
	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let Ok(token) = bearer_token(&parts.headers) else {
			return Ok(Self::default());
		};

		let provider = Provider::from_ref(state);

		Ok(Self {
			user: provider.validate(token).await.ok(),
		})
	}
}

fn bearer_token(headers: &header::HeaderMap) -> Result<&str, AuthFailure> {
	let header = headers
		.get(header::AUTHORIZATION)
		.ok_or(AuthFailure::MissingToken)?;

	header
		.to_str()
		.ok()
		.and_then(|value| value.strip_prefix(AUTHORIZATION_PREFIX))
		.filter(|token| !token.is_empty())
		.ok_or(AuthFailure::InvalidToken)
}

/// Identity provider backed by the `users` and `sessions` tables.
///
/// Tokens are opaque session UUIDs; passwords are argon2 hashes salted with
/// the user's row id, as the rest of the stack expects.
#[derive(Clone)]
pub struct SqlIdentity {
	database: Database,
	hasher: Argon2<'static>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
	id: i64,
	name: String,
	email: String,
	password: Vec<u8>,
}

impl From<UserRow> for Identity {
	fn from(row: UserRow) -> Self {
		Self {
			user_id: row.id,
			email: row.email,
			name: row.name,
		}
	}
}

impl SqlIdentity {
	#[must_use]
	pub fn new(database: Database) -> Self {
		Self {
			database,
			hasher: Argon2::default(),
		}
	}

	fn hash_password(&self, password: &str, id: i64) -> Result<[u8; KEY_LENGTH], AuthFailure> {
		// Widen the 8-byte row id to the recommended 16-byte salt.
		let mut salt = [0; 16];
		salt[..8].copy_from_slice(&id.to_be_bytes());
		salt[8..].copy_from_slice(&id.to_be_bytes());

		let mut hash = [0; KEY_LENGTH];

		self.hasher
			.hash_password_into(password.as_bytes(), &salt, &mut hash)
			.map_err(|error| AuthFailure::Unavailable(error.to_string()))?;

		Ok(hash)
	}
}

fn unavailable(error: &sqlx::Error) -> AuthFailure {
	tracing::error!(%error, "identity lookup failed");
	AuthFailure::Unavailable(error.to_string())
}

#[axum::async_trait]
impl IdentityProvider for SqlIdentity {
	async fn login(&self, email: &str, password: &str) -> Result<(Identity, String), AuthFailure> {
		let user = sqlx::query_as::<_, UserRow>(
			"SELECT id, name, email, password FROM users WHERE email = $1",
		)
		.bind(email)
		.fetch_optional(&self.database)
		.await
		.map_err(|error| unavailable(&error))?
		.ok_or(AuthFailure::InvalidCredentials)?;

		let hashed = self.hash_password(password, user.id)?;

		if user.password != hashed {
			return Err(AuthFailure::InvalidCredentials);
		}

		let token = Uuid::new_v4();

		sqlx::query("INSERT INTO sessions (id, user_id) VALUES ($1, $2)")
			.bind(token)
			.bind(user.id)
			.execute(&self.database)
			.await
			.map_err(|error| unavailable(&error))?;

		Ok((user.into(), token.to_string()))
	}

	async fn validate(&self, token: &str) -> Result<Identity, AuthFailure> {
		let token = Uuid::parse_str(token).map_err(|_| AuthFailure::InvalidToken)?;

		let user = sqlx::query_as::<_, UserRow>(
			r"
				SELECT u.id, u.name, u.email, u.password FROM users u
				JOIN sessions s ON s.user_id = u.id
				WHERE s.id = $1
			",
		)
		.bind(token)
		.fetch_optional(&self.database)
		.await
		.map_err(|error| unavailable(&error))?
		.ok_or(AuthFailure::InvalidToken)?;

		Ok(user.into())
	}

	async fn logout(&self, token: &str) -> Result<(), AuthFailure> {
		let token = Uuid::parse_str(token).map_err(|_| AuthFailure::InvalidToken)?;

		sqlx::query("DELETE FROM sessions WHERE id = $1")
			.bind(token)
			.execute(&self.database)
			.await
			.map_err(|error| unavailable(&error))?;

		Ok(())
	}
}
