use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
	auth::{Auth, Identity},
	extract::Json,
	response::Envelope,
	Error, Provider,
};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
	#[validate(email(message = "must be a valid email address"))]
	pub email: String,
	#[validate(length(min = 1, message = "password must not be empty"))]
	pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
	pub user: Identity,
	pub token: String,
}

/// Exchanges credentials for a bearer token. 401 on a bad pair, and the
/// message never says which half was wrong.
pub async fn login(
	State(provider): State<Provider>,
	Json(input): Json<LoginInput>,
) -> Result<Envelope<LoginData>, Error> {
	let (user, token) = provider.login(&input.email, &input.password).await?;

	tracing::info!(user_id = user.user_id, "logged in");

	Ok(Envelope::data(LoginData { user, token }))
}

/// Invalidates the caller's session at the identity provider.
pub async fn logout(State(provider): State<Provider>, auth: Auth) -> Result<Envelope, Error> {
	provider.logout(&auth.token).await?;

	Ok(Envelope::message("logged out"))
}

/// Returns the caller's identity.
pub async fn user(auth: Auth) -> Envelope<Identity> {
	Envelope::data(auth.identity)
}
