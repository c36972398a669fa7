//! Unauthenticated operations and user-facing payloads.

// crates.io
use http::Method;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::SessionToken,
	client::Endpoint,
	http::{ApiResponse, HttpTransport},
	obs::{self, CallKind},
	request::handler,
};

/// Successful end-user login.
#[derive(Clone, Debug)]
pub struct Login {
	/// Session token issued for the user.
	pub token: SessionToken,
	/// Decoded login response body.
	pub user: Value,
}

/// Error returned when a [`NewUser`] is missing required fields.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum NewUserError {
	/// The username was empty.
	#[error("New user requires a username.")]
	MissingUsername,
	/// The password was empty.
	#[error("New user requires a password.")]
	MissingPassword,
}

/// Validated account creation payload.
///
/// Construction fails before any request exists, so [`ServerClient::create_user`] never sends
/// an incomplete account.
///
/// [`ServerClient::create_user`]: crate::client::ServerClient::create_user
#[derive(Clone, Serialize)]
pub struct NewUser {
	username: String,
	password: String,
	emails: Vec<String>,
	#[serde(flatten)]
	extra: Map<String, Value>,
}
impl NewUser {
	/// Creates a payload after checking that username and password are present.
	pub fn new<I, S>(
		username: impl Into<String>,
		password: impl Into<String>,
		emails: I,
	) -> Result<Self, NewUserError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let username = username.into();
		let password = password.into();

		if username.is_empty() {
			return Err(NewUserError::MissingUsername);
		}
		if password.is_empty() {
			return Err(NewUserError::MissingPassword);
		}

		Ok(Self {
			username,
			password,
			emails: emails.into_iter().map(Into::into).collect(),
			extra: Map::new(),
		})
	}

	/// Adds an extra field sent alongside the required ones.
	pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
		self.extra.insert(key.into(), value);

		self
	}

	/// Account username.
	pub fn username(&self) -> &str {
		&self.username
	}

	/// Account email addresses.
	pub fn emails(&self) -> &[String] {
		&self.emails
	}
}
impl Debug for NewUser {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("NewUser")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("emails", &self.emails)
			.finish()
	}
}

/// Client limited to operations that need no server credentials.
pub struct AnonymousClient<C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) endpoint: Endpoint<C>,
}
impl<C> AnonymousClient<C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn from_endpoint(endpoint: Endpoint<C>) -> Self {
		Self { endpoint }
	}

	/// Logs a user in with basic credentials (`POST /login`).
	///
	/// A 200 carrying a session token yields the token and the decoded body. Any other answer,
	/// including a 200 without a token, yields `None`. Transport failures are errors.
	pub async fn login(&self, username: &str, password: &str) -> Result<Option<Login>> {
		let request = self
			.endpoint
			.request(["login"])
			.with_method(Method::POST)
			.with_auth(username, password)
			.when_status(200, |response: ApiResponse| async move {
				let Some(token) = response.session_token() else {
					return Ok(None);
				};

				response.json().map(|user| Some(Login { token, user }))
			})
			.with_default_handler(handler::give_nothing);

		obs::observe_call(CallKind::Login, "login", request.send()).await
	}

	/// Fetches the anonymous key pair (`GET /private`). Only a 200 succeeds.
	pub async fn get_anonymous_pair(&self) -> Result<Value> {
		let request = self
			.endpoint
			.request(["private"])
			.when_status(200, |response: ApiResponse| async move { response.json() });

		obs::observe_call(CallKind::AnonymousPair, "get_anonymous_pair", request.send()).await
	}
}
impl<C> Clone for AnonymousClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { endpoint: self.endpoint.clone() }
	}
}
impl<C> Debug for AnonymousClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AnonymousClient").field("path_prefix", &self.endpoint.path_prefix).finish()
	}
}
