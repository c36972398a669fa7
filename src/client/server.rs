//! Trusted-service operations gated on configured server credentials.

// crates.io
use http::Method;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{
		SERVER_SECRET_HEADER, ScopeSet, ServerName, ServerSecret, SessionToken, TokenData, UserId,
	},
	client::{AnonymousClient, Login, NewUser},
	config::{ClientConfig, ServerAuthMode},
	http::HttpTransport,
	obs::{self, CallKind},
	request::{RequestBuilder, handler},
	token::{ServerLogin, ServerTokenCache},
};

#[derive(Serialize)]
struct Updates<'a, T>
where
	T: ?Sized,
{
	updates: &'a T,
}

/// Client exposing the full trusted-service surface.
///
/// Owns its own [`ServerTokenCache`]; clones share it.
pub struct ServerClient<C>
where
	C: ?Sized + HttpTransport,
{
	anonymous: AnonymousClient<C>,
	tokens: ServerTokenCache,
	server_secret: ServerSecret,
	server_auth: ServerAuthMode,
}
impl<C> ServerClient<C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn from_parts(
		anonymous: AnonymousClient<C>,
		name: ServerName,
		secret: ServerSecret,
		config: &ClientConfig,
	) -> Self {
		let endpoint = &anonymous.endpoint;
		let source = Arc::new(ServerLogin::new(
			endpoint.transport.clone(),
			endpoint.resolver.clone(),
			endpoint.path_prefix.as_str(),
			name,
			secret.clone(),
		));
		let tokens = ServerTokenCache::new(source, config.token_refresh_interval);

		Self { anonymous, tokens, server_secret: secret, server_auth: config.server_auth }
	}

	/// The unauthenticated surface.
	pub fn anonymous(&self) -> &AnonymousClient<C> {
		&self.anonymous
	}

	/// See [`AnonymousClient::login`].
	pub async fn login(&self, username: &str, password: &str) -> Result<Option<Login>> {
		self.anonymous.login(username, password).await
	}

	/// See [`AnonymousClient::get_anonymous_pair`].
	pub async fn get_anonymous_pair(&self) -> Result<Value> {
		self.anonymous.get_anonymous_pair().await
	}

	/// Returns the cached server token, acquiring one first if needed.
	pub async fn with_server_token(&self) -> Result<SessionToken> {
		self.tokens.get().await
	}

	/// The server token cache backing this client.
	pub fn server_tokens(&self) -> &ServerTokenCache {
		&self.tokens
	}

	/// Shared secret this service was configured with.
	pub fn server_secret(&self) -> &ServerSecret {
		&self.server_secret
	}

	/// Validates a session token (`GET /token/{token}`).
	///
	/// Only a 200 carries identity data; every other status means the token is not valid and
	/// yields `None`. Errors are reserved for unavailability, transport failures, and bodies that
	/// are not JSON objects.
	pub async fn check_token(&self, token: &SessionToken) -> Result<Option<TokenData>> {
		obs::observe_call(CallKind::CheckToken, "check_token", self.token_check(token, None)).await
	}

	/// Validates a session token against required scopes (`GET /token/{token}/{scopes}`).
	///
	/// An empty scope set behaves like [`check_token`](Self::check_token).
	pub async fn check_token_for_scopes(
		&self,
		token: &SessionToken,
		scopes: &ScopeSet,
	) -> Result<Option<TokenData>> {
		obs::observe_call(
			CallKind::CheckToken,
			"check_token_for_scopes",
			self.token_check(token, Some(scopes)),
		)
		.await
	}

	/// Creates an account (`POST /user`). A 201 yields the created user; any other status `None`.
	pub async fn create_user(&self, user: &NewUser) -> Result<Option<Value>> {
		obs::observe_call(CallKind::CreateUser, "create_user", async {
			self.authorized(["user"])
				.await?
				.with_method(Method::POST)
				.with_json(user)
				.when_status(201, handler::parse_json)
				.with_default_handler(handler::give_nothing)
				.send()
				.await
		})
		.await
	}

	/// Fetches one user (`GET /user/{userid}`). Only a 200 yields a value.
	pub async fn get_user_info(&self, userid: &UserId) -> Result<Option<Value>> {
		obs::observe_call(CallKind::GetUserInfo, "get_user_info", async {
			self.authorized(["user", userid.as_ref()])
				.await?
				.when_status(200, handler::parse_json)
				.with_default_handler(handler::give_nothing)
				.send()
				.await
		})
		.await
	}

	/// Updates one user (`PUT /user/{userid}`), sending `{"updates": updates}`.
	pub async fn update_user<T>(&self, userid: &UserId, updates: &T) -> Result<Option<Value>>
	where
		T: ?Sized + Serialize,
	{
		obs::observe_call(CallKind::UpdateUser, "update_user", async {
			self.authorized(["user", userid.as_ref()])
				.await?
				.with_method(Method::PUT)
				.with_json(&Updates { updates })
				.when_status(200, handler::passthrough)
				.with_default_handler(handler::give_nothing)
				.send()
				.await
		})
		.await
	}

	/// Fetches several users (`GET /users?id=a,b,c`). Only a 200 yields a value.
	pub async fn get_users_with_ids(&self, userids: &[UserId]) -> Result<Option<Vec<Value>>> {
		let ids = userids.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join(",");

		obs::observe_call(CallKind::GetUsers, "get_users_with_ids", async {
			self.with_session(["users"])
				.await?
				.with_query([("id", ids)])
				.when_status(200, handler::parse_json)
				.with_default_handler(handler::give_nothing)
				.send()
				.await
		})
		.await
	}

	/// Fetches a user's meta pair (`GET /private/{userid}/meta`). Only a 200 yields a value.
	pub async fn get_meta_pair(&self, userid: &UserId) -> Result<Option<Value>> {
		obs::observe_call(CallKind::MetaPair, "get_meta_pair", async {
			self.with_session(["private", userid.as_ref(), "meta"])
				.await?
				.when_status(200, handler::parse_json)
				.with_default_handler(handler::give_nothing)
				.send()
				.await
		})
		.await
	}

	async fn token_check(
		&self,
		token: &SessionToken,
		scopes: Option<&ScopeSet>,
	) -> Result<Option<TokenData>> {
		let mut path = vec!["token".to_owned(), token.expose().to_owned()];

		if let Some(scopes) = scopes.filter(|scopes| !scopes.is_empty()) {
			path.push(scopes.to_path_segment());
		}

		self.authorized(path)
			.await?
			.when_status(200, handler::parse_json)
			.with_default_handler(handler::give_nothing)
			.send()
			.await
	}

	/// Starts a request authenticated according to the configured [`ServerAuthMode`].
	async fn authorized<R, I, S>(&self, path: I) -> Result<RequestBuilder<R, C>>
	where
		R: 'static + Send,
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		match self.server_auth {
			ServerAuthMode::SessionToken => self.with_session(path).await,
			ServerAuthMode::SharedSecret => Ok(self
				.anonymous
				.endpoint
				.request(path)
				.with_header(SERVER_SECRET_HEADER, self.server_secret.expose())),
		}
	}

	/// Starts a request authenticated with the server session token.
	async fn with_session<R, I, S>(&self, path: I) -> Result<RequestBuilder<R, C>>
	where
		R: 'static + Send,
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let token = self.tokens.get().await?;

		Ok(self.anonymous.endpoint.request(path).with_token(&token))
	}
}
impl<C> Clone for ServerClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			anonymous: self.anonymous.clone(),
			tokens: self.tokens.clone(),
			server_secret: self.server_secret.clone(),
			server_auth: self.server_auth,
		}
	}
}
impl<C> Debug for ServerClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServerClient")
			.field("anonymous", &self.anonymous)
			.field("tokens", &self.tokens)
			.field("server_auth", &self.server_auth)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn updates_wrap_payload() {
		let payload = serde_json::json!({ "field": "value" });
		let body = serde_json::to_string(&Updates { updates: &payload })
			.expect("Updates wrapper should serialize.");

		assert_eq!(body, r#"{"updates":{"field":"value"}}"#);
	}
}
