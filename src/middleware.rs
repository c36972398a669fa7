//! axum middleware that authenticates inbound requests against the user API.
//!
//! Install [`check_token`] with [`axum::middleware::from_fn_with_state`] and a [`TokenAuth`]
//! state. On success the request carries an [`Authenticated`] extension. [`get_meta_pair`] runs
//! after it and attaches a [`MetaPair`]. Rejections answer with a JSON body of the form
//! `{"error":{"code":..,"message":..}}`.

// crates.io
use axum::{
	Json,
	extract::{Path, Request, State, rejection::PathRejection},
	middleware::Next,
	response::{IntoResponse, Response},
};
use http::{HeaderMap, StatusCode, header};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{
		LEGACY_SERVICE_SECRET_HEADER, SESSION_TOKEN_HEADER, ScopeSet, ServerSecret, SessionToken,
		TokenData, UserId,
	},
	client::ServerClient,
	http::HttpTransport,
};

/// Route parameter consulted by [`get_meta_pair`] for server identities.
pub const USERID_PARAM: &str = "userid";

/// Boxed future returned by [`UserApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// The slice of the user API the middleware depends on.
pub trait UserApi
where
	Self: 'static + Send + Sync,
{
	/// Validates `token`, optionally against required scopes.
	fn check_token<'a>(
		&'a self,
		token: &'a SessionToken,
		scopes: Option<&'a ScopeSet>,
	) -> ApiFuture<'a, Option<TokenData>>;

	/// Fetches the meta pair of `userid`.
	fn get_meta_pair<'a>(&'a self, userid: &'a UserId) -> ApiFuture<'a, Option<Value>>;

	/// Shared secret accepted through the legacy service secret header.
	fn server_secret(&self) -> &ServerSecret;
}
impl<C> UserApi for ServerClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn check_token<'a>(
		&'a self,
		token: &'a SessionToken,
		scopes: Option<&'a ScopeSet>,
	) -> ApiFuture<'a, Option<TokenData>> {
		match scopes {
			Some(scopes) => Box::pin(self.check_token_for_scopes(token, scopes)),
			None => Box::pin(ServerClient::check_token(self, token)),
		}
	}

	fn get_meta_pair<'a>(&'a self, userid: &'a UserId) -> ApiFuture<'a, Option<Value>> {
		Box::pin(ServerClient::get_meta_pair(self, userid))
	}

	fn server_secret(&self) -> &ServerSecret {
		ServerClient::server_secret(self)
	}
}

/// Middleware state: the user API plus the scopes a route requires.
#[derive(Clone)]
pub struct TokenAuth {
	api: Arc<dyn UserApi>,
	scopes: Option<ScopeSet>,
}
impl TokenAuth {
	/// Checks tokens without scope requirements.
	pub fn new(api: Arc<dyn UserApi>) -> Self {
		Self { api, scopes: None }
	}

	/// Requires `scopes` and additionally accepts the legacy service secret header.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}
}
impl Debug for TokenAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenAuth").field("scopes", &self.scopes).finish()
	}
}

/// Request extension inserted by [`check_token`].
#[derive(Clone, Debug)]
pub struct Authenticated {
	/// The validated token; absent when the legacy service secret was used.
	pub token: Option<SessionToken>,
	/// Identity data returned by the token check.
	pub data: TokenData,
}

/// Request extension inserted by [`get_meta_pair`].
#[derive(Clone, Debug, PartialEq)]
pub struct MetaPair(pub Value);

#[derive(Debug, PartialEq)]
enum Credential {
	Token(SessionToken),
	LegacySecret(String),
}

/// Validates the caller's credential and attaches [`Authenticated`].
///
/// The credential is taken from a bearer `Authorization` header, else the session token header,
/// else (when scopes are configured) the legacy service secret header. A legacy secret equal to
/// the configured server secret is accepted without a remote call.
pub async fn check_token(State(auth): State<TokenAuth>, mut request: Request, next: Next) -> Response {
	let Some(credential) = extract_credential(request.headers(), auth.scopes.is_some()) else {
		return reject(StatusCode::UNAUTHORIZED, "MISSING_TOKEN", "A session token is required.");
	};
	let authenticated = match credential {
		Credential::LegacySecret(secret) =>
			if auth.api.server_secret().matches(&secret) {
				Authenticated { token: None, data: TokenData::legacy_service() }
			} else {
				return reject(
					StatusCode::UNAUTHORIZED,
					"INVALID_TOKEN",
					"The service secret is not valid.",
				);
			},
		Credential::Token(token) => match auth.api.check_token(&token, auth.scopes.as_ref()).await {
			Ok(Some(data)) => Authenticated { token: Some(token), data },
			Ok(None) =>
				return reject(
					StatusCode::UNAUTHORIZED,
					"INVALID_TOKEN",
					"The session token is not valid.",
				),
			Err(e) => return error_response(&e),
		},
	};

	request.extensions_mut().insert(authenticated);

	next.run(request).await
}

/// Fetches the meta pair for the authenticated caller and attaches [`MetaPair`].
///
/// User identities always use their own id and are rejected with 401 when the token data carries
/// none. Server identities act on behalf of the user named by the [`USERID_PARAM`] route
/// parameter, so this middleware must be installed with `route_layer` on a route that declares
/// it; a missing or malformed parameter is answered with 400.
pub async fn get_meta_pair(
	State(auth): State<TokenAuth>,
	params: Result<Path<HashMap<String, String>>, PathRejection>,
	mut request: Request,
	next: Next,
) -> Response {
	let Some(authenticated) = request.extensions().get::<Authenticated>() else {
		return reject(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "Token check did not run.");
	};
	let userid = if authenticated.data.isserver {
		let Some(raw) = params.ok().and_then(|Path(mut params)| params.remove(USERID_PARAM)) else {
			return reject(
				StatusCode::BAD_REQUEST,
				"MISSING_USERID",
				"A user id route parameter is required.",
			);
		};

		match UserId::new(raw) {
			Ok(userid) => userid,
			Err(e) => return reject(StatusCode::BAD_REQUEST, "INVALID_USERID", &e.to_string()),
		}
	} else {
		match authenticated.data.userid.as_deref().map(UserId::new) {
			Some(Ok(userid)) => userid,
			_ =>
				return reject(
					StatusCode::UNAUTHORIZED,
					"UNAUTHENTICATED",
					"The token does not identify a user.",
				),
		}
	};

	match auth.api.get_meta_pair(&userid).await {
		Ok(Some(pair)) => {
			request.extensions_mut().insert(MetaPair(pair));

			next.run(request).await
		},
		Ok(None) => reject(StatusCode::NOT_FOUND, "META_PAIR_NOT_FOUND", "No meta pair found."),
		Err(e) => error_response(&e),
	}
}

fn extract_credential(headers: &HeaderMap, accept_legacy_secret: bool) -> Option<Credential> {
	let header = |name: &str| {
		headers
			.get(name)
			.and_then(|value| value.to_str().ok())
			.map(str::trim)
			.filter(|value| !value.is_empty())
	};

	if let Some(token) = header(header::AUTHORIZATION.as_str())
		.and_then(|value| value.split_once(' '))
		.filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
		.map(|(_, token)| token.trim())
		.filter(|token| !token.is_empty())
	{
		return Some(Credential::Token(SessionToken::new(token)));
	}
	if let Some(token) = header(SESSION_TOKEN_HEADER) {
		return Some(Credential::Token(SessionToken::new(token)));
	}
	if accept_legacy_secret {
		return header(LEGACY_SERVICE_SECRET_HEADER)
			.map(|secret| Credential::LegacySecret(secret.to_owned()));
	}

	None
}

fn error_response(error: &Error) -> Response {
	let status = error
		.status_code()
		.and_then(|status| StatusCode::from_u16(status).ok())
		.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

	reject(status, "USER_API_ERROR", &error.to_string())
}

fn reject(status: StatusCode, code: &str, message: &str) -> Response {
	(status, Json(serde_json::json!({ "error": { "code": code, "message": message } })))
		.into_response()
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::HeaderValue;
	// self
	use super::*;

	fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
		let mut headers = HeaderMap::new();

		for (name, value) in pairs {
			headers.insert(*name, HeaderValue::from_static(value));
		}

		headers
	}

	#[test]
	fn bearer_wins_over_session_header() {
		let credential = extract_credential(
			&headers(&[("authorization", "Bearer abc"), (SESSION_TOKEN_HEADER, "def")]),
			false,
		);

		assert_eq!(credential, Some(Credential::Token(SessionToken::new("abc"))));
	}

	#[test]
	fn bearer_scheme_is_case_insensitive() {
		for value in ["bearer abc", "BEARER abc", "BeArEr abc"] {
			let headers = headers(&[("authorization", value), (SESSION_TOKEN_HEADER, "def")]);

			assert_eq!(
				extract_credential(&headers, false),
				Some(Credential::Token(SessionToken::new("abc"))),
				"{value} should be read as a bearer token."
			);
		}
	}

	#[test]
	fn session_header_is_used_without_bearer() {
		let credential = extract_credential(
			&headers(&[("authorization", "Basic Zm9vOmJhcg=="), (SESSION_TOKEN_HEADER, "def")]),
			false,
		);

		assert_eq!(credential, Some(Credential::Token(SessionToken::new("def"))));
	}

	#[test]
	fn legacy_secret_only_when_scoped() {
		let headers = headers(&[(LEGACY_SERVICE_SECRET_HEADER, "shh")]);

		assert_eq!(extract_credential(&headers, false), None);
		assert_eq!(
			extract_credential(&headers, true),
			Some(Credential::LegacySecret("shh".into()))
		);
	}

	#[test]
	fn blank_values_are_ignored() {
		let headers = headers(&[("authorization", "Bearer  "), (SESSION_TOKEN_HEADER, " ")]);

		assert_eq!(extract_credential(&headers, true), None);
	}
}
