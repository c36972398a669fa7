#![cfg(feature = "axum")]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use axum::{
	Extension, Json, Router,
	body::Body,
	http::{HeaderValue, Request, StatusCode},
	middleware::from_fn_with_state,
	response::Response,
	routing::get,
};
use color_eyre::Result;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tower::ServiceExt;
// self
use user_api_client::{
	auth::{
		LEGACY_SERVICE_SECRET_HEADER, SESSION_TOKEN_HEADER, ScopeSet, ServerName, ServerSecret,
		SessionToken, TokenData, UserId,
	},
	client::UserApiClient,
	config::ClientConfig,
	error::{Error, ServerTokenError},
	host::{HostSpec, StaticHosts},
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	middleware::{
		ApiFuture, Authenticated, MetaPair, TokenAuth, UserApi, check_token, get_meta_pair,
	},
};

const SECRET: &str = "testing that we are secret";

#[derive(Clone)]
enum Answer {
	Valid(TokenData),
	Rejected,
	Failed(Error),
}

struct FakeApi {
	answer: Answer,
	meta: Option<Value>,
	secret: ServerSecret,
	checks: AtomicUsize,
	seen_tokens: Mutex<Vec<String>>,
	seen_scopes: Mutex<Vec<Option<String>>>,
	meta_lookups: Mutex<Vec<String>>,
}
impl FakeApi {
	fn new(answer: Answer) -> Arc<Self> {
		Arc::new(Self {
			answer,
			meta: Some(json!({ "id": "meta-id", "hash": "meta-hash" })),
			secret: ServerSecret::new(SECRET),
			checks: AtomicUsize::new(0),
			seen_tokens: Mutex::new(Vec::new()),
			seen_scopes: Mutex::new(Vec::new()),
			meta_lookups: Mutex::new(Vec::new()),
		})
	}

	fn without_meta(answer: Answer) -> Arc<Self> {
		let mut api = Self::new(answer);

		Arc::get_mut(&mut api).expect("Fresh fake should be unique.").meta = None;

		api
	}
}
impl UserApi for FakeApi {
	fn check_token<'a>(
		&'a self,
		token: &'a SessionToken,
		scopes: Option<&'a ScopeSet>,
	) -> ApiFuture<'a, Option<TokenData>> {
		self.checks.fetch_add(1, Ordering::SeqCst);
		self.seen_tokens.lock().push(token.expose().to_owned());
		self.seen_scopes.lock().push(scopes.map(ScopeSet::to_path_segment));

		let answer = self.answer.clone();

		Box::pin(async move {
			match answer {
				Answer::Valid(data) => Ok(Some(data)),
				Answer::Rejected => Ok(None),
				Answer::Failed(e) => Err(e),
			}
		})
	}

	fn get_meta_pair<'a>(&'a self, userid: &'a UserId) -> ApiFuture<'a, Option<Value>> {
		self.meta_lookups.lock().push(userid.to_string());

		let meta = self.meta.clone();

		Box::pin(async move { Ok(meta) })
	}

	fn server_secret(&self) -> &ServerSecret {
		&self.secret
	}
}

async fn whoami(Extension(authenticated): Extension<Authenticated>) -> Json<Value> {
	Json(json!({
		"userid": authenticated.data.userid,
		"isserver": authenticated.data.isserver,
		"token": authenticated.token.map(|token| token.expose().to_owned()),
	}))
}

async fn meta(Extension(MetaPair(pair)): Extension<MetaPair>) -> Json<Value> {
	Json(pair)
}

fn protected(auth: TokenAuth) -> Router {
	Router::new().route("/protected", get(whoami)).layer(from_fn_with_state(auth, check_token))
}

fn with_meta(auth: TokenAuth) -> Router {
	Router::new()
		.route("/meta/{userid}", get(meta))
		.route_layer(from_fn_with_state(auth.clone(), get_meta_pair))
		.route_layer(from_fn_with_state(auth, check_token))
}

async fn call(app: Router, uri: &str, headers: &[(&str, &str)]) -> Result<Response> {
	let mut request = Request::builder().uri(uri);

	for (name, value) in headers {
		request = request.header(*name, *value);
	}

	Ok(app.oneshot(request.body(Body::empty())?).await?)
}

async fn json_body(response: Response) -> Result<Value> {
	let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;

	Ok(serde_json::from_slice(&body)?)
}

/// Answers server logins with a token and every token check with `check_status`.
struct UpstreamTransport {
	check_status: StatusCode,
}
impl HttpTransport for UpstreamTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let login = request.uri().path() == "/serverlogin";

		Box::pin(async move {
			let mut response = HttpResponse::new(b"{}".to_vec());

			if login {
				response
					.headers_mut()
					.insert(SESSION_TOKEN_HEADER, HeaderValue::from_static("server-token"));
			} else {
				*response.status_mut() = self.check_status;
			}

			Ok(response)
		})
	}
}

fn upstream_auth(check_status: StatusCode) -> Result<TokenAuth> {
	let config = ClientConfig::default()
		.with_server_credentials(ServerName::new("billy")?, ServerSecret::new(SECRET));
	let hosts = Arc::new(StaticHosts::new([HostSpec::new("http", "user-api", Some(9107))]));
	let client = UserApiClient::with_transport(
		config,
		hosts,
		Arc::new(UpstreamTransport { check_status }),
	)
	.into_server()
	.expect("Credentials unlock the server client.");

	Ok(TokenAuth::new(Arc::new(client)))
}

#[tokio::test]
async fn missing_credential_is_rejected_without_calls() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let response = call(protected(TokenAuth::new(api.clone())), "/protected", &[]).await?;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(json_body(response).await?["error"]["code"], "MISSING_TOKEN");
	assert_eq!(api.checks.load(Ordering::SeqCst), 0);

	Ok(())
}

#[tokio::test]
async fn bearer_token_is_checked_and_attached() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let response = call(
		protected(TokenAuth::new(api.clone())),
		"/protected",
		&[("authorization", "Bearer user-token")],
	)
	.await?;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		json_body(response).await?,
		json!({ "userid": "1234", "isserver": false, "token": "user-token" })
	);
	assert_eq!(*api.seen_tokens.lock(), vec!["user-token".to_owned()]);
	assert_eq!(*api.seen_scopes.lock(), vec![None]);

	Ok(())
}

#[tokio::test]
async fn session_header_is_accepted() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let response = call(
		protected(TokenAuth::new(api.clone())),
		"/protected",
		&[(SESSION_TOKEN_HEADER, "legacy-token")],
	)
	.await?;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(*api.seen_tokens.lock(), vec!["legacy-token".to_owned()]);

	Ok(())
}

#[tokio::test]
async fn rejected_token_is_unauthorized() -> Result<()> {
	let api = FakeApi::new(Answer::Rejected);
	let response =
		call(protected(TokenAuth::new(api)), "/protected", &[("authorization", "Bearer nope")])
			.await?;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(json_body(response).await?["error"]["code"], "INVALID_TOKEN");

	Ok(())
}

#[tokio::test]
async fn error_status_is_forwarded() -> Result<()> {
	let api = FakeApi::new(Answer::Failed(Error::Unavailable { service: "user-api" }));
	let response =
		call(protected(TokenAuth::new(api)), "/protected", &[("authorization", "Bearer abc")])
			.await?;

	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

	Ok(())
}

#[tokio::test]
async fn error_without_status_is_internal() -> Result<()> {
	let api = FakeApi::new(Answer::Failed(ServerTokenError::MissingToken.into()));
	let response =
		call(protected(TokenAuth::new(api)), "/protected", &[("authorization", "Bearer abc")])
			.await?;

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json_body(response).await?["error"]["code"], "USER_API_ERROR");

	Ok(())
}

#[tokio::test]
async fn scoped_check_forwards_scopes() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let auth = TokenAuth::new(api.clone()).with_scopes(ScopeSet::internal());
	let response =
		call(protected(auth), "/protected", &[("authorization", "Bearer user-token")]).await?;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(*api.seen_scopes.lock(), vec![Some("tidepool:internal".to_owned())]);

	Ok(())
}

#[tokio::test]
async fn legacy_secret_short_circuits_when_scoped() -> Result<()> {
	let api = FakeApi::new(Answer::Rejected);
	let auth = TokenAuth::new(api.clone()).with_scopes(ScopeSet::internal());
	let response =
		call(protected(auth), "/protected", &[(LEGACY_SERVICE_SECRET_HEADER, SECRET)]).await?;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		json_body(response).await?,
		json!({ "userid": LEGACY_SERVICE_SECRET_HEADER, "isserver": true, "token": null })
	);
	assert_eq!(api.checks.load(Ordering::SeqCst), 0);

	Ok(())
}

#[tokio::test]
async fn legacy_secret_must_match() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let auth = TokenAuth::new(api.clone()).with_scopes(ScopeSet::internal());
	let response =
		call(protected(auth), "/protected", &[(LEGACY_SERVICE_SECRET_HEADER, "not it")]).await?;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(api.checks.load(Ordering::SeqCst), 0);

	Ok(())
}

#[tokio::test]
async fn legacy_secret_is_ignored_without_scopes() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let response = call(
		protected(TokenAuth::new(api.clone())),
		"/protected",
		&[(LEGACY_SERVICE_SECRET_HEADER, SECRET)],
	)
	.await?;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(api.checks.load(Ordering::SeqCst), 0);

	Ok(())
}

#[tokio::test]
async fn meta_pair_uses_own_id_for_users() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let response =
		call(with_meta(TokenAuth::new(api.clone())), "/meta/5678", &[("authorization", "Bearer t")])
			.await?;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await?, json!({ "id": "meta-id", "hash": "meta-hash" }));
	assert_eq!(*api.meta_lookups.lock(), vec!["1234".to_owned()]);

	Ok(())
}

#[tokio::test]
async fn meta_pair_uses_route_id_for_servers() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::server("shoreline")));
	let response =
		call(with_meta(TokenAuth::new(api.clone())), "/meta/5678", &[("authorization", "Bearer t")])
			.await?;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(*api.meta_lookups.lock(), vec!["5678".to_owned()]);

	Ok(())
}

#[tokio::test]
async fn meta_pair_missing_is_not_found() -> Result<()> {
	let api = FakeApi::without_meta(Answer::Valid(TokenData::user("1234")));
	let response =
		call(with_meta(TokenAuth::new(api)), "/meta/5678", &[("authorization", "Bearer t")]).await?;

	assert_eq!(response.status(), StatusCode::NOT_FOUND);

	Ok(())
}

#[tokio::test]
async fn meta_pair_requires_prior_token_check() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let app = Router::new()
		.route("/meta/{userid}", get(meta))
		.route_layer(from_fn_with_state(TokenAuth::new(api.clone()), get_meta_pair));
	let response = call(app, "/meta/5678", &[]).await?;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert!(api.meta_lookups.lock().is_empty());

	Ok(())
}

#[tokio::test]
async fn bearer_scheme_ignores_case() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::user("1234")));
	let response = call(
		protected(TokenAuth::new(api.clone())),
		"/protected",
		&[("authorization", "bearer lower-token")],
	)
	.await?;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(*api.seen_tokens.lock(), vec!["lower-token".to_owned()]);

	Ok(())
}

#[tokio::test]
async fn non_200_token_checks_are_unauthorized() -> Result<()> {
	for status in [
		StatusCode::CREATED,
		StatusCode::NO_CONTENT,
		StatusCode::FOUND,
		StatusCode::BAD_REQUEST,
		StatusCode::INTERNAL_SERVER_ERROR,
	] {
		let app = protected(upstream_auth(status)?);
		let response = call(app, "/protected", &[("authorization", "Bearer user-token")]).await?;

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "Upstream {status} must reject.");
		assert_eq!(json_body(response).await?["error"]["code"], "INVALID_TOKEN");
	}

	Ok(())
}

#[tokio::test]
async fn service_defined_token_data_is_accepted() -> Result<()> {
	let app = protected(upstream_auth(StatusCode::OK)?);
	let response = call(app, "/protected", &[("authorization", "Bearer user-token")]).await?;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		json_body(response).await?,
		json!({ "userid": null, "isserver": false, "token": "user-token" })
	);

	Ok(())
}

#[tokio::test]
async fn meta_pair_without_own_id_is_unauthorized() -> Result<()> {
	let data = serde_json::from_value::<TokenData>(json!({ "howdy": "hi" }))?;
	let api = FakeApi::new(Answer::Valid(data));
	let response =
		call(with_meta(TokenAuth::new(api.clone())), "/meta/5678", &[("authorization", "Bearer t")])
			.await?;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert!(api.meta_lookups.lock().is_empty());

	Ok(())
}

#[tokio::test]
async fn meta_pair_rejects_malformed_route_id() -> Result<()> {
	let api = FakeApi::new(Answer::Valid(TokenData::server("shoreline")));
	let response =
		call(with_meta(TokenAuth::new(api.clone())), "/meta/a,b", &[("authorization", "Bearer t")])
			.await?;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json_body(response).await?["error"]["code"], "INVALID_USERID");
	assert!(api.meta_lookups.lock().is_empty());

	Ok(())
}
