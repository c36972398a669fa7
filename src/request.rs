//! Fluent request builder with per-status response dispatch.
//!
//! A [`RequestBuilder`] accumulates everything one user API call needs (method, headers,
//! payload, query, and a handler per expected status), then [`RequestBuilder::send`] resolves a
//! host, executes the call through the [`HttpTransport`], and hands the buffered response to
//! exactly one handler. The output of that handler is the call's outcome.

pub mod handler;

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
// self
use crate::{
	_prelude::*,
	auth::{SESSION_TOKEN_HEADER, SessionToken},
	error::ConfigError,
	host::{HostResolver, HostSpec},
	http::{ApiResponse, HttpTransport},
};

/// Service name reported when no user API host can be resolved.
pub const USER_API_SERVICE: &str = "user-api";

/// Boxed future produced by a status handler.
pub type HandlerFuture<R> = Pin<Box<dyn Future<Output = Result<R>> + Send>>;

type Handler<R> = Arc<dyn Fn(ApiResponse) -> HandlerFuture<R> + Send + Sync>;

/// One or more status codes sharing a handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSet(Vec<u16>);
impl StatusSet {
	/// Iterator over the contained status codes.
	pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
		self.0.iter().copied()
	}
}
impl From<u16> for StatusSet {
	fn from(status: u16) -> Self {
		Self(vec![status])
	}
}
impl<const N: usize> From<[u16; N]> for StatusSet {
	fn from(statuses: [u16; N]) -> Self {
		Self(statuses.to_vec())
	}
}
impl From<&[u16]> for StatusSet {
	fn from(statuses: &[u16]) -> Self {
		Self(statuses.to_vec())
	}
}
impl From<Vec<u16>> for StatusSet {
	fn from(statuses: Vec<u16>) -> Self {
		Self(statuses)
	}
}

#[derive(Clone, Debug, Default)]
enum Payload {
	#[default]
	Empty,
	Body(Vec<u8>),
	Json(Vec<u8>),
}

/// Builder for a single user API call producing `R`.
///
/// Configuration problems (an invalid header, an unserializable JSON payload, a status code
/// registered twice) do not panic. The first one is remembered and returned by
/// [`send`](Self::send) before any host is resolved or any request is issued.
pub struct RequestBuilder<R, C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	resolver: Arc<dyn HostResolver>,
	service: &'static str,
	path_prefix: String,
	path: Vec<String>,
	method: Method,
	headers: HeaderMap,
	payload: Payload,
	query: Vec<(String, String)>,
	handlers: BTreeMap<u16, Handler<R>>,
	default_handler: Option<Handler<R>>,
	defect: Option<ConfigError>,
}
impl<R, C> RequestBuilder<R, C>
where
	R: 'static + Send,
	C: ?Sized + HttpTransport,
{
	/// Starts a `GET` request for the given path segments.
	///
	/// Segments are percent-encoded individually, so tokens and ids can be passed verbatim.
	pub fn new<I, S>(transport: Arc<C>, resolver: Arc<dyn HostResolver>, path: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			transport,
			resolver,
			service: USER_API_SERVICE,
			path_prefix: String::new(),
			path: path.into_iter().map(Into::into).collect(),
			method: Method::GET,
			headers: HeaderMap::new(),
			payload: Payload::Empty,
			query: Vec::new(),
			handlers: BTreeMap::new(),
			default_handler: None,
			defect: None,
		}
	}

	/// Inserts `prefix` between the resolved host and the path segments.
	pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.path_prefix = prefix.into();

		self
	}

	/// Overrides the service name reported in [`Error::Unavailable`].
	pub fn with_service(mut self, service: &'static str) -> Self {
		self.service = service;

		self
	}

	/// Sets the HTTP method.
	pub fn with_method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}

	/// Sets a header, replacing any earlier value for the same name.
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
			(Ok(name), Ok(value)) => {
				self.headers.insert(name, value);
			},
			_ => self.record_defect(ConfigError::InvalidHeader { name: name.to_owned() }),
		}

		self
	}

	/// Sets the `content-type` header.
	pub fn with_content_type(self, content_type: &str) -> Self {
		self.with_header(header::CONTENT_TYPE.as_str(), content_type)
	}

	/// Authenticates the call with a session token.
	pub fn with_token(self, token: &SessionToken) -> Self {
		self.with_header(SESSION_TOKEN_HEADER, token.expose())
	}

	/// Authenticates the call with HTTP basic credentials.
	pub fn with_auth(self, username: &str, password: &str) -> Self {
		let encoded = STANDARD.encode(format!("{username}:{password}"));

		self.with_header(header::AUTHORIZATION.as_str(), &format!("Basic {encoded}"))
	}

	/// Sets a raw body, replacing any JSON payload.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.payload = Payload::Body(body.into());

		self
	}

	/// Serializes `json` as the body, replacing any raw body.
	///
	/// The request is sent with `content-type: application/json`.
	pub fn with_json<T>(mut self, json: &T) -> Self
	where
		T: ?Sized + Serialize,
	{
		match serde_json::to_vec(json) {
			Ok(bytes) => self.payload = Payload::Json(bytes),
			Err(e) => self.record_defect(ConfigError::Encode(Arc::new(e))),
		}

		self
	}

	/// Sets the query string, replacing any earlier pairs.
	pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.query = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

		self
	}

	/// Registers `handler` for each status in `status`.
	///
	/// Registering a status that already has a handler is a configuration error reported by
	/// [`send`](Self::send). Use [`replace_status`](Self::replace_status) to overwrite on purpose.
	pub fn when_status<H, Fut>(mut self, status: impl Into<StatusSet>, handler: H) -> Self
	where
		H: 'static + Send + Sync + Fn(ApiResponse) -> Fut,
		Fut: 'static + Send + Future<Output = Result<R>>,
	{
		let handler = box_handler(handler);

		for code in status.into().iter() {
			if self.handlers.contains_key(&code) {
				self.record_defect(ConfigError::DuplicateStatusHandler { status: code });
			} else {
				self.handlers.insert(code, handler.clone());
			}
		}

		self
	}

	/// Registers `handler` for each status in `status`, overwriting earlier registrations.
	pub fn replace_status<H, Fut>(mut self, status: impl Into<StatusSet>, handler: H) -> Self
	where
		H: 'static + Send + Sync + Fn(ApiResponse) -> Fut,
		Fut: 'static + Send + Future<Output = Result<R>>,
	{
		let handler = box_handler(handler);

		for code in status.into().iter() {
			self.handlers.insert(code, handler.clone());
		}

		self
	}

	/// Sets the handler used when no status handler matches.
	///
	/// Without one, unmatched statuses produce [`Error::UnexpectedStatus`].
	pub fn with_default_handler<H, Fut>(mut self, handler: H) -> Self
	where
		H: 'static + Send + Sync + Fn(ApiResponse) -> Fut,
		Fut: 'static + Send + Future<Output = Result<R>>,
	{
		self.default_handler = Some(box_handler(handler));

		self
	}

	/// Resolves a host, issues the request, and dispatches the response.
	///
	/// Exactly one outcome is produced: a recorded configuration error, an unavailable-host
	/// error (no request issued), the transport error, or the selected handler's result.
	pub async fn send(self) -> Result<R> {
		let Self {
			transport,
			resolver,
			service,
			path_prefix,
			path,
			method,
			mut headers,
			payload,
			query,
			handlers,
			default_handler,
			defect,
		} = self;

		if let Some(defect) = defect {
			return Err(defect.into());
		}

		let host = resolver.resolve().into_iter().next().ok_or(Error::Unavailable { service })?;
		let url = build_url(&host, &path_prefix, &path, &query)?;
		let body = match payload {
			Payload::Empty => Vec::new(),
			Payload::Body(bytes) => bytes,
			Payload::Json(bytes) => {
				headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

				bytes
			},
		};
		let mut request = http::Request::builder().method(method).uri(url.as_str());

		if let Some(request_headers) = request.headers_mut() {
			request_headers.extend(headers);
		}

		let request = request.body(body).map_err(ConfigError::from)?;
		let response = ApiResponse::from(transport.execute(request).await?);
		let handler = handlers.get(&response.status).or(default_handler.as_ref()).cloned();

		match handler {
			Some(handler) => handler(response).await,
			None => Err(Error::UnexpectedStatus {
				status: response.status,
				body: response.text().into_owned(),
			}),
		}
	}

	fn record_defect(&mut self, defect: ConfigError) {
		self.defect.get_or_insert(defect);
	}
}
impl<R, C> Debug for RequestBuilder<R, C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestBuilder")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("statuses", &self.handlers.keys().collect::<Vec<_>>())
			.field("default_handler", &self.default_handler.is_some())
			.finish()
	}
}

fn box_handler<R, H, Fut>(handler: H) -> Handler<R>
where
	H: 'static + Send + Sync + Fn(ApiResponse) -> Fut,
	Fut: 'static + Send + Future<Output = Result<R>>,
{
	Arc::new(move |response: ApiResponse| -> HandlerFuture<R> { Box::pin(handler(response)) })
}

fn build_url(
	host: &HostSpec,
	path_prefix: &str,
	path: &[String],
	query: &[(String, String)],
) -> Result<Url, ConfigError> {
	let raw = format!("{}{path_prefix}", host.base_url());
	let mut url = Url::parse(&raw)
		.map_err(|source| ConfigError::InvalidBaseUrl { url: raw.clone(), source: Some(source) })?;

	url.path_segments_mut()
		.map_err(|_| ConfigError::InvalidBaseUrl { url: raw.clone(), source: None })?
		.pop_if_empty()
		.extend(path);

	if !query.is_empty() {
		url.query_pairs_mut().extend_pairs(query);
	}

	Ok(url)
}
