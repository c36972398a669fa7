//! Transport primitives for user API calls.
//!
//! The module exposes [`HttpTransport`] so downstream crates can plug in their own HTTP stack
//! (or a fake in tests) and [`ApiResponse`], the buffered response handed to status handlers.
//! Timeouts, connection pooling, and TLS all belong to the transport; the client never retries.

// std
use std::borrow::Cow;
// crates.io
use http::HeaderMap;
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, auth::SessionToken, error::TransportError};
#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, error::ConfigError};

/// Fully buffered outbound request.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Fully buffered inbound response.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing user API calls.
///
/// The trait is the client's only dependency on an HTTP implementation. Implementations must be
/// `Send + Sync + 'static` so one transport can be shared (behind `Arc`) by the request builder,
/// the server token cache, and every clone of the client.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Issues `request` and buffers the full response.
	///
	/// Any response that arrives, whatever its status, must be returned as `Ok`. Only failures to
	/// obtain a response are reported as [`TransportError`].
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Response handed to status handlers.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns a header value if present and valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Extracts the session token header, ignoring empty values.
	pub fn session_token(&self) -> Option<SessionToken> {
		self.header(crate::auth::SESSION_TOKEN_HEADER)
			.filter(|value| !value.is_empty())
			.map(SessionToken::new)
	}

	/// Decodes the body as JSON.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source: Arc::new(source), status: self.status })
	}

	/// Body decoded lossily as UTF-8.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status.as_u16(), headers: parts.headers, body }
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The user API answers directly, so redirects are never followed. Configure any custom
/// [`ReqwestClient`] passed to [`ReqwestTransport::with_client`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring the TLS verification toggle in `config`.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.danger_accept_invalid_certs(!config.verify_tls)
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();
			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
