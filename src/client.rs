//! User API clients with construction-time capability gating.
//!
//! [`UserApiClient::with_transport`] inspects the configuration once. With both a server name and
//! secret it yields a [`ServerClient`] exposing the full trusted-service surface; otherwise it
//! yields an [`AnonymousClient`] that can only log users in and fetch the anonymous pair. The
//! choice is fixed for the client's lifetime, so calling a trusted operation without credentials
//! is a compile error rather than a runtime one.

pub mod server;
pub mod user;

pub use server::*;
pub use user::*;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	host::HostResolver,
	http::HttpTransport,
	request::RequestBuilder,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

/// Transport, resolver, and path prefix shared by every request a client issues.
pub(crate) struct Endpoint<C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) transport: Arc<C>,
	pub(crate) resolver: Arc<dyn HostResolver>,
	pub(crate) path_prefix: String,
}
impl<C> Endpoint<C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn request<R, I, S>(&self, path: I) -> RequestBuilder<R, C>
	where
		R: 'static + Send,
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		RequestBuilder::new(self.transport.clone(), self.resolver.clone(), path)
			.with_path_prefix(self.path_prefix.as_str())
	}
}
impl<C> Clone for Endpoint<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			resolver: self.resolver.clone(),
			path_prefix: self.path_prefix.clone(),
		}
	}
}

/// Client returned by the factory, gated on configured server credentials.
pub enum UserApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// No server credentials: only `login` and `get_anonymous_pair`.
	Anonymous(AnonymousClient<C>),
	/// Server credentials configured: the full trusted-service surface.
	Server(ServerClient<C>),
}
impl<C> UserApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Builds a client on top of an existing transport.
	pub fn with_transport(
		config: ClientConfig,
		resolver: Arc<dyn HostResolver>,
		transport: Arc<C>,
	) -> Self {
		let anonymous = AnonymousClient::from_endpoint(Endpoint {
			transport,
			resolver,
			path_prefix: config.path_prefix.clone(),
		});

		match config.server_credentials() {
			Some((name, secret)) => Self::Server(ServerClient::from_parts(
				anonymous,
				name.clone(),
				secret.clone(),
				&config,
			)),
			None => Self::Anonymous(anonymous),
		}
	}

	/// Returns the trusted-service client when server credentials were configured.
	pub fn as_server(&self) -> Option<&ServerClient<C>> {
		match self {
			Self::Server(client) => Some(client),
			Self::Anonymous(_) => None,
		}
	}

	/// Consumes the factory output, keeping the trusted-service client if there is one.
	pub fn into_server(self) -> Option<ServerClient<C>> {
		match self {
			Self::Server(client) => Some(client),
			Self::Anonymous(_) => None,
		}
	}

	/// The unauthenticated surface, available in both variants.
	pub fn anonymous(&self) -> &AnonymousClient<C> {
		match self {
			Self::Anonymous(client) => client,
			Self::Server(client) => client.anonymous(),
		}
	}

	/// See [`AnonymousClient::login`].
	pub async fn login(&self, username: &str, password: &str) -> Result<Option<Login>> {
		self.anonymous().login(username, password).await
	}

	/// See [`AnonymousClient::get_anonymous_pair`].
	pub async fn get_anonymous_pair(&self) -> Result<serde_json::Value> {
		self.anonymous().get_anonymous_pair().await
	}
}
#[cfg(feature = "reqwest")]
impl UserApiClient<ReqwestTransport> {
	/// Builds a client backed by reqwest, honoring the TLS toggle in `config`.
	pub fn new(config: ClientConfig, resolver: Arc<dyn HostResolver>) -> Result<Self, ConfigError> {
		let transport = Arc::new(ReqwestTransport::from_config(&config)?);

		Ok(Self::with_transport(config, resolver, transport))
	}
}
impl<C> Clone for UserApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		match self {
			Self::Anonymous(client) => Self::Anonymous(client.clone()),
			Self::Server(client) => Self::Server(client.clone()),
		}
	}
}
impl<C> Debug for UserApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Anonymous(client) => f.debug_tuple("Anonymous").field(client).finish(),
			Self::Server(client) => f.debug_tuple("Server").field(client).finish(),
		}
	}
}
