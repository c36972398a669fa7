//! Event client for the metrics service.
//!
//! Events are recorded with `GET` requests carrying the event parameters in the query string and
//! the caller's session token in the session-token header:
//!
//! - [`MetricsClient::post_server`]: `/server/{service}/{event}`
//! - [`MetricsClient::post_this_user`]: `/thisuser/{event}`
//! - [`MetricsClient::post_with_user`]: `/user/{userid}/{event}`
//!
//! Posting is best effort. Whatever the metrics service answers, and any transport failure, ends
//! in `Ok(())`; the only reported failure is an empty host list ([`Error::Unavailable`], 503).
//! A [`MetricsClient::disabled`] client accepts every event and sends nothing.

// self
use crate::{
	_prelude::*,
	auth::{SessionToken, UserId},
	client::Endpoint,
	host::HostResolver,
	http::HttpTransport,
	obs::{self, CallKind},
	request::handler,
};
#[cfg(feature = "reqwest")]
use crate::{config::ClientConfig, error::ConfigError, http::ReqwestTransport};

/// Service name reported when no metrics host can be resolved.
pub const METRICS_SERVICE: &str = "metrics";
/// Path segment used by [`MetricsClient::post_server`] when no service name is configured.
pub const UNNAMED_SERVICE: &str = "unnamed";

/// Client posting usage events to the metrics service.
pub struct MetricsClient<C>
where
	C: ?Sized + HttpTransport,
{
	endpoint: Option<Endpoint<C>>,
	service_name: String,
}
impl<C> MetricsClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Builds a client posting through `transport` to hosts returned by `resolver`.
	///
	/// `service_name` names this service in [`post_server`](Self::post_server) paths and falls
	/// back to [`UNNAMED_SERVICE`].
	pub fn with_transport(
		service_name: Option<&str>,
		resolver: Arc<dyn HostResolver>,
		transport: Arc<C>,
	) -> Self {
		Self {
			endpoint: Some(Endpoint { transport, resolver, path_prefix: String::new() }),
			service_name: service_name.unwrap_or(UNNAMED_SERVICE).to_owned(),
		}
	}

	/// A client for deployments without service discovery: every post is logged and dropped.
	pub fn disabled() -> Self {
		Self { endpoint: None, service_name: UNNAMED_SERVICE.to_owned() }
	}

	/// Whether posts reach the metrics service.
	pub fn is_enabled(&self) -> bool {
		self.endpoint.is_some()
	}

	/// Name used in [`post_server`](Self::post_server) paths.
	pub fn service_name(&self) -> &str {
		&self.service_name
	}

	/// Records an event attributed to this service.
	pub async fn post_server<I, K, V>(
		&self,
		event: &str,
		params: I,
		token: &SessionToken,
	) -> Result<()>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.post("post_server", ["server", self.service_name.as_str(), event], event, params, token)
			.await
	}

	/// Records an event attributed to the user owning `token`.
	pub async fn post_this_user<I, K, V>(
		&self,
		event: &str,
		params: I,
		token: &SessionToken,
	) -> Result<()>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.post("post_this_user", ["thisuser", event], event, params, token).await
	}

	/// Records an event attributed to `userid`, posted with a service token.
	pub async fn post_with_user<I, K, V>(
		&self,
		userid: &UserId,
		event: &str,
		params: I,
		token: &SessionToken,
	) -> Result<()>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.post("post_with_user", ["user", userid.as_ref(), event], event, params, token).await
	}

	async fn post<const N: usize, I, K, V>(
		&self,
		stage: &'static str,
		path: [&str; N],
		event: &str,
		params: I,
		token: &SessionToken,
	) -> Result<()>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let Some(endpoint) = &self.endpoint else {
			obs::log_event_skipped(event);

			return Ok(());
		};
		let request = endpoint
			.request::<Option<()>, _, _>(path)
			.with_service(METRICS_SERVICE)
			.with_token(token)
			.with_query(params)
			.with_default_handler(handler::give_nothing);

		match obs::observe_call(CallKind::MetricsEvent, stage, request.send()).await {
			Ok(_) | Err(Error::Transport(_)) => Ok(()),
			Err(e) => Err(e),
		}
	}
}
#[cfg(feature = "reqwest")]
impl MetricsClient<ReqwestTransport> {
	/// Builds a reqwest-backed client, or a [`disabled`](Self::disabled) one without a resolver.
	pub fn new(
		config: &ClientConfig,
		service_name: Option<&str>,
		resolver: Option<Arc<dyn HostResolver>>,
	) -> Result<Self, ConfigError> {
		let Some(resolver) = resolver else {
			return Ok(Self::disabled());
		};
		let transport = Arc::new(ReqwestTransport::from_config(config)?);

		Ok(Self::with_transport(service_name, resolver, transport))
	}
}
impl<C> Clone for MetricsClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { endpoint: self.endpoint.clone(), service_name: self.service_name.clone() }
	}
}
impl<C> Debug for MetricsClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MetricsClient")
			.field("enabled", &self.is_enabled())
			.field("service_name", &self.service_name)
			.finish()
	}
}
