//! Shared server token with single-flight acquisition and timer-based expiry.
//!
//! [`ServerTokenCache`] moves through three states:
//!
//! - `Empty`: the next caller starts an acquisition and waits for it.
//! - `Fetching`: one acquisition is in flight; every caller joins its waiter queue.
//! - `Valid`: callers receive the cached token without I/O until the expiry timer fires.
//!
//! The acquisition runs on its own task, so a caller that stops waiting never strands the others.
//! Every waiter queued before the acquisition resolves receives the same outcome. Failures
//! return the cache to `Empty` with no backoff; the next caller simply tries again.

mod metrics;

pub use metrics::{ServerTokenMetrics, ServerTokenStats};

// std
use std::{mem, sync::Weak, time::Duration as StdDuration};
// crates.io
use http::Method;
use tokio::{sync::oneshot, task::AbortHandle};
// self
use crate::{
	_prelude::*,
	auth::{SERVER_NAME_HEADER, SERVER_SECRET_HEADER, ServerName, ServerSecret, SessionToken},
	error::ServerTokenError,
	host::HostResolver,
	http::{ApiResponse, HttpTransport},
	obs::{self, CallKind, TokenEvent},
	request::RequestBuilder,
};

/// Boxed future returned by [`ServerTokenSource::acquire`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<SessionToken>> + 'a + Send>>;

/// Anything able to mint a fresh server token.
pub trait ServerTokenSource
where
	Self: 'static + Send + Sync,
{
	/// Performs one acquisition.
	fn acquire(&self) -> TokenFuture<'_>;
}

/// Server login against the user API (`POST /serverlogin`).
pub struct ServerLogin<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	resolver: Arc<dyn HostResolver>,
	path_prefix: String,
	name: ServerName,
	secret: ServerSecret,
}
impl<C> ServerLogin<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a login source presenting `name` and `secret`.
	pub fn new(
		transport: Arc<C>,
		resolver: Arc<dyn HostResolver>,
		path_prefix: impl Into<String>,
		name: ServerName,
		secret: ServerSecret,
	) -> Self {
		Self { transport, resolver, path_prefix: path_prefix.into(), name, secret }
	}

	async fn login(&self) -> Result<SessionToken> {
		RequestBuilder::<SessionToken, C>::new(
			self.transport.clone(),
			self.resolver.clone(),
			["serverlogin"],
		)
		.with_path_prefix(self.path_prefix.as_str())
		.with_method(Method::POST)
		.with_header(SERVER_NAME_HEADER, self.name.as_ref())
		.with_header(SERVER_SECRET_HEADER, self.secret.expose())
		.when_status(200, |response: ApiResponse| async move {
			response.session_token().ok_or_else(|| Error::from(ServerTokenError::MissingToken))
		})
		.with_default_handler(|response: ApiResponse| async move {
			Err(Error::from(ServerTokenError::BadStatus { status: response.status }))
		})
		.send()
		.await
	}
}
impl<C> ServerTokenSource for ServerLogin<C>
where
	C: ?Sized + HttpTransport,
{
	fn acquire(&self) -> TokenFuture<'_> {
		Box::pin(obs::observe_call(CallKind::ServerLogin, "acquire", self.login()))
	}
}
impl<C> Debug for ServerLogin<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServerLogin").field("name", &self.name).finish()
	}
}

type Waiter = oneshot::Sender<Result<SessionToken>>;

enum TokenState {
	Empty,
	Fetching(Vec<Waiter>),
	Valid { token: SessionToken, expiry: AbortHandle },
}

struct Inner {
	source: Arc<dyn ServerTokenSource>,
	refresh_interval: StdDuration,
	state: Mutex<TokenState>,
	metrics: ServerTokenMetrics,
}
impl Inner {
	fn complete(self: &Arc<Self>, result: Result<SessionToken>) {
		let waiters = {
			let mut state = self.state.lock();
			let TokenState::Fetching(waiters) = mem::replace(&mut *state, TokenState::Empty) else {
				return;
			};

			if let Ok(token) = &result {
				*state = TokenState::Valid { token: token.clone(), expiry: self.schedule_expiry() };
			}

			waiters
		};

		if result.is_ok() {
			obs::record_token_event(TokenEvent::Acquired, waiters.len());
		} else {
			self.metrics.record_failure();
			obs::record_token_event(TokenEvent::Failed, waiters.len());
		}

		for waiter in waiters {
			let _ = waiter.send(result.clone());
		}
	}

	fn schedule_expiry(self: &Arc<Self>) -> AbortHandle {
		let inner = Arc::downgrade(self);
		let interval = self.refresh_interval;

		tokio::spawn(async move {
			tokio::time::sleep(interval).await;

			if let Some(inner) = Weak::upgrade(&inner) {
				inner.expire();
			}
		})
		.abort_handle()
	}

	fn expire(&self) {
		let mut state = self.state.lock();

		if matches!(*state, TokenState::Valid { .. }) {
			*state = TokenState::Empty;

			self.metrics.record_expiry();
			obs::record_token_event(TokenEvent::Expired, 0);
		}
	}
}
impl Drop for Inner {
	fn drop(&mut self) {
		if let TokenState::Valid { expiry, .. } = self.state.get_mut() {
			expiry.abort();
		}
	}
}

/// Settles the in-flight cycle even if the acquisition task is cancelled or panics.
struct Completion(Option<Arc<Inner>>);
impl Completion {
	fn finish(mut self, result: Result<SessionToken>) {
		if let Some(inner) = self.0.take() {
			inner.complete(result);
		}
	}
}
impl Drop for Completion {
	fn drop(&mut self) {
		if let Some(inner) = self.0.take() {
			inner.complete(Err(ServerTokenError::Abandoned.into()));
		}
	}
}

/// Cache owning one shared server token.
///
/// Clones share the same state. The expiry timer holds only a weak reference, so dropping the
/// last clone releases the token and cancels the timer. Must be used from within a Tokio runtime.
#[derive(Clone)]
pub struct ServerTokenCache(Arc<Inner>);
impl ServerTokenCache {
	/// Creates an empty cache whose tokens live for `refresh_interval`.
	pub fn new(source: Arc<dyn ServerTokenSource>, refresh_interval: StdDuration) -> Self {
		Self(Arc::new(Inner {
			source,
			refresh_interval,
			state: Mutex::new(TokenState::Empty),
			metrics: ServerTokenMetrics::default(),
		}))
	}

	/// Returns the cached token, acquiring one first when the cache is empty.
	pub async fn get(&self) -> Result<SessionToken> {
		let receiver = {
			let mut state = self.0.state.lock();
			let (sender, receiver) = oneshot::channel();

			match &mut *state {
				TokenState::Valid { token, .. } => {
					self.0.metrics.record_hit();

					return Ok(token.clone());
				},
				TokenState::Fetching(waiters) => {
					self.0.metrics.record_coalesced();
					waiters.push(sender);
				},
				TokenState::Empty => {
					*state = TokenState::Fetching(vec![sender]);

					self.spawn_acquisition();
				},
			}

			receiver
		};

		receiver.await.unwrap_or_else(|_| Err(ServerTokenError::Abandoned.into()))
	}

	/// Counters for logins, coalesced callers, cache hits, and expirations.
	pub fn metrics(&self) -> &ServerTokenMetrics {
		&self.0.metrics
	}

	/// Configured token lifetime.
	pub fn refresh_interval(&self) -> StdDuration {
		self.0.refresh_interval
	}

	fn spawn_acquisition(&self) {
		let inner = self.0.clone();

		tokio::spawn(async move {
			let completion = Completion(Some(inner.clone()));

			inner.metrics.record_login();

			let result = inner.source.acquire().await;

			completion.finish(result);
		});
	}
}
impl Debug for ServerTokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = match &*self.0.state.lock() {
			TokenState::Empty => "empty",
			TokenState::Fetching(_) => "fetching",
			TokenState::Valid { .. } => "valid",
		};

		f.debug_struct("ServerTokenCache")
			.field("state", &state)
			.field("refresh_interval", &self.0.refresh_interval)
			.finish()
	}
}
