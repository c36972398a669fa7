//! Optional observability helpers for user API calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `user_api_client.call` with the `call`
//!   (operation) and `stage` (call site) fields, plus events for the server token lifecycle.
//! - Enable `metrics` to increment the `user_api_client_call_total` counter for every
//!   attempt/success/failure, labeled by `call` + `outcome`, and
//!   `user_api_client_server_token_total` for server token transitions, labeled by `event`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// User API operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Server login performed by the token cache.
	ServerLogin,
	/// End-user login with basic credentials.
	Login,
	/// Anonymous key pair lookup.
	AnonymousPair,
	/// Session token validation.
	CheckToken,
	/// Account creation.
	CreateUser,
	/// Single user lookup.
	GetUserInfo,
	/// User update.
	UpdateUser,
	/// Batch user lookup.
	GetUsers,
	/// Per-user meta pair lookup.
	MetaPair,
	/// Event posted to the metrics service.
	MetricsEvent,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::ServerLogin => "server_login",
			CallKind::Login => "login",
			CallKind::AnonymousPair => "anonymous_pair",
			CallKind::CheckToken => "check_token",
			CallKind::CreateUser => "create_user",
			CallKind::GetUserInfo => "get_user_info",
			CallKind::UpdateUser => "update_user",
			CallKind::GetUsers => "get_users",
			CallKind::MetaPair => "meta_pair",
			CallKind::MetricsEvent => "metrics_event",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a client operation.
	Attempt,
	/// Successful completion, including "no result" answers.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Server token lifecycle transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenEvent {
	/// A login produced a token.
	Acquired,
	/// A login failed or was abandoned.
	Failed,
	/// The expiry timer dropped the token.
	Expired,
}
impl TokenEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenEvent::Acquired => "acquired",
			TokenEvent::Failed => "failed",
			TokenEvent::Expired => "expired",
		}
	}
}

/// Logs and counts a server token transition; `waiters` is the number of callers it settled.
pub(crate) fn record_token_event(event: TokenEvent, waiters: usize) {
	log_token_event(event, waiters);
	record_token_transition(event);
}

/// Runs `fut` inside a call span, recording attempt and outcome.
pub(crate) async fn observe_call<T, Fut>(kind: CallKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = CallSpan::new(kind, stage);

	record_call_outcome(kind, CallOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_call_outcome(kind, CallOutcome::Success),
		Err(e) => {
			record_call_failure(kind, e);
			record_call_outcome(kind, CallOutcome::Failure);
		},
	}

	result
}
