// self
use crate::{
	_prelude::*,
	obs::{CallKind, TokenEvent},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("user_api_client.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a failed call. Secrets never reach the log because error types only carry statuses.
pub(crate) fn record_call_failure(kind: CallKind, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(call = kind.as_str(), status = error.status_code(), %error, "user API call failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Logs a server token lifecycle transition with the number of callers it settled.
pub(crate) fn log_token_event(event: TokenEvent, waiters: usize) {
	#[cfg(feature = "tracing")]
	{
		match event {
			TokenEvent::Acquired => tracing::info!(waiters, "server token acquired"),
			TokenEvent::Failed => tracing::warn!(waiters, "server token acquisition failed"),
			TokenEvent::Expired => tracing::debug!("server token expired"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (event, waiters);
	}
}

/// Logs an event post skipped because no metrics host is configured.
pub(crate) fn log_event_skipped(event: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(event, "metrics event dropped because no metrics service is configured");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = event;
	}
}
