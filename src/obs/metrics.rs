// self
use crate::obs::{CallKind, CallOutcome, TokenEvent};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"user_api_client_call_total",
			"call" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts server token lifecycle transitions via `user_api_client_server_token_total`.
pub fn record_token_transition(event: TokenEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("user_api_client_server_token_total", "event" => event.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}
