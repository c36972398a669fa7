// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of a [`ServerTokenCache`](super::ServerTokenCache)'s counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerTokenStats {
	/// Server logins started; one per Empty to Fetching transition.
	pub logins: u64,
	/// Logins that failed or were abandoned.
	pub failures: u64,
	/// Callers that joined a login already in flight instead of starting one.
	pub coalesced: u64,
	/// Callers served from a valid token without I/O.
	pub hits: u64,
	/// Tokens dropped by the expiry timer.
	pub expirations: u64,
}

/// Counters describing how callers reached the server token.
#[derive(Debug, Default)]
pub struct ServerTokenMetrics {
	logins: AtomicU64,
	failures: AtomicU64,
	coalesced: AtomicU64,
	hits: AtomicU64,
	expirations: AtomicU64,
}
impl ServerTokenMetrics {
	/// Number of server logins started.
	pub fn logins(&self) -> u64 {
		self.logins.load(Ordering::Relaxed)
	}

	/// Reads every counter at once.
	pub fn snapshot(&self) -> ServerTokenStats {
		ServerTokenStats {
			logins: self.logins(),
			failures: self.failures.load(Ordering::Relaxed),
			coalesced: self.coalesced.load(Ordering::Relaxed),
			hits: self.hits.load(Ordering::Relaxed),
			expirations: self.expirations.load(Ordering::Relaxed),
		}
	}

	pub(crate) fn record_login(&self) {
		self.logins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_expiry(&self) {
		self.expirations.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_reads_each_counter() {
		let metrics = ServerTokenMetrics::default();

		metrics.record_login();
		metrics.record_coalesced();
		metrics.record_coalesced();
		metrics.record_hit();

		assert_eq!(
			metrics.snapshot(),
			ServerTokenStats { logins: 1, coalesced: 2, hits: 1, ..Default::default() }
		);
	}
}
