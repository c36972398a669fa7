//! Async client for the user API: single-flight server tokens, per-status request dispatch,
//! capability-gated clients, axum middleware that authenticates inbound requests, and a
//! best-effort event client for the metrics service.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod http;
#[cfg(feature = "axum")] pub mod middleware;
pub mod metrics_client;
pub mod obs;
pub mod request;
pub mod token;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ServerName, ServerSecret},
		client::UserApiClient,
		config::ClientConfig,
		host::{HostResolver, HostSpec, StaticHosts},
		http::ReqwestTransport,
	};

	/// Server name used by integration tests.
	pub const TEST_SERVER_NAME: &str = "billy";
	/// Server secret used by integration tests.
	pub const TEST_SERVER_SECRET: &str = "bob";

	/// Builds a resolver pointing at a mock server base URL such as `http://127.0.0.1:1234`.
	pub fn test_resolver(base_url: &str) -> Arc<dyn HostResolver> {
		let host = base_url.parse::<HostSpec>().expect("Mock server URL should parse.");

		Arc::new(StaticHosts::new([host]))
	}

	/// Configuration carrying the test server credentials.
	pub fn test_server_config() -> ClientConfig {
		ClientConfig::default().with_server_credentials(
			ServerName::new(TEST_SERVER_NAME).expect("Test server name should be valid."),
			ServerSecret::new(TEST_SERVER_SECRET),
		)
	}

	/// Builds a reqwest-backed client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn build_reqwest_test_client(
		config: ClientConfig,
		base_url: &str,
	) -> UserApiClient<ReqwestTransport> {
		let config = config.danger_accept_invalid_certs();
		let transport =
			ReqwestTransport::from_config(&config).expect("Failed to build Reqwest client for tests.");

		UserApiClient::with_transport(config, test_resolver(base_url), Arc::new(transport))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "axum")] pub use axum;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
#[cfg(all(test, feature = "axum"))] use tower as _;
