//! Client-level error types shared across requests, the server token cache, and middleware.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Every variant is cheap to clone so a single failure can be handed to every caller waiting
/// on the same server token acquisition.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Server token could not be acquired.
	#[error(transparent)]
	ServerToken(#[from] ServerTokenError),

	/// The host resolver returned no candidate endpoints.
	#[error("No {service} hosts available.")]
	Unavailable {
		/// Name of the service that could not be resolved.
		service: &'static str,
	},
	/// Response status had no registered handler and no default handler was set.
	#[error("User API responded with status {status}: {body}.")]
	UnexpectedStatus {
		/// HTTP status code returned by the user API.
		status: u16,
		/// Raw response body, decoded lossily as UTF-8.
		body: String,
	},
	/// Response body could not be decoded as the expected JSON shape.
	#[error("User API returned malformed JSON.")]
	Decode {
		/// Structured parsing failure including the offending path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
}
impl Error {
	/// Status code used when no host is available.
	pub const UNAVAILABLE_STATUS: u16 = 503;

	/// Returns the HTTP status code attached to this error, if any.
	///
	/// Middleware uses this to decide between forwarding a status and answering 500.
	pub fn status_code(&self) -> Option<u16> {
		match self {
			Self::Unavailable { .. } => Some(Self::UNAVAILABLE_STATUS),
			Self::UnexpectedStatus { status, .. } => Some(*status),
			Self::Transport(TransportError::Network { status, .. }) => *status,
			_ => None,
		}
	}
}

/// Configuration and request construction failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest(#[source] Arc<http::Error>),
	/// Resolved host plus path prefix does not form a usable URL.
	#[error("Base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// The offending base URL.
		url: String,
		/// Underlying parsing failure, when the URL did not parse at all.
		#[source]
		source: Option<url::ParseError>,
	},
	/// Header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied by the caller.
		name: String,
	},
	/// The same status code was registered twice on one request.
	#[error("A handler for status {status} is already registered.")]
	DuplicateStatusHandler {
		/// Status code registered more than once.
		status: u16,
	},
	/// JSON payload could not be serialized.
	#[error("Request payload could not be encoded as JSON.")]
	Encode(#[source] Arc<serde_json::Error>),
	/// Environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{key}` has an invalid value: {value}.")]
	InvalidEnv {
		/// Variable name.
		key: &'static str,
		/// Raw value found in the environment.
		value: String,
	},
	/// Server identity name failed validation.
	#[error("Server name is invalid.")]
	InvalidServerName(#[from] crate::auth::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<http::Error> for ConfigError {
	fn from(e: http::Error) -> Self {
		Self::HttpRequest(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the user API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
		/// HTTP status code, when the transport supplies one.
		status: Option<u16>,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the user API.")]
	Io(#[source] Arc<std::io::Error>),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src), status: None }
	}

	/// Attaches a transport-supplied status code.
	pub fn with_status(self, status: u16) -> Self {
		match self {
			Self::Network { source, .. } => Self::Network { source, status: Some(status) },
			other => other,
		}
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		let status = e.status().map(|status| status.as_u16());
		let err = Self::network(e);

		match status {
			Some(status) => err.with_status(status),
			None => err,
		}
	}
}

/// Failures specific to acquiring the shared server token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ServerTokenError {
	/// The server login call returned a status other than 200.
	#[error("Bad status on communications with user-api.")]
	BadStatus {
		/// Status returned by the server login endpoint.
		status: u16,
	},
	/// The server login call succeeded but carried no session token header.
	#[error("Unable to initiate communications with user-api.")]
	MissingToken,
	/// The acquisition task ended without reporting an outcome.
	#[error("Server token acquisition was abandoned before completing.")]
	Abandoned,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug)]
	struct Refused;
	impl Display for Refused {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.write_str("connection refused")
		}
	}
	impl StdError for Refused {}

	#[test]
	fn status_codes_follow_error_taxonomy() {
		assert_eq!(Error::Unavailable { service: "user-api" }.status_code(), Some(503));
		assert_eq!(
			Error::UnexpectedStatus { status: 418, body: "teapot".into() }.status_code(),
			Some(418)
		);
		assert_eq!(Error::from(TransportError::network(Refused)).status_code(), None);
		assert_eq!(
			Error::from(TransportError::network(Refused).with_status(502)).status_code(),
			Some(502)
		);
		assert_eq!(Error::from(ServerTokenError::MissingToken).status_code(), None);
	}

	#[test]
	fn server_token_messages_match_wire_expectations() {
		assert_eq!(
			ServerTokenError::BadStatus { status: 201 }.to_string(),
			"Bad status on communications with user-api."
		);
		assert_eq!(
			ServerTokenError::MissingToken.to_string(),
			"Unable to initiate communications with user-api."
		);
	}

	#[test]
	fn errors_clone_with_shared_sources() {
		let err = Error::from(TransportError::network(Refused));
		let cloned = err.clone();

		assert_eq!(err.to_string(), cloned.to_string());
		assert!(StdError::source(&cloned).is_some());
	}
}
