//! Client configuration and environment loading.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{ServerName, ServerSecret},
	error::ConfigError,
};

/// How trusted-service calls authenticate against the user API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerAuthMode {
	/// Acquire a server session token once and attach it to every call.
	#[default]
	SessionToken,
	/// Attach the shared server secret header directly.
	SharedSecret,
}

/// Settings recognized by the client.
///
/// All fields have defaults; the server name and secret must both be present to unlock the
/// trusted-service surface (see [`ClientConfig::has_server_credentials`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Name this service presents during server login.
	pub server_name: Option<ServerName>,
	/// Shared secret this service presents during server login.
	pub server_secret: Option<ServerSecret>,
	/// How long an acquired server token is reused before it expires.
	#[serde(rename = "tokenRefreshIntervalMs", with = "duration_ms")]
	pub token_refresh_interval: StdDuration,
	/// Prefix inserted between the resolved host and every request path.
	pub path_prefix: String,
	/// Whether TLS certificates are verified.
	pub verify_tls: bool,
	/// Authentication used by trusted-service calls.
	pub server_auth: ServerAuthMode,
}
impl ClientConfig {
	/// Default lifetime of a cached server token (one hour).
	pub const DEFAULT_TOKEN_REFRESH_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

	/// Reads configuration from process environment variables.
	///
	/// Recognized variables: `SERVER_NAME`, `SERVER_SECRET`, `USER_API_PATH_PREFIX`,
	/// `USER_API_TOKEN_REFRESH_INTERVAL_MS`, and `USER_API_VERIFY_TLS`.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		if let Some(name) = lookup("SERVER_NAME") {
			config.server_name = Some(ServerName::new(name)?);
		}
		if let Some(secret) = lookup("SERVER_SECRET") {
			config.server_secret = Some(ServerSecret::new(secret));
		}
		if let Some(prefix) = lookup("USER_API_PATH_PREFIX") {
			config.path_prefix = prefix;
		}
		if let Some(raw) = lookup("USER_API_TOKEN_REFRESH_INTERVAL_MS") {
			let millis = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
				key: "USER_API_TOKEN_REFRESH_INTERVAL_MS",
				value: raw.clone(),
			})?;

			config.token_refresh_interval = StdDuration::from_millis(millis);
		}
		if let Some(raw) = lookup("USER_API_VERIFY_TLS") {
			config.verify_tls = match raw.trim().to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" => true,
				"0" | "false" | "no" => false,
				_ => return Err(ConfigError::InvalidEnv { key: "USER_API_VERIFY_TLS", value: raw }),
			};
		}

		Ok(config)
	}

	/// Sets the server identity used for server login.
	pub fn with_server_credentials(mut self, name: ServerName, secret: ServerSecret) -> Self {
		self.server_name = Some(name);
		self.server_secret = Some(secret);

		self
	}

	/// Overrides the server token lifetime.
	pub fn with_token_refresh_interval(mut self, interval: StdDuration) -> Self {
		self.token_refresh_interval = interval;

		self
	}

	/// Overrides the path prefix.
	pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.path_prefix = prefix.into();

		self
	}

	/// Overrides how trusted-service calls authenticate.
	pub fn with_server_auth(mut self, mode: ServerAuthMode) -> Self {
		self.server_auth = mode;

		self
	}

	/// Disables TLS certificate verification. Only use against test servers.
	pub fn danger_accept_invalid_certs(mut self) -> Self {
		self.verify_tls = false;

		self
	}

	/// Returns the server name and secret when both are configured.
	pub fn server_credentials(&self) -> Option<(&ServerName, &ServerSecret)> {
		self.server_name.as_ref().zip(self.server_secret.as_ref())
	}

	/// True when both server name and secret are configured.
	pub fn has_server_credentials(&self) -> bool {
		self.server_credentials().is_some()
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			server_name: None,
			server_secret: None,
			token_refresh_interval: Self::DEFAULT_TOKEN_REFRESH_INTERVAL,
			path_prefix: String::new(),
			verify_tls: true,
			server_auth: ServerAuthMode::default(),
		}
	}
}

mod duration_ms {
	// std
	use std::time::Duration;
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_are_secure() {
		let config = ClientConfig::default();

		assert!(config.verify_tls);
		assert_eq!(config.token_refresh_interval, StdDuration::from_millis(3_600_000));
		assert_eq!(config.path_prefix, "");
		assert_eq!(config.server_auth, ServerAuthMode::SessionToken);
		assert!(!config.has_server_credentials());
	}

	#[test]
	fn credentials_require_name_and_secret() {
		let mut config =
			ClientConfig { server_secret: Some(ServerSecret::new("wow!")), ..Default::default() };

		assert!(!config.has_server_credentials());

		config.server_name =
			Some(ServerName::new("billy").expect("Server name fixture should be valid."));

		assert!(config.has_server_credentials());
	}

	#[test]
	fn lookup_reads_known_variables() {
		let env = HashMap::from([
			("SERVER_NAME", "billy"),
			("SERVER_SECRET", "bob"),
			("USER_API_PATH_PREFIX", "/v1"),
			("USER_API_TOKEN_REFRESH_INTERVAL_MS", "1500"),
			("USER_API_VERIFY_TLS", "false"),
		]);
		let config = ClientConfig::from_lookup(|key| env.get(key).map(|value| value.to_string()))
			.expect("Environment fixture should parse.");

		assert!(config.has_server_credentials());
		assert_eq!(config.path_prefix, "/v1");
		assert_eq!(config.token_refresh_interval, StdDuration::from_millis(1500));
		assert!(!config.verify_tls);
	}

	#[test]
	fn lookup_rejects_malformed_values() {
		let err = ClientConfig::from_lookup(|key| {
			(key == "USER_API_TOKEN_REFRESH_INTERVAL_MS").then(|| "soon".to_owned())
		})
		.expect_err("Non-numeric interval must be rejected.");

		assert!(matches!(err, ConfigError::InvalidEnv { key: "USER_API_TOKEN_REFRESH_INTERVAL_MS", .. }));
	}

	#[test]
	fn deserializes_camel_case_with_defaults() {
		let config: ClientConfig = serde_json::from_str(
			r#"{"serverName":"billy","serverSecret":"bob","tokenRefreshIntervalMs":60000}"#,
		)
		.expect("Config JSON should deserialize.");

		assert!(config.has_server_credentials());
		assert_eq!(config.token_refresh_interval, StdDuration::from_secs(60));
		assert!(config.verify_tls);
	}
}
