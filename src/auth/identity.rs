//! Identity payloads returned by token checks.

// self
use crate::{_prelude::*, auth::LEGACY_SERVICE_SECRET_HEADER};

/// Identity data the user API returns for a valid token.
///
/// The payload is defined by the user API. Only `userid` and `isserver` are interpreted, and
/// both may be absent; every other field is preserved in [`TokenData::extra`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
	/// User the token was issued to (or the service name for server tokens).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub userid: Option<String>,
	/// Whether the token belongs to a trusted service rather than a user.
	#[serde(default)]
	pub isserver: bool,
	/// Remaining fields, passed through untouched.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}
impl TokenData {
	/// Creates identity data for a user token.
	pub fn user(userid: impl Into<String>) -> Self {
		Self { userid: Some(userid.into()), isserver: false, extra: Default::default() }
	}

	/// Creates identity data for a server token.
	pub fn server(userid: impl Into<String>) -> Self {
		Self { userid: Some(userid.into()), isserver: true, extra: Default::default() }
	}

	/// Synthetic identity used when a caller authenticated with the legacy service secret.
	pub fn legacy_service() -> Self {
		Self::server(LEGACY_SERVICE_SECRET_HEADER)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unknown_fields_survive_round_trip() {
		let data: TokenData =
			serde_json::from_str(r#"{"userid":"abc123","isserver":true,"roles":["clinic"]}"#)
				.expect("Token data should deserialize.");

		assert_eq!(data.userid.as_deref(), Some("abc123"));
		assert!(data.isserver);
		assert_eq!(data.extra.get("roles"), Some(&serde_json::json!(["clinic"])));

		let value = serde_json::to_value(&data).expect("Token data should serialize.");

		assert_eq!(value["roles"], serde_json::json!(["clinic"]));
	}

	#[test]
	fn isserver_defaults_to_false() {
		let data: TokenData =
			serde_json::from_str(r#"{"userid":"abc123"}"#).expect("Token data should deserialize.");

		assert_eq!(data, TokenData::user("abc123"));
	}

	#[test]
	fn service_defined_payloads_decode() {
		let data: TokenData =
			serde_json::from_str(r#"{"howdy":"hi"}"#).expect("Any JSON object should decode.");

		assert_eq!(data.userid, None);
		assert!(!data.isserver);
		assert_eq!(data.extra.get("howdy"), Some(&serde_json::json!("hi")));
	}
}
