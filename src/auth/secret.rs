//! Secret wrappers that redact sensitive material.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

macro_rules! def_secret {
	($name:ident, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(String);
		impl $name {
			/// Wraps a new secret string.
			pub fn new(value: impl Into<String>) -> Self {
				Self(value.into())
			}

			/// Returns the inner value. Callers must avoid logging this string.
			pub fn expose(&self) -> &str {
				&self.0
			}

			/// Compares against a candidate by digest instead of by raw bytes.
			pub fn matches(&self, candidate: &str) -> bool {
				Sha256::digest(self.0.as_bytes()) == Sha256::digest(candidate.as_bytes())
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				self.expose()
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.debug_tuple(stringify!($name)).field(&"<redacted>").finish()
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str("<redacted>")
			}
		}
	};
}

def_secret! { SessionToken, "Session token issued by the user API to a user or a trusted service." }
def_secret! { ServerSecret, "Shared secret a trusted service uses to obtain server tokens." }

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let token = SessionToken::new("super-secret");
		let secret = ServerSecret::new("shared");

		assert_eq!(format!("{token:?}"), "SessionToken(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(token.expose(), "super-secret");
	}

	#[test]
	fn matches_compares_full_value() {
		let secret = ServerSecret::new("testing that we are secret");

		assert!(secret.matches("testing that we are secret"));
		assert!(!secret.matches("testing that we are"));
		assert!(!secret.matches(""));
	}

	#[test]
	fn serde_is_transparent() {
		let token: SessionToken =
			serde_json::from_str("\"abcd\"").expect("Token should deserialize from a string.");

		assert_eq!(token.expose(), "abcd");
		assert_eq!(serde_json::to_string(&token).expect("Token should serialize."), "\"abcd\"");
	}
}
