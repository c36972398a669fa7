//! Identifiers that travel in user API paths, query strings, and headers.
//!
//! Path segments are percent-encoded by the request builder, so validation only rejects what
//! would change the meaning of a request: a `UserId` with a `,` would split into two ids in
//! `GET /users?id=a,b`, and a `ServerName` with control characters cannot be sent as a header.

// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $forbidden:expr) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps `value`.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				check($kind, &value, $forbidden)?;

				Ok(Self(value))
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (user, server).
		kind: &'static str,
	},
	/// The identifier contains a character it cannot carry on the wire.
	#[error("{kind} identifier contains the forbidden character {found:?}.")]
	ForbiddenChar {
		/// Kind of identifier (user, server).
		kind: &'static str,
		/// First offending character.
		found: char,
	},
	/// The identifier exceeded the allowed byte length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier (user, server).
		kind: &'static str,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

def_id! {
	UserId,
	"User identifier assigned by the user API; may appear in a comma-joined id list.",
	"User",
	|c: char| c == ',' || c.is_whitespace() || c.is_control()
}
def_id! {
	ServerName,
	"Name a trusted service presents in the server-name header when requesting a server token.",
	"Server",
	|c: char| c.is_whitespace() || c.is_control()
}

fn check(
	kind: &'static str,
	value: &str,
	forbidden: impl Fn(char) -> bool,
) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	if let Some(found) = value.chars().find(|c| forbidden(*c)) {
		return Err(IdentifierError::ForbiddenChar { kind, found });
	}

	Ok(())
}
