//! Auth-domain identifiers, secrets, scopes, and identity payloads.

pub mod id;
pub mod identity;
pub mod scope;
pub mod secret;

pub use id::*;
pub use identity::*;
pub use scope::*;
pub use secret::*;

/// Header carrying a session token, on both requests and login responses.
pub const SESSION_TOKEN_HEADER: &str = "x-tidepool-session-token";
/// Header carrying the server name during server login.
pub const SERVER_NAME_HEADER: &str = "x-tidepool-server-name";
/// Header carrying the shared server secret.
pub const SERVER_SECRET_HEADER: &str = "x-tidepool-server-secret";
/// Header older services use to present the shared secret directly.
pub const LEGACY_SERVICE_SECRET_HEADER: &str = "x-tidepool-legacy-service-secret";
