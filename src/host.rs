//! Host resolution contracts for locating the user API.
//!
//! Service discovery lives outside this crate. Callers plug in a [`HostResolver`] that returns a
//! ranked list of candidate endpoints; the client always talks to the first one and treats an
//! empty list as the service being unavailable.

// self
use crate::_prelude::*;

/// Structured address of one user API instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostSpec {
	/// URL scheme, usually `http` or `https`.
	pub scheme: String,
	/// Host name or IP address.
	pub host: String,
	/// Explicit port, if any.
	pub port: Option<u16>,
}
impl HostSpec {
	/// Creates a host spec from its parts.
	pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
		Self { scheme: scheme.into(), host: host.into(), port }
	}

	/// Formats the spec as a base URL without a trailing slash.
	pub fn base_url(&self) -> String {
		match self.port {
			Some(port) => format!("{}://{}:{port}", self.scheme, self.host),
			None => format!("{}://{}", self.scheme, self.host),
		}
	}
}
impl Display for HostSpec {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.base_url())
	}
}
impl FromStr for HostSpec {
	type Err = url::ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let url = Url::parse(s)?;
		let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;

		Ok(Self::new(url.scheme(), host, url.port()))
	}
}

/// Source of candidate user API endpoints.
pub trait HostResolver
where
	Self: Send + Sync,
{
	/// Returns candidate hosts, best first. An empty list means no host is available.
	fn resolve(&self) -> Vec<HostSpec>;
}

/// Resolver backed by a fixed host list.
#[derive(Clone, Debug, Default)]
pub struct StaticHosts(Arc<RwLock<Vec<HostSpec>>>);
impl StaticHosts {
	/// Creates a resolver that always returns `hosts`.
	pub fn new(hosts: impl IntoIterator<Item = HostSpec>) -> Self {
		Self(Arc::new(RwLock::new(hosts.into_iter().collect())))
	}

	/// Replaces the advertised host list.
	pub fn replace(&self, hosts: impl IntoIterator<Item = HostSpec>) {
		*self.0.write() = hosts.into_iter().collect();
	}
}
impl HostResolver for StaticHosts {
	fn resolve(&self) -> Vec<HostSpec> {
		self.0.read().clone()
	}
}
