//! Client configuration: base URL, session endpoints, and refresh policy.
//!
//! [`ClientConfig`] is assembled with [`ClientConfig::builder`] (or read from the environment via
//! [`ClientConfig::from_env`]) and validated once, so the dispatcher can treat it as trusted
//! data afterwards.

/// Builder API and validation errors.
pub mod builder;
/// Refresh coordination limits.
pub mod policy;

pub use builder::*;
pub use policy::*;

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "GUESTBOOK_API_BASE_URL";
/// Environment variable holding the refresh timeout in whole seconds.
pub const REFRESH_TIMEOUT_ENV: &str = "GUESTBOOK_API_REFRESH_TIMEOUT_SECS";
/// Environment variable holding the maximum number of queued refresh waiters.
pub const MAX_WAITERS_ENV: &str = "GUESTBOOK_API_MAX_WAITERS";

/// Session-related endpoint paths, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEndpoints {
	/// Exchanges user credentials for a credential pair.
	pub login: String,
	/// Exchanges a refresh credential for a new pair.
	pub refresh: String,
	/// Ends the session server-side.
	pub logout: String,
	/// Returns the authenticated user's profile.
	pub profile: String,
}
impl Default for SessionEndpoints {
	fn default() -> Self {
		Self {
			login: "/login".into(),
			refresh: "/refresh-token".into(),
			logout: "/logout".into(),
			profile: "/me".into(),
		}
	}
}

/// Immutable, validated client configuration.
///
/// Deserialization goes through [`ClientConfigBuilder`], so a configuration read from a settings
/// file is validated exactly like one assembled in code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClientConfigBuilder")]
pub struct ClientConfig {
	/// Base URL every request path is appended to.
	pub base_url: Url,
	/// Session endpoint paths.
	pub endpoints: SessionEndpoints,
	/// Additional paths whose 401 responses must never trigger a refresh.
	pub recovery_exempt: Vec<String>,
	/// Timeout and queue limits for refresh episodes.
	pub refresh_policy: RefreshPolicy,
}
impl ClientConfig {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Reads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ClientConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	/// Reads the configuration through `lookup`, which maps variable names to values.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let raw = lookup(BASE_URL_ENV)
			.ok_or(ClientConfigError::MissingSetting { variable: BASE_URL_ENV })?;
		let base_url =
			Url::parse(raw.trim()).map_err(|source| ClientConfigError::InvalidBaseUrl { source })?;
		let mut builder = Self::builder(base_url);

		if let Some(value) = lookup(REFRESH_TIMEOUT_ENV) {
			let secs = value.trim().parse::<i64>().map_err(|_| {
				ClientConfigError::InvalidSetting { variable: REFRESH_TIMEOUT_ENV, value }
			})?;

			builder = builder.refresh_timeout(Duration::seconds(secs));
		}
		if let Some(value) = lookup(MAX_WAITERS_ENV) {
			let capacity = value.trim().parse::<usize>().map_err(|_| {
				ClientConfigError::InvalidSetting { variable: MAX_WAITERS_ENV, value }
			})?;

			builder = builder.max_waiters(capacity);
		}

		builder.build()
	}

	/// Resolves a request path (plus query pairs) against the base URL.
	pub fn endpoint_url(&self, path: &str, query: &[(String, String)]) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let raw = if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") };
		let mut url = Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		Ok(url)
	}

	/// Returns `true` when a 401 on `path` must be returned directly instead of refreshing.
	///
	/// The login, refresh, and logout endpoints are always exempt: the refresh exchange must not
	/// recurse into itself, and a logout must never end the session through the invalidator.
	pub fn is_recovery_exempt(&self, path: &str) -> bool {
		[&self.endpoints.login, &self.endpoints.refresh, &self.endpoints.logout]
			.into_iter()
			.chain(self.recovery_exempt.iter())
			.any(|endpoint| path_matches(path, endpoint))
	}
}

fn path_matches(path: &str, endpoint: &str) -> bool {
	let path = path.split('?').next().unwrap_or(path).trim_end_matches('/');
	let endpoint = endpoint.trim_end_matches('/');

	!endpoint.is_empty() && path.ends_with(endpoint)
}
