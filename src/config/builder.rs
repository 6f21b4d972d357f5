// self
use crate::{
	_prelude::*,
	config::{ClientConfig, RefreshPolicy, SessionEndpoints},
};

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Required environment variable is absent.
	#[error("Missing required setting `{variable}`.")]
	MissingSetting {
		/// Variable name.
		variable: &'static str,
	},
	/// Environment variable holds an unparsable value.
	#[error("Setting `{variable}` has an invalid value: {value}.")]
	InvalidSetting {
		/// Variable name.
		variable: &'static str,
		/// Raw value that failed to parse.
		value: String,
	},
	/// Base URL could not be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL cannot have paths appended to it.
	#[error("Base URL must be hierarchical and free of query or fragment: {url}.")]
	UnusableBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoint paths must be absolute and more specific than `/`.
	#[error("The {endpoint} path must start with `/` and name a resource: {path}.")]
	InvalidPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Refresh timeout must be positive when configured.
	#[error("Refresh timeout must be positive.")]
	NonPositiveTimeout,
	/// Waiter capacity must be non-zero when configured.
	#[error("Refresh waiter capacity must be at least 1.")]
	ZeroWaiterCapacity,
}

/// Builder for [`ClientConfig`] values.
///
/// Also serves as the unvalidated wire shape of a [`ClientConfig`].
#[derive(Debug, Deserialize)]
pub struct ClientConfigBuilder {
	/// Base URL for every request.
	pub base_url: Url,
	/// Session endpoint paths.
	#[serde(default)]
	pub endpoints: SessionEndpoints,
	/// Additional recovery-exempt paths.
	#[serde(default)]
	pub recovery_exempt: Vec<String>,
	/// Refresh episode limits.
	#[serde(default)]
	pub refresh_policy: RefreshPolicy,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the backend's default endpoints.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: SessionEndpoints::default(),
			recovery_exempt: Vec::new(),
			refresh_policy: RefreshPolicy::default(),
		}
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.logout = path.into();

		self
	}

	/// Overrides the profile endpoint path.
	pub fn profile_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.profile = path.into();

		self
	}

	/// Marks one more path as recovery-exempt.
	pub fn exempt_path(mut self, path: impl Into<String>) -> Self {
		self.recovery_exempt.push(path.into());

		self
	}

	/// Marks multiple paths as recovery-exempt.
	pub fn exempt_paths<I, S>(mut self, paths: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.recovery_exempt.extend(paths.into_iter().map(Into::into));

		self
	}

	/// Bounds the duration of each renewal exchange.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_policy.timeout = Some(timeout);

		self
	}

	/// Bounds the number of callers queued behind an in-flight renewal.
	pub fn max_waiters(mut self, capacity: usize) -> Self {
		self.refresh_policy.max_waiters = Some(capacity);

		self
	}

	/// Overrides the whole refresh policy.
	pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
		self.refresh_policy = policy;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			endpoints: self.endpoints,
			recovery_exempt: self.recovery_exempt,
			refresh_policy: self.refresh_policy,
		};

		config.validate()?;

		Ok(config)
	}
}

impl TryFrom<ClientConfigBuilder> for ClientConfig {
	type Error = ClientConfigError;

	fn try_from(builder: ClientConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

impl ClientConfig {
	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), ClientConfigError> {
		if self.base_url.cannot_be_a_base()
			|| self.base_url.query().is_some()
			|| self.base_url.fragment().is_some()
		{
			return Err(ClientConfigError::UnusableBaseUrl { url: self.base_url.to_string() });
		}

		validate_path("login", &self.endpoints.login)?;
		validate_path("refresh", &self.endpoints.refresh)?;
		validate_path("logout", &self.endpoints.logout)?;
		validate_path("profile", &self.endpoints.profile)?;

		for path in &self.recovery_exempt {
			validate_path("recovery-exempt", path)?;
		}

		if self.refresh_policy.timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ClientConfigError::NonPositiveTimeout);
		}
		if self.refresh_policy.max_waiters == Some(0) {
			return Err(ClientConfigError::ZeroWaiterCapacity);
		}

		Ok(())
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ClientConfigError> {
	if path.starts_with('/') && !path.trim_end_matches('/').is_empty() {
		Ok(())
	} else {
		Err(ClientConfigError::InvalidPath { endpoint, path: path.to_owned() })
	}
}
