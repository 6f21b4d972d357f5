//! Authenticated API client wiring the dispatcher, refresh coordinator, and invalidator together.

mod account;
mod dispatch;

pub use account::*;
pub use dispatch::*;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	http::ApiTransport,
	session::{
		HttpRenewal, RefreshCoordinator, RefreshMetrics, RenewalExchange, SessionInvalidator,
		SessionListener,
	},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated client for the guestbook API.
///
/// Every call goes through [`ApiClient::dispatch`], which attaches the current access credential
/// and transparently recovers from one `401 Unauthorized` per call by renewing the credential
/// through the shared [`RefreshCoordinator`]. Cloning the client is cheap; clones share the
/// store, the coordinator, and the invalidator.
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	config: Arc<ClientConfig>,
	transport: Arc<T>,
	store: Arc<CredentialStore>,
	invalidator: Arc<SessionInvalidator>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client that renews credentials through the configured refresh endpoint.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		let transport = transport.into();
		let renewal = Arc::new(HttpRenewal::new(transport.clone(), &config)?);

		Ok(Self::with_parts(config, store, transport, renewal))
	}

	/// Creates a client from caller-provided transport and renewal exchange.
	pub fn with_parts(
		config: ClientConfig,
		store: Arc<CredentialStore>,
		transport: impl Into<Arc<T>>,
		renewal: Arc<dyn RenewalExchange>,
	) -> Self {
		let invalidator = Arc::new(SessionInvalidator::new(store.clone()));
		let coordinator = Arc::new(RefreshCoordinator::new(
			store.clone(),
			renewal,
			invalidator.clone(),
			config.refresh_policy,
		));

		Self { config: Arc::new(config), transport: transport.into(), store, invalidator, coordinator }
	}

	/// Returns the validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns the credential store shared with the session layer.
	pub fn store(&self) -> &Arc<CredentialStore> {
		&self.store
	}

	/// Returns the refresh coordinator.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Returns the refresh coordination counters.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.coordinator.metrics()
	}

	/// Registers a listener fired once per invalidation episode.
	pub fn on_session_ended(&self, listener: Arc<dyn SessionListener>) {
		self.invalidator.subscribe(listener);
	}

	/// Returns the session invalidator.
	pub fn invalidator(&self) -> &Arc<SessionInvalidator> {
		&self.invalidator
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by a freshly built reqwest client.
	pub fn new(config: ClientConfig, store: Arc<CredentialStore>) -> Result<Self> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Self::with_transport(config, store, ReqwestTransport::with_client(client))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			invalidator: self.invalidator.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("store", &self.store)
			.field("coordinator", &self.coordinator)
			.finish_non_exhaustive()
	}
}
