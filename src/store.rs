//! Credential store and the persistence contract behind it.
//!
//! [`CredentialStore`] keeps the current [`CredentialPair`] in memory so the dispatcher can read
//! it without suspending, and writes every change through a [`SessionPersistence`] backend.
//! Replacements swap the whole pair under a single write lock; a reader therefore observes the
//! old pair or the new pair, never a mix of both.

pub mod file;
pub mod memory;

pub use file::FilePersistence;
pub use memory::MemoryPersistence;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	obs,
};

/// Boxed future returned by [`SessionPersistence`] operations.
pub type PersistenceFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, PersistenceError>> + 'a + Send>>;

/// Storage medium contract for the credential pair.
pub trait SessionPersistence
where
	Self: Send + Sync,
{
	/// Loads the persisted pair, if one exists.
	fn load(&self) -> PersistenceFuture<'_, Option<CredentialPair>>;

	/// Persists or replaces the pair.
	fn save(&self, pair: CredentialPair) -> PersistenceFuture<'_, ()>;

	/// Removes any persisted pair.
	fn clear(&self) -> PersistenceFuture<'_, ()>;
}

/// Error type produced by [`SessionPersistence`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum PersistenceError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage medium.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Outcome of [`CredentialStore::compare_and_replace`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareAndSwapOutcome {
	/// The expected refresh credential matched and the new pair is installed.
	Updated,
	/// The store no longer holds the expected refresh credential; nothing changed.
	RefreshMismatch,
}

/// In-memory view of the session credentials, written through to persistence.
pub struct CredentialStore {
	current: RwLock<Option<CredentialPair>>,
	write_lane: AsyncMutex<()>,
	persistence: Arc<dyn SessionPersistence>,
}
impl CredentialStore {
	/// Creates an empty store backed by `persistence` without loading from it.
	pub fn new(persistence: Arc<dyn SessionPersistence>) -> Self {
		Self { current: RwLock::new(None), write_lane: AsyncMutex::new(()), persistence }
	}

	/// Opens a store and seeds it with whatever pair the backend already holds.
	pub async fn open(persistence: Arc<dyn SessionPersistence>) -> Result<Self, PersistenceError> {
		let loaded = persistence.load().await?;
		let store = Self::new(persistence);

		*store.current.write() = loaded;

		Ok(store)
	}

	/// Returns a copy of the current pair.
	pub fn snapshot(&self) -> Option<CredentialPair> {
		self.current.read().clone()
	}

	/// Returns the current access credential when it carries a usable value.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.current.read().as_ref().and_then(CredentialPair::usable_access_token).cloned()
	}

	/// Returns the current refresh credential when it carries a usable value.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.current
			.read()
			.as_ref()
			.map(|pair| &pair.refresh_token)
			.filter(|secret| !secret.is_empty())
			.cloned()
	}

	/// Returns `true` while a pair is installed.
	pub fn is_authenticated(&self) -> bool {
		self.current.read().is_some()
	}

	/// Atomically installs `pair` and writes it through to persistence.
	///
	/// The in-memory swap happens first and is authoritative; a persistence failure is returned
	/// to the caller but does not roll the swap back.
	pub(crate) async fn replace(&self, pair: CredentialPair) -> Result<(), PersistenceError> {
		let _lane = self.write_lane.lock().await;

		*self.current.write() = Some(pair.clone());

		self.persistence.save(pair).await.inspect_err(|err| {
			obs::record_event(obs::FlowKind::Refresh, "persist_pair_failed", err);
		})
	}

	/// Installs `pair` only while the store still holds `expected_refresh`.
	///
	/// A logout or a fresh login that lands while a renewal is in flight changes the refresh
	/// credential, so the renewed pair is discarded instead of resurrecting the old session.
	/// As with [`Self::replace`], a persistence failure is reported after the in-memory swap.
	pub(crate) async fn compare_and_replace(
		&self,
		expected_refresh: &TokenSecret,
		pair: CredentialPair,
	) -> Result<CompareAndSwapOutcome, PersistenceError> {
		let _lane = self.write_lane.lock().await;

		{
			let mut current = self.current.write();
			let matches = current
				.as_ref()
				.is_some_and(|held| held.refresh_token.expose() == expected_refresh.expose());

			if !matches {
				return Ok(CompareAndSwapOutcome::RefreshMismatch);
			}

			*current = Some(pair.clone());
		}

		self.persistence.save(pair).await.inspect_err(|err| {
			obs::record_event(obs::FlowKind::Refresh, "persist_pair_failed", err);
		})?;

		Ok(CompareAndSwapOutcome::Updated)
	}

	/// Removes both credentials from memory and persistence.
	pub(crate) async fn clear(&self) -> Result<(), PersistenceError> {
		let _lane = self.write_lane.lock().await;

		self.current.write().take();

		self.persistence.clear().await.inspect_err(|err| {
			obs::record_event(obs::FlowKind::Invalidate, "clear_persistence_failed", err);
		})
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore")
			.field("authenticated", &self.is_authenticated())
			.finish_non_exhaustive()
	}
}
