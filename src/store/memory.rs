//! Thread-safe in-memory [`SessionPersistence`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	store::{PersistenceFuture, SessionPersistence},
};

type Slot = Arc<RwLock<Option<CredentialPair>>>;

/// Persistence backend that keeps the pair in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryPersistence(Slot);
impl MemoryPersistence {
	/// Creates a backend pre-seeded with `pair`.
	pub fn with_pair(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(Some(pair))))
	}

	/// Returns the pair currently held by the backend.
	pub fn current(&self) -> Option<CredentialPair> {
		self.0.read().clone()
	}

	fn save_now(slot: Slot, pair: CredentialPair) {
		*slot.write() = Some(pair);
	}

	fn clear_now(slot: Slot) {
		slot.write().take();
	}
}
impl SessionPersistence for MemoryPersistence {
	fn load(&self) -> PersistenceFuture<'_, Option<CredentialPair>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, pair: CredentialPair) -> PersistenceFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			Self::save_now(slot, pair);

			Ok(())
		})
	}

	fn clear(&self) -> PersistenceFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			Self::clear_now(slot);

			Ok(())
		})
	}
}
