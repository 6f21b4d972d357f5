//! One-shot session teardown with listener notification.

// std
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::RefreshFailure,
	store::CredentialStore,
};

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidationReason {
	/// The credential could not be renewed.
	RefreshFailed(RefreshFailure),
	/// The application ended the session explicitly.
	Requested,
}

/// Notification delivered once per invalidation episode.
#[derive(Clone, Debug)]
pub struct InvalidationEvent {
	/// Monotonic episode counter, starting at 1.
	pub episode: u64,
	/// Cause of the invalidation.
	pub reason: InvalidationReason,
	/// Instant the session was torn down.
	pub occurred_at: OffsetDateTime,
}

/// Receives session-ended notifications (e.g. to navigate to a login view).
pub trait SessionListener
where
	Self: Send + Sync,
{
	/// Called exactly once per invalidation episode, after the store has been cleared.
	fn on_session_ended(&self, event: &InvalidationEvent);
}
impl<F> SessionListener for F
where
	F: Fn(&InvalidationEvent) + Send + Sync,
{
	fn on_session_ended(&self, event: &InvalidationEvent) {
		self(event)
	}
}

/// Clears the credential store and notifies listeners, once per episode.
///
/// The first `invalidate` call of an episode wins; concurrent or later calls return `false`
/// without touching the store or listeners. The episode stays closed until [`Self::rearm`] is
/// called by whoever installs a new session.
pub struct SessionInvalidator {
	store: Arc<CredentialStore>,
	listeners: RwLock<Vec<Arc<dyn SessionListener>>>,
	ended: AtomicBool,
	episodes: AtomicU64,
}
impl SessionInvalidator {
	/// Creates an invalidator for `store` with no listeners.
	pub fn new(store: Arc<CredentialStore>) -> Self {
		Self {
			store,
			listeners: RwLock::new(Vec::new()),
			ended: AtomicBool::new(false),
			episodes: AtomicU64::new(0),
		}
	}

	/// Registers a listener for future invalidation events.
	pub fn subscribe(&self, listener: Arc<dyn SessionListener>) {
		self.listeners.write().push(listener);
	}

	/// Returns the number of completed invalidation episodes.
	pub fn episodes(&self) -> u64 {
		self.episodes.load(Ordering::Acquire)
	}

	/// Returns `true` while the current episode is closed (session ended, not yet re-armed).
	pub fn is_ended(&self) -> bool {
		self.ended.load(Ordering::Acquire)
	}

	/// Ends the session: clears both credentials and fires one notification.
	///
	/// Returns `true` for the call that performed the teardown.
	pub async fn invalidate(&self, reason: InvalidationReason) -> bool {
		const KIND: FlowKind = FlowKind::Invalidate;

		if self.ended.swap(true, Ordering::AcqRel) {
			return false;
		}

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let span = FlowSpan::new(KIND, "invalidate");

		span.instrument(async {
			// Persistence failures are logged by the store; the in-memory pair is gone either way.
			let _ = self.store.clear().await;
		})
		.await;

		let event = InvalidationEvent {
			episode: self.episodes.fetch_add(1, Ordering::AcqRel) + 1,
			reason,
			occurred_at: OffsetDateTime::now_utc(),
		};
		let listeners = self.listeners.read().clone();

		obs::record_session_ended(event.episode, &event.reason);

		for listener in listeners {
			listener.on_session_ended(&event);
		}

		obs::record_flow_outcome(KIND, FlowOutcome::Success);

		true
	}

	/// Opens a new episode once a fresh session has been installed.
	pub(crate) fn rearm(&self) {
		self.ended.store(false, Ordering::Release);
	}
}
impl Debug for SessionInvalidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionInvalidator")
			.field("ended", &self.is_ended())
			.field("episodes", &self.episodes())
			.field("listeners", &self.listeners.read().len())
			.finish()
	}
}
