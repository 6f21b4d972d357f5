//! Single-flight credential renewal.

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::RefreshPolicy,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{
		InvalidationReason, RefreshFailure, RefreshMetrics, RenewalExchange, SessionInvalidator,
	},
	store::{CompareAndSwapOutcome, CredentialStore},
};

type EpisodeOutcome = Result<TokenSecret, RefreshFailure>;

const KIND: FlowKind = FlowKind::Refresh;

#[derive(Debug)]
enum RefreshMode {
	Idle,
	Refreshing { waiters: Vec<Waiter> },
}

#[derive(Debug)]
struct Waiter {
	tx: oneshot::Sender<EpisodeOutcome>,
}

enum Ticket {
	Reuse(TokenSecret),
	Follower(oneshot::Receiver<EpisodeOutcome>),
	Leader,
}

/// Coordinates credential renewal so concurrent callers share one exchange.
///
/// The "check mode, then lead or enqueue" step runs under one mutex, so at most one renewal
/// exchange is in flight at any time. Every caller that arrives while it runs is parked as a
/// waiter and receives the episode's outcome exactly once.
pub struct RefreshCoordinator {
	store: Arc<CredentialStore>,
	renewal: Arc<dyn RenewalExchange>,
	invalidator: Arc<SessionInvalidator>,
	policy: RefreshPolicy,
	state: Mutex<RefreshMode>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new(
		store: Arc<CredentialStore>,
		renewal: Arc<dyn RenewalExchange>,
		invalidator: Arc<SessionInvalidator>,
		policy: RefreshPolicy,
	) -> Self {
		Self {
			store,
			renewal,
			invalidator,
			policy,
			state: Mutex::new(RefreshMode::Idle),
			metrics: Default::default(),
		}
	}

	/// Returns the coordination counters.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Returns `true` while a renewal exchange is in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.state.lock(), RefreshMode::Refreshing { .. })
	}

	/// Returns the number of callers parked behind the in-flight renewal.
	pub fn waiting(&self) -> usize {
		match &*self.state.lock() {
			RefreshMode::Idle => 0,
			RefreshMode::Refreshing { waiters } => waiters.len(),
		}
	}

	/// Obtains a renewed access credential.
	///
	/// `stale` is the credential the caller's request was rejected with. When no renewal is in
	/// flight and the store already holds a different usable credential, a previous episode has
	/// renewed it since the request was sent and that credential is returned without a new
	/// exchange. Pass `None` to force a renewal.
	///
	/// The exchange, the store update, and any invalidation run on a task of their own, so the
	/// episode settles the same way for every caller even when the one that started it is
	/// dropped. Only a renewal task that never completes (runtime shutdown, panic) settles the
	/// episode with [`RefreshFailure::Abandoned`].
	pub async fn acquire(
		self: &Arc<Self>,
		stale: Option<&TokenSecret>,
	) -> Result<TokenSecret, RefreshFailure> {
		self.metrics.record_acquire();

		match self.enter(stale)? {
			Ticket::Reuse(token) => Ok(token),
			Ticket::Follower(rx) => rx.await.unwrap_or(Err(RefreshFailure::Abandoned)),
			Ticket::Leader => {
				let coordinator = self.clone();

				tokio::spawn(async move { coordinator.lead().await })
					.await
					.unwrap_or(Err(RefreshFailure::Abandoned))
			},
		}
	}

	fn enter(&self, stale: Option<&TokenSecret>) -> Result<Ticket, RefreshFailure> {
		let mut state = self.state.lock();

		match &mut *state {
			RefreshMode::Refreshing { waiters } => {
				waiters.retain(|waiter| !waiter.tx.is_closed());

				if let Some(capacity) = self.policy.max_waiters.filter(|cap| waiters.len() >= *cap) {
					obs::record_event(KIND, "refresh_queue_full", &capacity);

					return Err(RefreshFailure::QueueFull { capacity });
				}

				let (tx, rx) = oneshot::channel();

				waiters.push(Waiter { tx });
				self.metrics.record_coalesced();

				Ok(Ticket::Follower(rx))
			},
			RefreshMode::Idle => {
				let renewed = stale.and_then(|stale| {
					self.store.access_token().filter(|current| current.expose() != stale.expose())
				});

				if let Some(token) = renewed {
					self.metrics.record_reused();

					return Ok(Ticket::Reuse(token));
				}

				*state = RefreshMode::Refreshing { waiters: Vec::new() };

				Ok(Ticket::Leader)
			},
		}
	}

	async fn lead(&self) -> EpisodeOutcome {
		let episode = Episode { coordinator: self, settled: false };
		let span = FlowSpan::new(KIND, "acquire");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_renewal();

		let outcome = span.instrument(self.renew()).await;

		match &outcome {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(reason) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				obs::record_event(KIND, "refresh_failed", reason);

				if reason.ends_session() {
					self.invalidator
						.invalidate(InvalidationReason::RefreshFailed(reason.clone()))
						.await;
				}
			},
		}

		episode.settle(&outcome);

		outcome
	}

	async fn renew(&self) -> EpisodeOutcome {
		let refresh = self.store.refresh_token().ok_or(RefreshFailure::MissingRefreshCredential)?;
		let exchange = self.renewal.renew(refresh.clone());
		let pair = match self.policy.timeout.zip(self.policy.std_timeout()) {
			Some((timeout, limit)) => tokio::time::timeout(limit, exchange)
				.await
				.map_err(|_| RefreshFailure::TimedOut { timeout })??,
			None => exchange.await?,
		};
		let access = pair.access_token.clone();

		match self.store.compare_and_replace(&refresh, pair).await {
			// The in-memory pair is installed even when persistence fails.
			Ok(CompareAndSwapOutcome::Updated) | Err(_) => {
				self.invalidator.rearm();

				Ok(access)
			},
			Ok(CompareAndSwapOutcome::RefreshMismatch) =>
				self.store.access_token().ok_or(RefreshFailure::Superseded),
		}
	}

	fn release(&self, outcome: EpisodeOutcome) {
		let waiters = match mem::replace(&mut *self.state.lock(), RefreshMode::Idle) {
			RefreshMode::Refreshing { waiters } => waiters,
			RefreshMode::Idle => Vec::new(),
		};
		let settlement = match &outcome {
			Ok(_) => "renewed",
			Err(RefreshFailure::Abandoned) => "abandoned",
			Err(_) => "failed",
		};

		obs::record_episode_settled(settlement, waiters.len());

		for waiter in waiters {
			// A waiter whose caller went away has nothing left to notify.
			let _ = waiter.tx.send(outcome.clone());
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("policy", &self.policy)
			.field("state", &*self.state.lock())
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

/// Settles a renewal episode exactly once, including when the renewal task is torn down.
struct Episode<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl Episode<'_> {
	fn settle(mut self, outcome: &EpisodeOutcome) {
		self.settled = true;
		self.coordinator.release(outcome.clone());
	}
}
impl Drop for Episode<'_> {
	fn drop(&mut self) {
		if !self.settled {
			obs::record_event(KIND, "refresh_abandoned", &self.coordinator.waiting());
			self.coordinator.release(Err(RefreshFailure::Abandoned));
		}
	}
}
