//! Session lifecycle: single-flight credential renewal and one-shot invalidation.
//!
//! [`RefreshCoordinator`] owns the only mutable refresh state in the crate. Callers that observe
//! an expired access credential call [`RefreshCoordinator::acquire`]; the first one starts a
//! renewal exchange through a [`RenewalExchange`], later ones queue behind it, and every caller of
//! the episode receives the same outcome. When an episode fails, [`SessionInvalidator`] clears the
//! credential store and notifies registered [`SessionListener`]s once.

mod coordinator;
mod invalidator;
mod metrics;
mod renewal;

pub use coordinator::*;
pub use invalidator::*;
pub use metrics::RefreshMetrics;
pub use renewal::*;

// self
use crate::_prelude::*;

/// Outcome shared by every caller of a failed refresh episode.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// The store holds no refresh credential to present.
	#[error("No refresh credential is available.")]
	MissingRefreshCredential,
	/// The refresh endpoint rejected the credential.
	#[error("Refresh endpoint rejected the credential with status {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
	},
	/// The exchange could not reach the refresh endpoint.
	#[error("Refresh exchange failed: {message}.")]
	Exchange {
		/// Transport failure summary.
		message: String,
	},
	/// The refresh endpoint answered with an unusable payload.
	#[error("Refresh endpoint returned a malformed payload: {message}.")]
	Malformed {
		/// Decoding failure summary.
		message: String,
	},
	/// The exchange exceeded the configured refresh timeout.
	#[error("Refresh exchange exceeded the {timeout} timeout.")]
	TimedOut {
		/// Configured timeout.
		timeout: Duration,
	},
	/// The caller could not queue because the waiter capacity is exhausted.
	#[error("Refresh queue is full ({capacity} waiters).")]
	QueueFull {
		/// Configured waiter capacity.
		capacity: usize,
	},
	/// The renewal task was torn down before it could settle the episode.
	#[error("Refresh episode was abandoned before completion.")]
	Abandoned,
	/// The session was replaced or ended locally while the exchange was in flight.
	#[error("Session changed while the refresh exchange was in flight.")]
	Superseded,
}
impl RefreshFailure {
	/// Returns `true` when the failure means the session cannot be sustained.
	///
	/// Queue overflow, abandonment, and a locally superseded session say nothing about the
	/// credential itself.
	pub fn ends_session(&self) -> bool {
		!matches!(
			self,
			RefreshFailure::QueueFull { .. } | RefreshFailure::Abandoned | RefreshFailure::Superseded
		)
	}
}
