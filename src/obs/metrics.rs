// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"guestbook_client_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how many queued callers a settled refresh episode released.
///
/// `settlement` is `renewed`, `failed`, or `abandoned`.
pub fn record_episode_settled(settlement: &'static str, waiters: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("guestbook_client_refresh_episodes_total", "settlement" => settlement)
			.increment(1);
		metrics::histogram!("guestbook_client_refresh_waiters", "settlement" => settlement)
			.record(waiters as f64);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (settlement, waiters);
	}
}
