// self
use crate::_prelude::*;

/// Limits applied to credential refresh episodes.
///
/// Both limits are disabled by default: a renewal exchange may take as long as the transport
/// allows and any number of callers may queue behind it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshPolicy {
	/// Upper bound for a single renewal exchange; exceeding it fails the whole episode.
	pub timeout: Option<Duration>,
	/// Maximum number of callers allowed to queue behind an in-flight renewal.
	pub max_waiters: Option<usize>,
}
impl RefreshPolicy {
	/// Converts the timeout into the std representation used by timers.
	pub(crate) fn std_timeout(&self) -> Option<std::time::Duration> {
		self.timeout.and_then(|timeout| std::time::Duration::try_from(timeout).ok())
	}
}
