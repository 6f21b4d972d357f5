//! Client-level error types shared across the dispatcher, session, and store layers.

// self
use crate::{_prelude::*, config::ClientConfigError, session::RefreshFailure};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::PersistenceError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); never routed through the refresh path.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The server rejected the credential on an endpoint that never triggers recovery.
	#[error("Request to `{path}` was rejected as unauthorized (status {status}).")]
	Unauthorized {
		/// Request path that was rejected.
		path: String,
		/// HTTP status code returned by the server.
		status: u16,
	},
	/// The credential could not be renewed; the session has ended.
	#[error("Request to `{path}` could not be recovered because the credential refresh failed.")]
	RefreshFailed {
		/// Path of the original request that triggered recovery.
		path: String,
		/// Outcome shared by every caller of the refresh episode.
		#[source]
		reason: RefreshFailure,
	},
	/// A request replayed with a renewed credential was rejected again.
	#[error("Request to `{path}` was rejected again after replaying it with a renewed credential.")]
	RetryExhausted {
		/// Path of the replayed request.
		path: String,
		/// HTTP status code returned by the replay.
		status: u16,
	},
	/// A login response did not carry a usable credential pair.
	#[error("Response from `{path}` did not include both an access and a refresh credential.")]
	IncompleteGrant {
		/// Endpoint that issued the response.
		path: String,
	},
	/// Server answered with a non-success status.
	#[error("Request to `{path}` failed with status {status}: {message}.")]
	Status {
		/// Request path.
		path: String,
		/// HTTP status code.
		status: u16,
		/// Server-supplied message, or the raw body preview.
		message: String,
	},
	/// Response body could not be decoded.
	#[error("Response with status {status} carried malformed JSON.")]
	Decode {
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Request body could not be encoded.
	#[error("Request body could not be encoded.")]
	Encode(#[source] serde_json::Error),
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Client configuration failed validation.
	#[error(transparent)]
	InvalidConfig(#[from] ClientConfigError),
	/// A request path could not be resolved against the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidEndpoint {
		/// Offending request path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
