//! Request dispatch with one-shot unauthorized recovery.

// self
use crate::{
	_prelude::*,
	client::ApiClient,
	http::{ApiRequest, ApiResponse, ApiTransport, PreparedRequest, RequestBody},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Position of a send within one dispatch call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchAttempt {
	/// First send with the credential found in the store.
	Initial,
	/// The single resend after a credential renewal.
	Replay,
}
impl DispatchAttempt {
	/// Returns the attempt that may follow this one, if any.
	pub const fn next(self) -> Option<Self> {
		match self {
			DispatchAttempt::Initial => Some(DispatchAttempt::Replay),
			DispatchAttempt::Replay => None,
		}
	}
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Sends `request`, recovering once from an expired access credential.
	///
	/// Non-401 responses are returned as-is, whatever their status; use
	/// [`ApiResponse::error_for_status`] to turn them into errors. A 401 on a recovery-exempt
	/// endpoint yields [`Error::Unauthorized`], a 401 on the replay yields
	/// [`Error::RetryExhausted`], and a failed renewal yields [`Error::RefreshFailed`].
	pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, "dispatch");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.dispatch_inner(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn dispatch_inner(&self, request: ApiRequest) -> Result<ApiResponse> {
		let url = self.config.endpoint_url(&request.path, &request.query)?;
		let body = request.body.as_ref().map(RequestBody::encode).transpose()?;
		let exempt = self.config.is_recovery_exempt(&request.path);
		let mut attempt = DispatchAttempt::Initial;
		let mut bearer = self.store.access_token();

		loop {
			let prepared = PreparedRequest {
				method: request.method,
				url: url.clone(),
				bearer: bearer.clone(),
				body: body.clone(),
			};
			let response = self.transport.send(prepared).await?;

			if !response.is_unauthorized() {
				return Ok(response);
			}
			if exempt {
				return Err(Error::Unauthorized { path: request.path, status: response.status });
			}

			let Some(next) = attempt.next() else {
				obs::record_event(FlowKind::Dispatch, "replay_rejected", &request.path);

				return Err(Error::RetryExhausted { path: request.path, status: response.status });
			};
			let renewed = self
				.coordinator
				.acquire(bearer.as_ref())
				.await
				.map_err(|reason| Error::RefreshFailed { path: request.path.clone(), reason })?;

			attempt = next;
			bearer = Some(renewed);
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::VecDeque;
	// self
	use super::*;
	use crate::{
		auth::{CredentialPair, TokenSecret},
		config::ClientConfig,
		error::TransportError,
		http::TransportFuture,
		session::{RefreshFailure, RenewalExchange, RenewalFuture},
		store::{CredentialStore, MemoryPersistence},
	};

	#[derive(Default)]
	struct ScriptedTransport {
		script: Mutex<VecDeque<u16>>,
		seen: Mutex<Vec<(String, Option<String>)>>,
	}
	impl ScriptedTransport {
		fn with_statuses(statuses: &[u16]) -> Arc<Self> {
			Arc::new(Self { script: Mutex::new(statuses.iter().copied().collect()), ..Default::default() })
		}
	}
	impl ApiTransport for ScriptedTransport {
		fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
			let status = self.script.lock().pop_front().unwrap_or(200);

			self.seen.lock().push((
				request.url.path().to_owned(),
				request.bearer.as_ref().map(|secret| secret.expose().to_owned()),
			));

			Box::pin(async move { Ok::<_, TransportError>(ApiResponse::new(status, "{}")) })
		}
	}

	struct FixedRenewal(Result<CredentialPair, RefreshFailure>);
	impl RenewalExchange for FixedRenewal {
		fn renew(&self, _: TokenSecret) -> RenewalFuture<'_> {
			let outcome = self.0.clone();

			Box::pin(async move { outcome })
		}
	}

	async fn client(
		transport: Arc<ScriptedTransport>,
		renewal: Result<CredentialPair, RefreshFailure>,
	) -> ApiClient<ScriptedTransport> {
		let config = ClientConfig::builder(
			Url::parse("https://api.example.com").expect("Base URL fixture should parse."),
		)
		.build()
		.expect("Configuration fixture should validate.");
		let persistence = Arc::new(MemoryPersistence::with_pair(CredentialPair::new("a0", "r0")));
		let store =
			Arc::new(CredentialStore::open(persistence).await.expect("Store should open."));

		ApiClient::with_parts(config, store, transport, Arc::new(FixedRenewal(renewal)))
	}

	#[test]
	fn attempts_allow_exactly_one_replay() {
		assert_eq!(DispatchAttempt::Initial.next(), Some(DispatchAttempt::Replay));
		assert_eq!(DispatchAttempt::Replay.next(), None);
	}

	#[tokio::test]
	async fn unauthorized_request_is_replayed_with_renewed_credential() {
		let transport = ScriptedTransport::with_statuses(&[401, 200]);
		let client = client(transport.clone(), Ok(CredentialPair::new("a1", "r1"))).await;
		let response =
			client.dispatch(ApiRequest::get("/guestbook/")).await.expect("Replay should succeed.");

		assert_eq!(response.status, 200);
		assert_eq!(*transport.seen.lock(), vec![
			("/guestbook/".to_owned(), Some("a0".to_owned())),
			("/guestbook/".to_owned(), Some("a1".to_owned())),
		]);
	}

	#[tokio::test]
	async fn second_unauthorized_exhausts_the_replay() {
		let transport = ScriptedTransport::with_statuses(&[401, 401]);
		let client = client(transport.clone(), Ok(CredentialPair::new("a1", "r1"))).await;
		let err = client
			.dispatch(ApiRequest::get("/guestbook/"))
			.await
			.expect_err("Second 401 should not be recovered.");

		assert!(matches!(err, Error::RetryExhausted { status: 401, .. }));
		assert_eq!(transport.seen.lock().len(), 2);
		assert_eq!(client.refresh_metrics().renewals(), 1);
	}

	#[tokio::test]
	async fn exempt_endpoint_returns_unauthorized_directly() {
		let transport = ScriptedTransport::with_statuses(&[401]);
		let client = client(transport.clone(), Ok(CredentialPair::new("a1", "r1"))).await;
		let err = client
			.dispatch(ApiRequest::post("/refresh-token"))
			.await
			.expect_err("Exempt 401 should surface.");

		assert!(matches!(err, Error::Unauthorized { ref path, status: 401 } if path == "/refresh-token"));
		assert_eq!(client.refresh_metrics().acquires(), 0);
	}

	#[tokio::test]
	async fn failed_renewal_surfaces_refresh_failed() {
		let transport = ScriptedTransport::with_statuses(&[401]);
		let client = client(transport.clone(), Err(RefreshFailure::Rejected { status: 403 })).await;
		let err =
			client.dispatch(ApiRequest::get("/me")).await.expect_err("Refresh failure should surface.");

		assert!(matches!(
			err,
			Error::RefreshFailed { ref path, reason: RefreshFailure::Rejected { status: 403 } }
				if path == "/me"
		));
		assert!(client.store().snapshot().is_none());
		assert_eq!(transport.seen.lock().len(), 1);
	}

	#[tokio::test]
	async fn other_statuses_pass_through_untouched() {
		let transport = ScriptedTransport::with_statuses(&[403]);
		let client = client(transport, Ok(CredentialPair::new("a1", "r1"))).await;
		let response =
			client.dispatch(ApiRequest::get("/guestbook/7")).await.expect("403 is a response.");

		assert_eq!(response.status, 403);
		assert_eq!(client.refresh_metrics().acquires(), 0);
	}
}
