//! Session lifecycle calls: login, logout, profile, and start-up resume.

// self
use crate::{
	_prelude::*,
	auth::TokenGrant,
	client::ApiClient,
	http::{ApiRequest, ApiTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Login endpoint payload: the user profile plus the issued credentials.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse<U> {
	/// Profile of the authenticated user.
	pub user: U,
	/// Issued credentials.
	#[serde(flatten)]
	pub grant: TokenGrant,
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Exchanges `credentials` for a session and returns the user profile.
	///
	/// The issued pair replaces whatever the store held and opens a new invalidation episode.
	pub async fn login<C, U>(&self, credentials: &C) -> Result<U>
	where
		C: ?Sized + Serialize,
		U: DeserializeOwned,
	{
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let path = self.config.endpoints.login.clone();
				let request = ApiRequest::post(path.as_str()).with_json_payload(credentials)?;
				let LoginResponse { user, grant } =
					self.dispatch(request).await?.error_for_status(&path)?.json::<LoginResponse<U>>()?;
				let pair = grant.into_pair(None).ok_or(Error::IncompleteGrant { path })?;

				// A failed write-through is logged by the store; the session is live in memory.
				let _ = self.store.replace(pair).await;

				self.invalidator.rearm();

				Ok(user)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Ends the session: notifies the server, then clears the local credentials.
	///
	/// The server call is best effort; its outcome never prevents the local teardown. Session
	/// listeners are not notified since the application asked for the logout itself.
	pub async fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let path = self.config.endpoints.logout.as_str();

				if let Err(e) = self.dispatch(ApiRequest::post(path)).await {
					obs::record_event(KIND, "logout_call_failed", &e);
				}

				self.store.clear().await.map_err(Error::from)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Fetches the authenticated user's profile.
	pub async fn profile<U>(&self) -> Result<U>
	where
		U: DeserializeOwned,
	{
		let path = self.config.endpoints.profile.as_str();

		self.dispatch(ApiRequest::get(path)).await?.error_for_status(path)?.json()
	}

	/// Restores a persisted session at start-up.
	///
	/// Returns `Ok(None)` when no access credential was loaded. When one was, the profile is
	/// fetched to prove the session is still alive. If the server refuses the credential, the
	/// stored pair is dropped and `Ok(None)` is returned; a failed renewal has already been torn
	/// down by the invalidator. Any other failure (transport, decoding, a refresh episode that
	/// ended without a verdict on the credential) is returned and leaves the stored pair alone.
	pub async fn resume_session<U>(&self) -> Result<Option<U>>
	where
		U: DeserializeOwned,
	{
		if self.store.access_token().is_none() {
			return Ok(None);
		}

		match self.profile().await {
			Ok(user) => Ok(Some(user)),
			Err(Error::RefreshFailed { reason, .. }) if reason.ends_session() => {
				obs::record_event(FlowKind::Login, "resume_session_rejected", &reason);

				Ok(None)
			},
			Err(
				e @ (Error::Unauthorized { .. }
				| Error::RetryExhausted { .. }
				| Error::Status { status: 401 | 403, .. }),
			) => {
				obs::record_event(FlowKind::Login, "resume_session_rejected", &e);

				self.store.clear().await?;

				Ok(None)
			},
			Err(e) => Err(e),
		}
	}
}
