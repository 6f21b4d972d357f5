//! Renewal exchange contract and its HTTP implementation.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenGrant, TokenSecret},
	config::ClientConfig,
	error::ConfigError,
	http::{ApiTransport, Method, PreparedRequest, RequestBody},
	session::RefreshFailure,
};

/// Boxed future returned by [`RenewalExchange::renew`].
pub type RenewalFuture<'a> =
	Pin<Box<dyn Future<Output = Result<CredentialPair, RefreshFailure>> + 'a + Send>>;

/// Exchanges a refresh credential for a new credential pair.
pub trait RenewalExchange
where
	Self: Send + Sync,
{
	/// Presents `refresh_token` to the server and returns the pair to install.
	fn renew(&self, refresh_token: TokenSecret) -> RenewalFuture<'_>;
}

/// Renewal exchange that POSTs `{"refresh_token": ...}` to the configured refresh endpoint.
///
/// The call goes straight to the transport, bypassing the dispatcher, so a rejected refresh can
/// never re-enter the recovery path.
pub struct HttpRenewal<T>
where
	T: ?Sized + ApiTransport,
{
	transport: Arc<T>,
	url: Url,
}
impl<T> HttpRenewal<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates an exchange bound to the refresh endpoint of `config`.
	pub fn new(transport: Arc<T>, config: &ClientConfig) -> Result<Self, ConfigError> {
		let url = config.endpoint_url(&config.endpoints.refresh, &[])?;

		Ok(Self { transport, url })
	}

	/// Returns the resolved refresh endpoint.
	pub fn url(&self) -> &Url {
		&self.url
	}

	async fn exchange(&self, refresh_token: TokenSecret) -> Result<CredentialPair, RefreshFailure> {
		let body = RequestBody::Json(serde_json::json!({ "refresh_token": refresh_token.expose() }))
			.encode()
			.map_err(|e| RefreshFailure::Malformed { message: e.to_string() })?;
		let request = PreparedRequest {
			method: Method::Post,
			url: self.url.clone(),
			bearer: None,
			body: Some(body),
		};
		let response = self
			.transport
			.send(request)
			.await
			.map_err(|e| RefreshFailure::Exchange { message: e.to_string() })?;

		if !response.is_success() {
			return Err(RefreshFailure::Rejected { status: response.status });
		}

		let grant = response
			.json::<TokenGrant>()
			.map_err(|e| RefreshFailure::Malformed { message: e.to_string() })?;

		if grant.access_token.is_empty() {
			return Err(RefreshFailure::Malformed { message: "access_token is empty".into() });
		}

		grant.into_pair(Some(&refresh_token)).ok_or_else(|| RefreshFailure::Malformed {
			message: "refresh_token is missing".into(),
		})
	}
}
impl<T> RenewalExchange for HttpRenewal<T>
where
	T: ?Sized + ApiTransport,
{
	fn renew(&self, refresh_token: TokenSecret) -> RenewalFuture<'_> {
		Box::pin(self.exchange(refresh_token))
	}
}
impl<T> Debug for HttpRenewal<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRenewal").field("url", &self.url.as_str()).finish()
	}
}
