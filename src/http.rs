//! Request/response model and the transport seam for API calls.
//!
//! The dispatcher never talks to an HTTP stack directly. It resolves an [`ApiRequest`] into a
//! [`PreparedRequest`] (absolute URL plus the bearer credential chosen for this attempt) and
//! hands it to an [`ApiTransport`]. The crate ships [`ReqwestTransport`] behind the default
//! `reqwest` feature; tests and embedders can plug in their own transport.

// self
use crate::{_prelude::*, auth::TokenSecret, error::TransportError};

/// HTTP status code the server uses to reject an access credential.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// HTTP methods used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Body attached to an outgoing request.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// `application/json` payload.
	Json(serde_json::Value),
	/// `application/x-www-form-urlencoded` fields.
	Form(Vec<(String, String)>),
}
impl RequestBody {
	/// Returns the `Content-Type` header value for the body.
	pub const fn content_type(&self) -> &'static str {
		match self {
			RequestBody::Json(_) => "application/json",
			RequestBody::Form(_) => "application/x-www-form-urlencoded",
		}
	}

	/// Encodes the body into wire bytes.
	pub fn encode(&self) -> Result<EncodedBody> {
		let bytes = match self {
			RequestBody::Json(value) => serde_json::to_vec(value).map_err(Error::Encode)?,
			RequestBody::Form(fields) => url::form_urlencoded::Serializer::new(String::new())
				.extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
				.finish()
				.into_bytes(),
		};

		Ok(EncodedBody { content_type: self.content_type(), bytes })
	}
}

/// Wire-ready request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBody {
	/// `Content-Type` header value.
	pub content_type: &'static str,
	/// Encoded payload.
	pub bytes: Vec<u8>,
}

/// Application-level request, relative to the configured base URL.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL (e.g. `/guestbook/`).
	pub path: String,
	/// Query pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Optional request body.
	pub body: Option<RequestBody>,
}
impl ApiRequest {
	/// Creates a request without query or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Attaches a JSON body.
	pub fn with_json(mut self, value: serde_json::Value) -> Self {
		self.body = Some(RequestBody::Json(value));

		self
	}

	/// Serializes `payload` and attaches it as a JSON body.
	pub fn with_json_payload<T>(self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let value = serde_json::to_value(payload).map_err(Error::Encode)?;

		Ok(self.with_json(value))
	}

	/// Attaches form-encoded fields.
	pub fn with_form<I, K, V>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.body = Some(RequestBody::Form(
			fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		));

		self
	}
}

/// Fully resolved request handed to an [`ApiTransport`].
#[derive(Clone, Debug)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// Bearer credential for this attempt; `None` sends the request unauthenticated.
	pub bearer: Option<TokenSecret>,
	/// Optional encoded body.
	pub body: Option<EncodedBody>,
}
impl PreparedRequest {
	/// Renders the `Authorization` header value, when a credential is attached.
	pub fn authorization(&self) -> Option<String> {
		self.bearer.as_ref().map(|secret| format!("Bearer {}", secret.expose()))
	}
}

/// Response returned by an [`ApiTransport`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lower-cased names.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with the given status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Creates a JSON response.
	pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
		let mut response = Self::new(status, value.to_string());

		response.headers.insert("content-type".into(), "application/json".into());

		response
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` when the server rejected the access credential.
	pub fn is_unauthorized(&self) -> bool {
		self.status == STATUS_UNAUTHORIZED
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the JSON body, reporting the failing JSON path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Converts non-2xx responses into [`Error::Status`], keeping 2xx responses untouched.
	pub fn error_for_status(self, path: &str) -> Result<Self> {
		if self.is_success() {
			return Ok(self);
		}

		Err(Error::Status { path: path.to_owned(), status: self.status, message: self.message() })
	}

	fn message(&self) -> String {
		#[derive(Deserialize)]
		struct ErrorBody {
			message: String,
		}

		serde_json::from_slice::<ErrorBody>(&self.body)
			.map(|body| body.message)
			.unwrap_or_else(|_| self.text().chars().take(256).collect())
	}
}

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over the HTTP stack that carries API calls.
///
/// Implementations must return every HTTP response (including 4xx/5xx) as `Ok`; `Err` is reserved
/// for failures where no response was received at all. Implementations must be
/// `Send + Sync + 'static` so one transport can be shared by the dispatcher and the renewal
/// exchange.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and resolves with the server's response.
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn method(method: Method) -> reqwest::Method {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(Self::method(request.method), request.url.clone());

			if let Some(bearer) = request.bearer.as_ref() {
				builder = builder.bearer_auth(bearer.expose());
			}
			if let Some(body) = request.body {
				builder =
					builder.header(reqwest::header::CONTENT_TYPE, body.content_type).body(body.bytes);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}
