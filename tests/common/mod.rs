//! In-process fakes shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Barrier;
// self
use guestbook_client::{
	ApiClient, ClientConfig,
	auth::{CredentialPair, TokenSecret},
	error::TransportError,
	http::{ApiResponse, ApiTransport, PreparedRequest, TransportFuture},
	session::{InvalidationEvent, RefreshFailure, RenewalExchange, RenewalFuture},
	store::{CredentialStore, MemoryPersistence, PersistenceFuture, SessionPersistence},
	url::Url,
};

/// Path that rejects every credential, renewed or not.
pub const ALWAYS_REJECTED: &str = "/always-rejected";
/// Path whose requests never reach a server.
pub const UNREACHABLE: &str = "/unreachable";

/// Fake API that accepts exactly one access credential at a time.
pub struct FakeApi {
	valid: Mutex<String>,
	stale_gate: Option<Barrier>,
	log: Mutex<Vec<(String, Option<String>)>>,
}
impl FakeApi {
	/// Accepts `valid` and rejects everything else immediately.
	pub fn new(valid: &str) -> Arc<Self> {
		Arc::new(Self { valid: Mutex::new(valid.into()), stale_gate: None, log: Default::default() })
	}

	/// Like [`Self::new`], but holds rejections until `rejected` requests have been rejected, so
	/// they all observe the expiry before any renewal starts.
	pub fn gated(valid: &str, rejected: usize) -> Arc<Self> {
		Arc::new(Self {
			valid: Mutex::new(valid.into()),
			stale_gate: Some(Barrier::new(rejected)),
			log: Default::default(),
		})
	}

	/// Rotates the accepted credential.
	pub fn accept(&self, token: &str) {
		*self.valid.lock() = token.into();
	}

	/// Returns `(path, bearer)` for every request received so far.
	pub fn log(&self) -> Vec<(String, Option<String>)> {
		self.log.lock().clone()
	}

	/// Returns the bearers carried by requests to `path`.
	pub fn bearers_for(&self, path: &str) -> Vec<Option<String>> {
		self.log().into_iter().filter(|(p, _)| p == path).map(|(_, bearer)| bearer).collect()
	}
}
impl ApiTransport for FakeApi {
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let path = request.url.path().to_owned();
			let bearer = request.bearer.as_ref().map(|secret| secret.expose().to_owned());

			self.log.lock().push((path.clone(), bearer.clone()));

			if path == UNREACHABLE {
				return Err(TransportError::Io(std::io::Error::new(
					std::io::ErrorKind::ConnectionRefused,
					"connection refused",
				)));
			}

			let accepted =
				path != ALWAYS_REJECTED && bearer.as_deref() == Some(self.valid.lock().as_str());

			if accepted {
				return Ok(ApiResponse::json_body(200, &serde_json::json!({ "path": path })));
			}
			if let Some(gate) = self.stale_gate.as_ref().filter(|_| path != ALWAYS_REJECTED) {
				gate.wait().await;
			}

			Ok(ApiResponse::json_body(401, &serde_json::json!({ "message": "Token expired" })))
		})
	}
}

/// Renewal exchange that rotates the fake API's credential and counts its calls.
pub struct CountingRenewal {
	api: Arc<FakeApi>,
	outcome: Result<CredentialPair, RefreshFailure>,
	calls: AtomicUsize,
}
impl CountingRenewal {
	/// Renews successfully into `pair`.
	pub fn succeeding(api: Arc<FakeApi>, pair: CredentialPair) -> Arc<Self> {
		Arc::new(Self { api, outcome: Ok(pair), calls: AtomicUsize::new(0) })
	}

	/// Fails every renewal with `failure`.
	pub fn failing(api: Arc<FakeApi>, failure: RefreshFailure) -> Arc<Self> {
		Arc::new(Self { api, outcome: Err(failure), calls: AtomicUsize::new(0) })
	}

	/// Returns the number of exchanges performed.
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl RenewalExchange for CountingRenewal {
	fn renew(&self, _: TokenSecret) -> RenewalFuture<'_> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			// Leaves room for late callers to queue behind the exchange.
			tokio::time::sleep(StdDuration::from_millis(20)).await;

			if let Ok(pair) = &self.outcome {
				self.api.accept(pair.access_token.expose());
			}

			self.outcome.clone()
		})
	}
}

/// Memory persistence that counts writes.
#[derive(Default)]
pub struct CountingPersistence {
	inner: MemoryPersistence,
	saves: AtomicUsize,
	clears: AtomicUsize,
}
impl CountingPersistence {
	/// Seeds the backend with `pair`.
	pub fn with_pair(pair: CredentialPair) -> Arc<Self> {
		Arc::new(Self { inner: MemoryPersistence::with_pair(pair), ..Default::default() })
	}

	/// Returns the persisted pair.
	pub fn current(&self) -> Option<CredentialPair> {
		self.inner.current()
	}

	/// Returns the number of saves.
	pub fn saves(&self) -> usize {
		self.saves.load(Ordering::SeqCst)
	}

	/// Returns the number of clears.
	pub fn clears(&self) -> usize {
		self.clears.load(Ordering::SeqCst)
	}
}
impl SessionPersistence for CountingPersistence {
	fn load(&self) -> PersistenceFuture<'_, Option<CredentialPair>> {
		self.inner.load()
	}

	fn save(&self, pair: CredentialPair) -> PersistenceFuture<'_, ()> {
		self.saves.fetch_add(1, Ordering::SeqCst);

		self.inner.save(pair)
	}

	fn clear(&self) -> PersistenceFuture<'_, ()> {
		self.clears.fetch_add(1, Ordering::SeqCst);

		self.inner.clear()
	}
}

/// Fully wired client over the fakes.
pub struct Harness {
	pub client: ApiClient<FakeApi>,
	pub api: Arc<FakeApi>,
	pub renewal: Arc<CountingRenewal>,
	pub persistence: Arc<CountingPersistence>,
	pub notifications: Arc<Mutex<Vec<InvalidationEvent>>>,
}

/// Base URL used by every in-process client.
pub fn base_url() -> Url {
	Url::parse("https://guestbook.test").expect("Base URL fixture should parse.")
}

/// Wires a client whose store starts with `("a0", "r0")`.
pub async fn harness(api: Arc<FakeApi>, renewal: Arc<CountingRenewal>) -> Harness {
	let config = ClientConfig::builder(base_url()).build().expect("Configuration should validate.");
	let persistence = CountingPersistence::with_pair(CredentialPair::new("a0", "r0"));
	let store = Arc::new(
		CredentialStore::open(persistence.clone()).await.expect("Store should open from fixture."),
	);
	let client = ApiClient::with_parts(config, store, api.clone(), renewal.clone());
	let notifications = Arc::new(Mutex::new(Vec::new()));
	let sink = notifications.clone();

	client.on_session_ended(Arc::new(move |event: &InvalidationEvent| {
		sink.lock().push(event.clone());
	}));

	Harness { client, api, renewal, persistence, notifications }
}
