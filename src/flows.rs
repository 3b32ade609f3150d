//! High-level flows built on the [`TokenManager`]: token verification and refresh, connection
//! checks, the OAuth login round trip, and inbox mirroring.

pub mod authorize;
pub mod common;
pub mod connection;
pub mod inbox;
pub mod refresh;

pub use authorize::*;
pub use common::*;
pub use connection::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	config::PlatformConfig,
	graph::GraphStrategy,
	http::GraphHttpClient,
	retry::{Dispatcher, RetryPolicy},
	store::{CredentialStore, InboxStore},
	transport::TransportErrorMapper,
};
#[cfg(feature = "reqwest")]
use crate::{graph::DefaultGraphStrategy, http::ReqwestHttpClient, transport::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Token manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Keeps a user's Instagram credential usable.
///
/// The manager owns the HTTP client, credential store, platform configuration, and failure
/// classifier so individual flows only describe their Graph calls. Verification for one user is
/// serialized through a per-user guard; different users never contend.
#[derive(Clone)]
pub struct TokenManager<C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound Graph request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Credential store.
	pub store: Arc<dyn CredentialStore>,
	/// Optional inbox mirror store; inbox flows skip mirroring without one.
	pub inbox_store: Option<Arc<dyn InboxStore>>,
	/// Validated application credentials and endpoint bases.
	pub config: PlatformConfig,
	/// Strategy classifying Graph failures.
	pub strategy: Arc<dyn GraphStrategy>,
	/// Retry schedule applied by `fetch_with_retry`.
	pub retry_policy: RetryPolicy,
	/// Refresh horizon and renewed token lifetime.
	pub refresh_window: RefreshWindow,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	user_guards: UserGuards,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		config: PlatformConfig,
		strategy: Arc<dyn GraphStrategy>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			inbox_store: None,
			config,
			strategy,
			retry_policy: RetryPolicy::default(),
			refresh_window: RefreshWindow::default(),
			refresh_metrics: Default::default(),
			user_guards: Default::default(),
		}
	}

	/// Replaces the retry schedule.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = policy;

		self
	}

	/// Replaces the refresh horizon and renewed lifetime.
	pub fn with_refresh_window(mut self, window: RefreshWindow) -> Self {
		self.refresh_window = window;

		self
	}

	/// Attaches a store for conversation and message mirrors.
	pub fn with_inbox_store(mut self, store: Arc<dyn InboxStore>) -> Self {
		self.inbox_store = Some(store);

		self
	}

	/// Dispatcher bound to this manager's transport and strategy.
	pub fn dispatcher(&self) -> Dispatcher<'_, C, M> {
		Dispatcher::new(self.http_client.as_ref(), self.transport_mapper.as_ref(), self.strategy.as_ref())
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager with its own reqwest transport and the default Graph strategy.
	pub fn new(store: Arc<dyn CredentialStore>, config: PlatformConfig) -> Self {
		Self::with_http_client(
			store,
			config,
			Arc::new(DefaultGraphStrategy),
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("config", &self.config)
			.field("retry_policy", &self.retry_policy)
			.field("refresh_window", &self.refresh_window)
			.field("inbox_store_set", &self.inbox_store.is_some())
			.finish()
	}
}
