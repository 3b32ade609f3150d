//! Stored token verification with conditional long-lived token exchange.
//!
//! [`TokenManager::verify_and_refresh`] loads the user's credential, asks `debug_token` whether it
//! is still valid, and exchanges it for a new long-lived token when it is invalid or close to
//! expiry. Each call holds a per-user guard, so concurrent verifications for one user perform at
//! most one exchange. Failures never escape: callers receive a [`TokenVerification`] whose
//! `needs_reauth` flag tells them to send the user through login again.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccountCredential, CredentialUpdate, TokenSecret, UserId},
	config,
	error::TransientError,
	flows::TokenManager,
	graph::{AccessTokenResponse, DebugTokenResponse},
	http::{GraphHttpClient, GraphRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	transport::TransportErrorMapper,
};

/// Reported when the user has no stored credential.
pub const TOKEN_NOT_FOUND: &str = "Token not found";
/// Reported when the long-lived token exchange fails.
pub const REFRESH_FAILED: &str = "Failed to refresh token";
/// Reported when verification fails for any other reason.
pub const VERIFY_FAILED: &str = "Failed to verify token";

/// Outcome of [`TokenManager::verify_and_refresh`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenVerification {
	/// Whether a usable token is available.
	pub success: bool,
	/// Usable token, present only on success.
	#[serde(skip)]
	pub token: Option<TokenSecret>,
	/// Human-readable failure, present only on failure.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Whether the user must log in again.
	pub needs_reauth: bool,
	/// Whether the token was exchanged during this call.
	pub refreshed: bool,
}
impl TokenVerification {
	/// Successful verification carrying the stored token.
	pub fn valid(token: TokenSecret) -> Self {
		Self { success: true, token: Some(token), error: None, needs_reauth: false, refreshed: false }
	}

	/// Successful verification carrying a freshly exchanged token.
	pub fn renewed(token: TokenSecret) -> Self {
		Self { refreshed: true, ..Self::valid(token) }
	}

	/// Failed verification; the user must log in again.
	pub fn failed(reason: impl Into<String>) -> Self {
		Self {
			success: false,
			token: None,
			error: Some(reason.into()),
			needs_reauth: true,
			refreshed: false,
		}
	}

	/// Failed verification for an error raised while verifying.
	///
	/// A missing credential reports [`TOKEN_NOT_FOUND`]; anything else reports [`VERIFY_FAILED`].
	pub fn from_error(err: &Error) -> Self {
		match err {
			Error::MissingCredential { .. } => Self::failed(TOKEN_NOT_FOUND),
			_ => Self::failed(VERIFY_FAILED),
		}
	}
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Verifies the user's stored token and refreshes it when needed.
	///
	/// Returns the existing token when introspection reports it valid beyond the refresh
	/// horizon, a new token after a successful exchange, and a failed verification with
	/// `needs_reauth` otherwise. Errors are logged and never propagated.
	pub async fn verify_and_refresh(&self, user_id: &UserId) -> TokenVerification {
		let span = FlowSpan::new(FlowKind::Verify, "verify_and_refresh").user(user_id);
		let result = span
			.instrument(async move {
				let _singleflight = self.user_guards.lock(user_id).await;

				self.verify_locked(user_id).await
			})
			.await;
		let verification = result.unwrap_or_else(|err| {
			if !matches!(err, Error::MissingCredential { .. }) {
				obs::record_api_error("verify_and_refresh", user_id, &err);
			}

			TokenVerification::from_error(&err)
		});

		span.record(if verification.success { FlowOutcome::Success } else { FlowOutcome::Failure });

		verification
	}

	/// Exchanges `current` for a new long-lived token with a single `ig_exchange_token` call.
	///
	/// The platform's error message is surfaced verbatim in the returned error.
	pub async fn refresh_long_lived_token(&self, current: &TokenSecret) -> Result<TokenSecret> {
		let span = FlowSpan::new(FlowKind::Refresh, "refresh_long_lived_token");
		let result = span
			.instrument(async move {
				let request = GraphRequest::get(config::endpoint(
					&self.config.graph_api_url,
					&["oauth", "access_token"],
				)?)
				.query("grant_type", "ig_exchange_token")
				.query("client_secret", self.config.app_secret().expose())
				.query("access_token", current.expose());
				let response = self.dispatcher().send::<AccessTokenResponse>(&request).await?;

				if response.access_token.is_empty() {
					return Err(TransientError::Endpoint {
						message: "Token exchange returned an empty access token".into(),
						status: None,
					}
					.into());
				}

				Ok(TokenSecret::new(response.access_token))
			})
			.await;

		span.record_result(&result);

		result
	}

	/// Asks `debug_token` about `token` using the app access token.
	pub async fn introspect(&self, token: &TokenSecret) -> Result<DebugTokenResponse> {
		let request = GraphRequest::get(config::endpoint(&self.config.graph_api_url, &["debug_token"])?)
			.query("input_token", token.expose())
			.query("access_token", self.config.app_access_token().expose());

		self.dispatcher().fetch_with_retry(&request, &self.retry_policy).await
	}

	async fn verify_locked(&self, user_id: &UserId) -> Result<TokenVerification> {
		let credential = self
			.store
			.find_by_user_id(user_id)
			.await?
			.filter(|record| !record.access_token.is_empty())
			.ok_or_else(|| Error::MissingCredential { user: user_id.to_string() })?;

		let introspection = self.introspect(&credential.access_token).await?;
		let now = OffsetDateTime::now_utc();

		if !self.refresh_window.needs_refresh(&introspection.data, now) {
			return Ok(TokenVerification::valid(credential.access_token));
		}

		self.refresh_and_persist(user_id, &credential, now).await
	}

	async fn refresh_and_persist(
		&self,
		user_id: &UserId,
		credential: &AccountCredential,
		now: OffsetDateTime,
	) -> Result<TokenVerification> {
		self.refresh_metrics.record_attempt();

		let token = match self.refresh_long_lived_token(&credential.access_token).await {
			Ok(token) => token,
			Err(err) => {
				self.refresh_metrics.record_failure();
				obs::record_api_error("refresh_long_lived_token", user_id, &err);

				return Ok(TokenVerification::failed(REFRESH_FAILED));
			},
		};
		let expires_at = self.refresh_window.renewed_expiry(now);

		self.store
			.upsert(user_id, CredentialUpdate::refreshed(token.clone(), expires_at))
			.await
			.inspect_err(|_| self.refresh_metrics.record_failure())?;
		self.refresh_metrics.record_success();
		obs::record_refresh(user_id, expires_at);

		Ok(TokenVerification::renewed(token))
	}
}
