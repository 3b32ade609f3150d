//! Connection checks: live `/me` check, stored status, and linked account verification.

// self
use crate::{
	_prelude::*,
	auth::UserId,
	flows::{TokenManager, common},
	graph::{INVALID_TOKEN_CODE, PageAccount, Profile},
	http::GraphHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	transport::TransportErrorMapper,
};

/// Reported when the `/me` call fails.
pub const CONNECTION_FAILED: &str = "Failed to verify connection";
/// Reported when no credential is stored.
pub const NO_ACCOUNT: &str = "No Instagram account connected";
/// Reported when the page token was rejected as expired.
pub const TOKEN_EXPIRED: &str = "Token expired";

/// Result of [`TokenManager::check_connection`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
	/// Whether the live `/me` call succeeded.
	pub is_connected: bool,
	/// Human-readable failure, present only when disconnected.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Whether the user must log in again.
	pub needs_reauth: bool,
	/// Profile returned by `/me`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub profile: Option<Profile>,
}
impl ConnectionStatus {
	fn connected(profile: Profile) -> Self {
		Self { is_connected: true, error: None, needs_reauth: false, profile: Some(profile) }
	}

	fn disconnected(error: Option<String>, needs_reauth: bool) -> Self {
		Self { is_connected: false, error, needs_reauth, profile: None }
	}
}

/// Store-only view of a user's link, see [`TokenManager::stored_status`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredStatus {
	/// Whether a credential is stored.
	pub is_connected: bool,
	/// Locally recorded expiry.
	pub expires_at: Option<OffsetDateTime>,
}

/// Linked Facebook page and Instagram business account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccount {
	/// Facebook page id.
	pub page_id: String,
	/// Instagram business account id.
	pub instagram_id: Option<String>,
	/// Instagram username.
	pub username: Option<String>,
	/// Profile picture URL.
	pub profile_picture: Option<String>,
}

/// Result of [`TokenManager::verify_account`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountVerification {
	/// The page token works and the account details were fetched.
	Linked(LinkedAccount),
	/// The user must go through the login flow.
	NeedsLogin {
		/// Why a login is needed.
		reason: String,
	},
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Verifies the token and calls `/me` with it.
	///
	/// A `/me` failure whose message carries the platform's authorization marker sets
	/// `needs_reauth`; other `/me` failures report a connectivity error only.
	pub async fn check_connection(&self, user_id: &UserId) -> ConnectionStatus {
		let span = FlowSpan::new(FlowKind::Connection, "check_connection").user(user_id);
		let status = span
			.instrument(async move {
				let verification = self.verify_and_refresh(user_id).await;
				let Some(token) = verification.token.filter(|_| verification.success) else {
					return ConnectionStatus::disconnected(
						verification.error,
						verification.needs_reauth,
					);
				};
				let fetch_profile = async {
					let request = common::authed_get(&self.config.graph_api_url, &["me"], &token)?
						.query("fields", "id,username");

					self.dispatcher().fetch_with_retry::<Profile>(&request, &self.retry_policy).await
				};

				match fetch_profile.await {
					Ok(profile) => ConnectionStatus::connected(profile),
					Err(err) => {
						obs::record_api_error("check_connection", user_id, &err);

						ConnectionStatus::disconnected(
							Some(CONNECTION_FAILED.into()),
							self.strategy.requires_reauth(&err.to_string()),
						)
					},
				}
			})
			.await;

		span.record(if status.is_connected { FlowOutcome::Success } else { FlowOutcome::Failure });

		status
	}

	/// Reports whether a credential is stored, without any network call.
	pub async fn stored_status(&self, user_id: &UserId) -> Result<StoredStatus> {
		let credential = self.store.find_by_user_id(user_id).await?;

		Ok(StoredStatus {
			is_connected: credential.is_some(),
			expires_at: credential.and_then(|record| record.expires_at),
		})
	}

	/// Fetches the linked page's Instagram business account with the stored page token.
	///
	/// Missing credentials and expired tokens (code 190) yield
	/// [`AccountVerification::NeedsLogin`]; other failures propagate.
	pub async fn verify_account(&self, user_id: &UserId) -> Result<AccountVerification> {
		let span = FlowSpan::new(FlowKind::Connection, "verify_account").user(user_id);
		let result = span
			.instrument(async move {
				let Some(credential) = self.store.find_by_user_id(user_id).await? else {
					return Ok(AccountVerification::NeedsLogin { reason: NO_ACCOUNT.into() });
				};
				let (Some(page_id), Some(page_token)) =
					(credential.page_id, credential.page_access_token)
				else {
					return Ok(AccountVerification::NeedsLogin { reason: NO_ACCOUNT.into() });
				};
				let request =
					common::authed_get(&self.config.facebook_graph_url, &[page_id.as_str()], &page_token)?
						.query(
							"fields",
							"instagram_business_account{id,name,username,profile_picture_url}",
						);

				match self.dispatcher().send::<PageAccount>(&request).await {
					Ok(page) => {
						let account = page.instagram_business_account;

						Ok(AccountVerification::Linked(LinkedAccount {
							page_id,
							instagram_id: account.as_ref().map(|a| a.id.clone()),
							username: account.as_ref().and_then(|a| a.username.clone()),
							profile_picture: account.and_then(|a| a.profile_picture_url),
						}))
					},
					Err(Error::Api(err)) if err.code == Some(INVALID_TOKEN_CODE) => {
						obs::record_api_error("verify_account", user_id, &Error::Api(err));

						Ok(AccountVerification::NeedsLogin { reason: TOKEN_EXPIRED.into() })
					},
					Err(err) => {
						obs::record_api_error("verify_account", user_id, &err);

						Err(err)
					},
				}
			})
			.await;

		span.record(match &result {
			Ok(AccountVerification::Linked(_)) => FlowOutcome::Success,
			_ => FlowOutcome::Failure,
		});

		result
	}
}
