//! Facebook login round trip that links a user to an Instagram business account.
//!
//! [`TokenManager::start_authorization`] builds the login dialog URL and a random `state`.
//! [`TokenManager::complete_authorization`] validates the redirect, exchanges the code, finds the
//! first managed page with a linked Instagram business account, and stores the credential.

mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::{AccountCredential, CredentialUpdate, DEFAULT_TOKEN_TYPE, TokenSecret, UserId},
	config,
	error::ConfigError,
	flows::{TokenManager, common},
	graph::{AccessTokenResponse, InstagramAccount, PageList},
	http::{GraphHttpClient, GraphRequest},
	obs::{self, FlowKind, FlowSpan},
	transport::TransportErrorMapper,
};

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the login dialog URL for `user_id`.
	///
	/// Fails with [`ConfigError::MissingRedirectUri`] when no redirect URI is configured.
	pub fn start_authorization(&self, user_id: UserId) -> Result<AuthorizationRequest> {
		let span = FlowSpan::new(FlowKind::Authorization, "start_authorization").user(&user_id);
		let _entered = span.entered();
		let result: Result<AuthorizationRequest> = self
			.config
			.redirect_uri
			.clone()
			.ok_or_else(|| ConfigError::MissingRedirectUri.into())
			.map(|redirect_uri| session::build_request(&self.config, user_id, redirect_uri));

		span.record_result(&result);

		result
	}

	/// Completes the login started by [`start_authorization`](Self::start_authorization).
	pub async fn complete_authorization(
		&self,
		request: AuthorizationRequest,
		callback: AuthorizationCallback,
	) -> Result<AccountCredential> {
		let span = FlowSpan::new(FlowKind::Authorization, "complete_authorization")
			.user(&request.user_id);
		let result = span.instrument(self.link_account(&request, &callback)).await;

		if let Err(err) = &result {
			obs::record_api_error("complete_authorization", &request.user_id, err);
		}

		span.record_result(&result);

		result
	}

	async fn link_account(
		&self,
		request: &AuthorizationRequest,
		callback: &AuthorizationCallback,
	) -> Result<AccountCredential> {
		let code = callback.accept(request)?;
		let graph = &self.config.facebook_graph_url;
		let exchange = GraphRequest::get(config::endpoint(graph, &["oauth", "access_token"])?)
			.query("client_id", &self.config.app_id)
			.query("client_secret", self.config.app_secret().expose())
			.query("redirect_uri", request.redirect_uri.as_str())
			.query("code", &code);
		let dispatcher = self.dispatcher();
		let token = dispatcher.send::<AccessTokenResponse>(&exchange).await?;
		let user_token = TokenSecret::new(token.access_token);
		let pages = dispatcher
			.send::<PageList>(&common::authed_get(graph, &["me", "accounts"], &user_token)?)
			.await?;

		if pages.data.is_empty() {
			return Err(Error::AccountSetup { reason: "no Facebook pages found for this user".into() });
		}

		let (page, business) = pages
			.data
			.into_iter()
			.find_map(|page| {
				let business = page.instagram_business_account.clone()?;

				Some((page, business))
			})
			.ok_or_else(|| Error::AccountSetup {
				reason: "no Instagram business account found for this user".into(),
			})?;
		let page_token = page.access_token.map(TokenSecret::new).ok_or_else(|| {
			Error::AccountSetup { reason: format!("page {} did not return an access token", page.id) }
		})?;
		let account = dispatcher
			.send::<InstagramAccount>(
				&common::authed_get(graph, &[business.id.as_str()], &page_token)?
					.query("fields", "id,username,profile_picture_url"),
			)
			.await?;
		let now = OffsetDateTime::now_utc();
		let expires_at = token
			.expires_in
			.filter(|secs| *secs > 0)
			.map(|secs| now + Duration::seconds(secs))
			.unwrap_or_else(|| self.refresh_window.renewed_expiry(now));
		let mut update = CredentialUpdate {
			access_token: Some(user_token),
			page_id: Some(page.id),
			page_access_token: Some(page_token),
			..Default::default()
		}
		.token_type(DEFAULT_TOKEN_TYPE)
		.expires_at(expires_at)
		.instagram_account(account.id, account.username);

		if let Some(scope) = token.scope {
			update = update.scope(scope);
		}

		Ok(self.store.upsert(&request.user_id, update).await?)
	}
}
