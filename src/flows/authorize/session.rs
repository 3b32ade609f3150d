// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::UserId, config::PlatformConfig};

const STATE_LEN: usize = 32;

/// Login dialog handshake returned by
/// [`TokenManager::start_authorization`](crate::flows::TokenManager::start_authorization).
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	/// Local user starting the login.
	pub user_id: UserId,
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Redirect URI supplied when constructing the dialog URL.
	pub redirect_uri: Url,
	/// Login dialog URL that callers should send end-users to.
	pub authorize_url: Url,
}
impl AuthorizationRequest {
	/// Validates the returned `state` parameter after the redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state {
			Ok(())
		} else {
			Err(Error::Authorization { reason: "state mismatch".into() })
		}
	}
}

/// Query parameters delivered to the redirect URI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorizationCallback {
	/// Authorization code.
	pub code: Option<String>,
	/// Returned state.
	pub state: Option<String>,
	/// Error name, when the user or platform denied the request.
	pub error: Option<String>,
	/// Error description.
	pub error_description: Option<String>,
	/// Error code.
	pub error_code: Option<String>,
	/// Error reason.
	pub error_reason: Option<String>,
}
impl AuthorizationCallback {
	/// Reads the callback parameters from a redirect URL.
	pub fn from_query(url: &Url) -> Self {
		let mut callback = Self::default();

		for (key, value) in url.query_pairs() {
			let slot = match key.as_ref() {
				"code" => &mut callback.code,
				"state" => &mut callback.state,
				"error" => &mut callback.error,
				"error_description" => &mut callback.error_description,
				"error_code" => &mut callback.error_code,
				"error_reason" => &mut callback.error_reason,
				_ => continue,
			};

			*slot = Some(value.into_owned()).filter(|v| !v.is_empty());
		}

		callback
	}

	/// Rejects denied or malformed callbacks, returning the authorization code.
	pub(super) fn accept(&self, request: &AuthorizationRequest) -> Result<String> {
		if let Some(error) = &self.error {
			let description = self.error_description.as_deref().unwrap_or(error);
			let code = self.error_code.as_deref().unwrap_or("none");
			let reason = self.error_reason.as_deref().unwrap_or("none");

			return Err(Error::Authorization {
				reason: format!("Facebook OAuth error: {description} (code: {code}, reason: {reason})"),
			});
		}

		let code = self.code.clone().ok_or_else(|| Error::Authorization {
			reason: "no authorization code received from Facebook".into(),
		})?;

		request.validate_state(self.state.as_deref().unwrap_or_default())?;

		Ok(code)
	}
}

pub(super) fn build_request(
	config: &PlatformConfig,
	user_id: UserId,
	redirect_uri: Url,
) -> AuthorizationRequest {
	let state = random_string(STATE_LEN);
	let authorize_url = build_authorize_url(config, &redirect_uri, &state);

	AuthorizationRequest { user_id, state, redirect_uri, authorize_url }
}

fn build_authorize_url(config: &PlatformConfig, redirect_uri: &Url, state: &str) -> Url {
	let mut url = config.dialog_url.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("client_id", &config.app_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());
	pairs.append_pair("scope", &config.scope_param());
	pairs.append_pair("state", state);
	pairs.append_pair("response_type", "code");
	pairs.append_pair("auth_type", "rerequest");
	pairs.append_pair("display", "popup");
	pairs.append_pair("client_type", "business");
	pairs.append_pair("app_type", "business");

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request() -> AuthorizationRequest {
		AuthorizationRequest {
			user_id: UserId::new("u1").expect("User fixture should be valid."),
			state: "expected".into(),
			redirect_uri: Url::parse("https://boop.example/api/instagram/auth/callback")
				.expect("Redirect URL fixture should parse successfully."),
			authorize_url: Url::parse("https://www.facebook.com/v20.0/dialog/oauth?state=expected")
				.expect("Authorization URL fixture should parse successfully."),
		}
	}

	#[test]
	fn callback_with_code_and_matching_state_is_accepted() {
		let url = Url::parse("https://boop.example/cb?code=abc&state=expected")
			.expect("Callback URL fixture should parse.");
		let code = AuthorizationCallback::from_query(&url)
			.accept(&request())
			.expect("Matching callback should be accepted.");

		assert_eq!(code, "abc");
	}

	#[test]
	fn denied_or_forged_callbacks_are_rejected() {
		let denied = Url::parse(
			"https://boop.example/cb?error=access_denied&error_description=Permissions+error&error_code=200&error_reason=user_denied",
		)
		.expect("Denied callback fixture should parse.");
		let err = AuthorizationCallback::from_query(&denied)
			.accept(&request())
			.expect_err("Denied callback should fail.");

		assert!(err.to_string().contains("Permissions error (code: 200, reason: user_denied)"));

		let forged = Url::parse("https://boop.example/cb?code=abc&state=other")
			.expect("Forged callback fixture should parse.");

		assert!(matches!(
			AuthorizationCallback::from_query(&forged).accept(&request()),
			Err(Error::Authorization { .. })
		));

		let empty = Url::parse("https://boop.example/cb?state=expected")
			.expect("Empty callback fixture should parse.");

		assert!(AuthorizationCallback::from_query(&empty).accept(&request()).is_err());
	}

	#[test]
	fn random_state_has_requested_length() {
		let state = random_string(STATE_LEN);

		assert_eq!(state.len(), STATE_LEN);
		assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
	}
}
