//! Stored account credential linking a BOOP user to an Instagram access token.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserId},
	store::StoreError,
};

/// Token type recorded for credentials minted through the Facebook login flow.
pub const DEFAULT_TOKEN_TYPE: &str = "bearer";

/// Persisted record linking a local user to a platform access token.
///
/// At most one record exists per [`UserId`]; stores enforce this by upserting on the user id.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccountCredential {
	/// Owning user.
	pub user_id: UserId,
	/// Long-lived access token; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Token type reported at exchange time.
	pub token_type: String,
	/// Expiry instant recorded locally, if known.
	pub expires_at: Option<OffsetDateTime>,
	/// Granted scope string.
	pub scope: Option<String>,
	/// Facebook page linked to the Instagram business account.
	pub page_id: Option<String>,
	/// Page access token used for page-scoped calls.
	pub page_access_token: Option<TokenSecret>,
	/// Instagram business account id.
	pub instagram_account_id: Option<String>,
	/// Instagram username captured at link time.
	pub username: Option<String>,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Last update instant.
	pub updated_at: OffsetDateTime,
}
impl Debug for AccountCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccountCredential")
			.field("user_id", &self.user_id)
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_at", &self.expires_at)
			.field("scope", &self.scope)
			.field("page_id", &self.page_id)
			.field("page_access_token", &self.page_access_token.as_ref().map(|_| "<redacted>"))
			.field("instagram_account_id", &self.instagram_account_id)
			.field("username", &self.username)
			.field("created_at", &self.created_at)
			.field("updated_at", &self.updated_at)
			.finish()
	}
}

/// Field set applied by [`CredentialStore::upsert`](crate::store::CredentialStore::upsert).
///
/// Fields left as `None` keep their stored value when the record already exists.
#[derive(Clone, Debug, Default)]
pub struct CredentialUpdate {
	/// Replacement access token; required when creating a record.
	pub access_token: Option<TokenSecret>,
	/// Replacement token type.
	pub token_type: Option<String>,
	/// Replacement expiry instant.
	pub expires_at: Option<OffsetDateTime>,
	/// Replacement scope string.
	pub scope: Option<String>,
	/// Replacement page id.
	pub page_id: Option<String>,
	/// Replacement page access token.
	pub page_access_token: Option<TokenSecret>,
	/// Replacement Instagram business account id.
	pub instagram_account_id: Option<String>,
	/// Replacement username.
	pub username: Option<String>,
}
impl CredentialUpdate {
	/// Update emitted after a successful refresh: new token plus renewed expiry.
	pub fn refreshed(token: TokenSecret, expires_at: OffsetDateTime) -> Self {
		Self { access_token: Some(token), expires_at: Some(expires_at), ..Default::default() }
	}

	/// Sets the access token.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the token type.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the scope string.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Sets the linked page id and its access token.
	pub fn page(mut self, page_id: impl Into<String>, page_token: impl Into<String>) -> Self {
		self.page_id = Some(page_id.into());
		self.page_access_token = Some(TokenSecret::new(page_token));

		self
	}

	/// Sets the Instagram business account id and username.
	pub fn instagram_account(mut self, id: impl Into<String>, username: Option<String>) -> Self {
		self.instagram_account_id = Some(id.into());
		self.username = username;

		self
	}

	/// Merges the update into `existing`, or creates a new record when none exists.
	pub fn apply(
		self,
		user_id: &UserId,
		existing: Option<AccountCredential>,
		now: OffsetDateTime,
	) -> Result<AccountCredential, StoreError> {
		match existing {
			Some(mut record) => {
				if let Some(token) = self.access_token {
					record.access_token = token;
				}
				if let Some(token_type) = self.token_type {
					record.token_type = token_type;
				}
				if self.expires_at.is_some() {
					record.expires_at = self.expires_at;
				}
				if self.scope.is_some() {
					record.scope = self.scope;
				}
				if self.page_id.is_some() {
					record.page_id = self.page_id;
				}
				if self.page_access_token.is_some() {
					record.page_access_token = self.page_access_token;
				}
				if self.instagram_account_id.is_some() {
					record.instagram_account_id = self.instagram_account_id;
				}
				if self.username.is_some() {
					record.username = self.username;
				}

				record.updated_at = now;

				Ok(record)
			},
			None => {
				let access_token = self.access_token.ok_or_else(|| StoreError::Incomplete {
					message: format!("Creating a credential for {user_id} requires an access token"),
				})?;

				Ok(AccountCredential {
					user_id: user_id.clone(),
					access_token,
					token_type: self.token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.into()),
					expires_at: self.expires_at,
					scope: self.scope,
					page_id: self.page_id,
					page_access_token: self.page_access_token,
					instagram_account_id: self.instagram_account_id,
					username: self.username,
					created_at: now,
					updated_at: now,
				})
			},
		}
	}
}
