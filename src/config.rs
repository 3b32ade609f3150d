//! Platform configuration: application credentials and Graph endpoint bases.
//!
//! [`PlatformConfig`] is validated once at construction so every flow can rely on a numeric app
//! id, a configured secret, and parseable base URLs. Build it explicitly with
//! [`PlatformConfig::builder`] or read the process environment with [`PlatformConfig::from_env`].

// self
use crate::{
	_prelude::*,
	auth::{AppId, TokenSecret},
	error::ConfigError,
};

/// Environment variable holding the numeric Meta app id.
pub const ENV_APP_ID: &str = "INSTAGRAM_APP_ID";
/// Environment variable holding the Meta app secret.
pub const ENV_APP_SECRET: &str = "INSTAGRAM_APP_SECRET";
/// Environment variable holding the Graph API base used for token checks.
pub const ENV_GRAPH_API_URL: &str = "INSTAGRAM_GRAPH_API_URL";
/// Environment variable holding the OAuth redirect URI.
pub const ENV_REDIRECT_URI: &str = "INSTAGRAM_REDIRECT_URI";
/// Environment variable overriding the Facebook Graph base.
pub const ENV_FACEBOOK_GRAPH_URL: &str = "FACEBOOK_GRAPH_API_URL";
/// Environment variable overriding the Facebook login dialog URL.
pub const ENV_DIALOG_URL: &str = "FACEBOOK_DIALOG_URL";
/// Environment variable overriding the Instagram messaging API base.
pub const ENV_MESSAGING_API_URL: &str = "INSTAGRAM_MESSAGING_API_URL";

const DEFAULT_FACEBOOK_GRAPH_URL: &str = "https://graph.facebook.com/v20.0";
const DEFAULT_DIALOG_URL: &str = "https://www.facebook.com/v20.0/dialog/oauth";
const DEFAULT_MESSAGING_API_URL: &str = "https://graph.instagram.com";

/// Scopes requested by the Facebook login dialog.
pub const DEFAULT_SCOPES: &[&str] = &[
	"instagram_basic",
	"instagram_manage_messages",
	"pages_show_list",
	"pages_read_engagement",
	"pages_manage_metadata",
	"pages_messaging",
];

/// Validated application credentials and endpoint bases.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
	/// Numeric Meta application id.
	pub app_id: AppId,
	app_secret: TokenSecret,
	/// Graph API base for `debug_token`, token exchange, and the `/me` call.
	pub graph_api_url: Url,
	/// Facebook Graph base for the code exchange, pages, and page lookups.
	pub facebook_graph_url: Url,
	/// Facebook login dialog URL.
	pub dialog_url: Url,
	/// Instagram messaging API base for conversations and messages.
	pub messaging_api_url: Url,
	/// OAuth redirect URI registered with the app.
	pub redirect_uri: Option<Url>,
	/// Scopes requested during authorization.
	pub scopes: Vec<String>,
}
impl PlatformConfig {
	/// Returns a builder seeded with the default endpoint bases.
	pub fn builder() -> PlatformConfigBuilder {
		PlatformConfigBuilder::default()
	}

	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through `lookup`, treating blank values as missing.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let mut builder = Self::builder();

		if let Some(app_id) = read(ENV_APP_ID) {
			builder = builder.app_id(app_id);
		}
		if let Some(secret) = read(ENV_APP_SECRET) {
			builder = builder.app_secret(secret);
		}
		if let Some(raw) = read(ENV_GRAPH_API_URL) {
			builder = builder.graph_api_url(parse_url(ENV_GRAPH_API_URL, &raw)?);
		}
		if let Some(raw) = read(ENV_REDIRECT_URI) {
			builder = builder.redirect_uri(parse_url(ENV_REDIRECT_URI, &raw)?);
		}
		if let Some(raw) = read(ENV_FACEBOOK_GRAPH_URL) {
			builder = builder.facebook_graph_url(parse_url(ENV_FACEBOOK_GRAPH_URL, &raw)?);
		}
		if let Some(raw) = read(ENV_DIALOG_URL) {
			builder = builder.dialog_url(parse_url(ENV_DIALOG_URL, &raw)?);
		}
		if let Some(raw) = read(ENV_MESSAGING_API_URL) {
			builder = builder.messaging_api_url(parse_url(ENV_MESSAGING_API_URL, &raw)?);
		}

		builder.build()
	}

	/// Returns the app secret. Callers must avoid logging it.
	pub fn app_secret(&self) -> &TokenSecret {
		&self.app_secret
	}

	/// App access token (`{app_id}|{app_secret}`) used by `debug_token`.
	pub fn app_access_token(&self) -> TokenSecret {
		TokenSecret::new(format!("{}|{}", self.app_id, self.app_secret.expose()))
	}

	/// Requested scopes joined the way the login dialog expects.
	pub fn scope_param(&self) -> String {
		self.scopes.join(",")
	}
}

/// Builder for [`PlatformConfig`] values.
#[derive(Debug)]
pub struct PlatformConfigBuilder {
	app_id: Option<String>,
	app_secret: Option<TokenSecret>,
	graph_api_url: Option<Url>,
	facebook_graph_url: Option<Url>,
	dialog_url: Option<Url>,
	messaging_api_url: Option<Url>,
	redirect_uri: Option<Url>,
	scopes: Vec<String>,
}
impl Default for PlatformConfigBuilder {
	fn default() -> Self {
		Self {
			app_id: None,
			app_secret: None,
			graph_api_url: None,
			facebook_graph_url: None,
			dialog_url: None,
			messaging_api_url: None,
			redirect_uri: None,
			scopes: DEFAULT_SCOPES.iter().map(|scope| (*scope).to_owned()).collect(),
		}
	}
}
impl PlatformConfigBuilder {
	/// Sets the raw app id; validated by [`build`](Self::build).
	pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
		self.app_id = Some(app_id.into());

		self
	}

	/// Sets the app secret.
	pub fn app_secret(mut self, secret: impl Into<String>) -> Self {
		self.app_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Sets the Graph API base used for token checks.
	pub fn graph_api_url(mut self, url: Url) -> Self {
		self.graph_api_url = Some(url);

		self
	}

	/// Overrides the Facebook Graph base.
	pub fn facebook_graph_url(mut self, url: Url) -> Self {
		self.facebook_graph_url = Some(url);

		self
	}

	/// Overrides the login dialog URL.
	pub fn dialog_url(mut self, url: Url) -> Self {
		self.dialog_url = Some(url);

		self
	}

	/// Overrides the Instagram messaging API base.
	pub fn messaging_api_url(mut self, url: Url) -> Self {
		self.messaging_api_url = Some(url);

		self
	}

	/// Sets the OAuth redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Replaces the requested scopes.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<PlatformConfig, ConfigError> {
		let raw_app_id = self.app_id.ok_or(ConfigError::MissingAppId)?;
		let app_id = AppId::new(&raw_app_id)
			.map_err(|source| ConfigError::InvalidAppId { value: raw_app_id.clone(), source })?;
		let app_secret =
			self.app_secret.filter(|secret| !secret.is_empty()).ok_or(ConfigError::MissingAppSecret)?;
		let graph_api_url = self.graph_api_url.ok_or(ConfigError::MissingGraphApiUrl)?;
		let facebook_graph_url = match self.facebook_graph_url {
			Some(url) => url,
			None => parse_url(ENV_FACEBOOK_GRAPH_URL, DEFAULT_FACEBOOK_GRAPH_URL)?,
		};
		let dialog_url = match self.dialog_url {
			Some(url) => url,
			None => parse_url(ENV_DIALOG_URL, DEFAULT_DIALOG_URL)?,
		};
		let messaging_api_url = match self.messaging_api_url {
			Some(url) => url,
			None => parse_url(ENV_MESSAGING_API_URL, DEFAULT_MESSAGING_API_URL)?,
		};

		for base in [&graph_api_url, &facebook_graph_url, &messaging_api_url] {
			if base.cannot_be_a_base() {
				return Err(ConfigError::CannotBeABase { url: base.to_string() });
			}
		}

		Ok(PlatformConfig {
			app_id,
			app_secret,
			graph_api_url,
			facebook_graph_url,
			dialog_url,
			messaging_api_url,
			redirect_uri: self.redirect_uri,
			scopes: self.scopes,
		})
	}
}

/// Appends `segments` to `base`, preserving any version prefix already on the base path.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ConfigError> {
	let mut url = base.clone();

	url.set_query(None);

	{
		let mut path = url
			.path_segments_mut()
			.map_err(|_| ConfigError::CannotBeABase { url: base.to_string() })?;

		path.pop_if_empty();
		path.extend(segments);
	}

	Ok(url)
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { name, source })
}
