//! Crate-level error types shared across flows, transports, and stores.

// self
use crate::{_prelude::*, graph::GraphApiError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Graph API rejected the request.
	#[error(transparent)]
	Api(#[from] GraphApiError),

	/// No credential is stored for the user.
	#[error("No Instagram credential is stored for user {user}.")]
	MissingCredential {
		/// User identifier that was looked up.
		user: String,
	},
	/// The OAuth callback was denied or malformed.
	#[error("Authorization failed: {reason}.")]
	Authorization {
		/// Platform- or crate-supplied reason string.
		reason: String,
	},
	/// The OAuth exchange succeeded but no usable Instagram business account was found.
	#[error("Instagram account setup is incomplete: {reason}.")]
	AccountSetup {
		/// Reason string describing the missing piece.
		reason: String,
	},
	/// The stored token cannot be made usable without a new login.
	#[error("Instagram reauthorization is required: {reason}.")]
	ReauthRequired {
		/// Reason reported by token verification.
		reason: String,
	},
}
impl Error {
	/// Returns `false` for failures that another attempt cannot fix.
	pub fn is_retryable(&self) -> bool {
		!matches!(self, Self::Config(_) | Self::Storage(_) | Self::MissingCredential { .. })
	}

	/// Returns the `Retry-After` hint carried by a rate-limit failure.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Transient(TransientError::RateLimited { retry_after, .. }) => *retry_after,
			_ => None,
		}
	}

	/// Returns `true` when the failure is a platform rate limit.
	pub fn is_rate_limited(&self) -> bool {
		matches!(self, Self::Transient(TransientError::RateLimited { .. }))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// The platform application identifier is not configured.
	#[error("Instagram app id is not configured.")]
	MissingAppId,
	/// The platform application identifier is not a numeric string.
	#[error("Instagram app id `{value}` is invalid.")]
	InvalidAppId {
		/// Rejected value.
		value: String,
		/// Validation failure.
		#[source]
		source: crate::auth::IdentifierError,
	},
	/// The platform application secret is not configured.
	#[error("Instagram app secret is not configured.")]
	MissingAppSecret,
	/// The Graph API base URL is not configured.
	#[error("Instagram Graph API URL is not configured.")]
	MissingGraphApiUrl,
	/// A configured URL cannot be parsed.
	#[error("Configured URL `{name}` is invalid.")]
	InvalidUrl {
		/// Setting name.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A base URL cannot carry path segments.
	#[error("Base URL `{url}` cannot be extended with path segments.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// The OAuth redirect URI is required but missing.
	#[error("Instagram redirect URI is not configured.")]
	MissingRedirectUri,
	/// A required request field is empty.
	#[error("Required field `{field}` is missing.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// A user identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// The platform throttled the caller.
	#[error("Graph API rate limit reached: {message}.")]
	RateLimited {
		/// Platform-supplied message.
		message: String,
		/// Platform error code, when available.
		code: Option<i64>,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Graph API responded with JSON that does not match the expected shape.
	#[error("Graph API returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The HTTP client failed in a way that is expected to clear up.
	#[error("Graph API call failed: {message}.")]
	Endpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the Graph API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the Graph API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn configuration_failures_are_not_retryable() {
		assert!(!Error::from(ConfigError::MissingAppId).is_retryable());
		assert!(!Error::MissingCredential { user: "u1".into() }.is_retryable());

		let throttled = Error::from(TransientError::RateLimited {
			message: "Application request limit reached".into(),
			code: Some(4),
			status: Some(400),
			retry_after: Some(Duration::seconds(2)),
		});

		assert!(throttled.is_retryable());
		assert!(throttled.is_rate_limited());
		assert_eq!(throttled.retry_after(), Some(Duration::seconds(2)));
	}
}
