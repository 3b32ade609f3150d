//! Strategy hooks that classify Graph API failures.
//!
//! The retry loop and the connection check only need to know whether a failure is a rate
//! limit, a rejected token, or something else. Keeping that decision behind
//! [`GraphStrategy`] lets tests and alternative platforms swap the heuristics without touching
//! the flows.

// self
use crate::_prelude::*;

/// Error codes Graph uses for application, user, page, and custom rate limits.
pub const RATE_LIMIT_CODES: &[i64] = &[4, 17, 32, 613];
/// Error code for an invalid or expired access token.
pub const INVALID_TOKEN_CODE: i64 = 190;
/// Marker Graph places in authorization failures.
pub const AUTHORIZATION_MARKER: &str = "OAuthException";

/// Strategy hook that classifies Graph failures.
pub trait GraphStrategy: Send + Sync {
	/// Maps an error response into the crate's taxonomy.
	fn classify_error(&self, ctx: &GraphErrorContext) -> GraphErrorKind;

	/// Decides whether a failure message means the user must log in again.
	///
	/// The default looks for [`AUTHORIZATION_MARKER`] anywhere in the message.
	fn requires_reauth(&self, message: &str) -> bool {
		message.contains(AUTHORIZATION_MARKER)
	}
}

/// Canonical Graph failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphErrorKind {
	/// The caller was throttled; retry after a delay.
	RateLimited,
	/// The platform rejected the access token.
	Authorization,
	/// Any other rejection.
	Rejected,
}

/// Primitive data describing a failed response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphErrorContext {
	/// HTTP status code.
	pub http_status: Option<u16>,
	/// Platform error code.
	pub code: Option<i64>,
	/// Platform error type.
	pub error_type: Option<String>,
	/// Whether the response carried a `Retry-After` header.
	pub has_retry_after: bool,
}
impl GraphErrorContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds the HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the platform error code.
	pub fn with_code(mut self, code: i64) -> Self {
		self.code = Some(code);

		self
	}

	/// Adds the platform error type.
	pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
		self.error_type = Some(error_type.into());

		self
	}

	/// Flags the presence of a `Retry-After` header.
	pub fn with_retry_after(mut self, present: bool) -> Self {
		self.has_retry_after = present;

		self
	}
}

/// Default heuristics for the Facebook/Instagram Graph API.
///
/// Rate limits are recognized by [`RATE_LIMIT_CODES`] or by HTTP 429 paired with
/// `Retry-After`; token rejections by code 190 or an `OAuthException` type.
#[derive(Debug, Default)]
pub struct DefaultGraphStrategy;
impl Display for DefaultGraphStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-graph-strategy")
	}
}
impl GraphStrategy for DefaultGraphStrategy {
	fn classify_error(&self, ctx: &GraphErrorContext) -> GraphErrorKind {
		if ctx.code.is_some_and(|code| RATE_LIMIT_CODES.contains(&code)) {
			return GraphErrorKind::RateLimited;
		}
		if ctx.http_status == Some(429) && ctx.has_retry_after {
			return GraphErrorKind::RateLimited;
		}
		if ctx.code == Some(INVALID_TOKEN_CODE)
			|| ctx.error_type.as_deref() == Some(AUTHORIZATION_MARKER)
		{
			return GraphErrorKind::Authorization;
		}

		GraphErrorKind::Rejected
	}
}
