//! Graph API wire types and error classification.
//!
//! Every Graph endpoint reports failures as `{ "error": { "message", "type", "code", ... } }`.
//! [`GraphApiError`] keeps that payload together with the HTTP status and the
//! [`GraphErrorKind`] a [`GraphStrategy`] assigned to it.

pub mod payload;
pub mod strategy;

pub use payload::*;
pub use strategy::*;

// self
use crate::_prelude::*;

/// Message used when an error body cannot be decoded.
pub const GENERIC_API_FAILURE: &str = "API request failed";

/// Non-rate-limit failure reported by a Graph endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphApiError {
	/// HTTP status code of the response.
	pub status: Option<u16>,
	/// Platform-supplied message, surfaced verbatim.
	pub message: String,
	/// Platform error type such as `OAuthException`.
	pub error_type: Option<String>,
	/// Platform error code.
	pub code: Option<i64>,
	/// Platform error subcode.
	pub error_subcode: Option<i64>,
	/// Trace identifier for support requests.
	pub fbtrace_id: Option<String>,
	/// Classification assigned by the active [`GraphStrategy`].
	pub kind: GraphErrorKind,
}
impl GraphApiError {
	/// Builds an error from a decoded body, falling back to the generic message.
	pub fn from_body(status: Option<u16>, body: Option<GraphErrorBody>, kind: GraphErrorKind) -> Self {
		let body = body.unwrap_or_default();

		Self {
			status,
			message: body.message.unwrap_or_else(|| GENERIC_API_FAILURE.into()),
			error_type: body.error_type,
			code: body.code,
			error_subcode: body.error_subcode,
			fbtrace_id: body.fbtrace_id,
			kind,
		}
	}
}
impl Display for GraphApiError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.error_type {
			Some(error_type) => write!(f, "{error_type}: {}", self.message)?,
			None => f.write_str(&self.message)?,
		}

		if let Some(code) = self.code {
			write!(f, " (code {code})")?;
		}

		Ok(())
	}
}
impl StdError for GraphApiError {}
