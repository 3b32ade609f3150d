// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, auth::UserId};

/// Structured record of a failed Graph interaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiErrorRecord {
	/// RFC 3339 timestamp of the failure.
	pub timestamp: String,
	/// Local user the call was made for.
	pub user_id: String,
	/// Call site label, such as `verify_and_refresh`.
	pub context: String,
	/// Rendered error message.
	pub message: String,
}

/// Logs a Graph API failure with the user and call site, returning the structured record.
pub fn record_api_error(context: &str, user_id: &UserId, err: &Error) -> ApiErrorRecord {
	let now = OffsetDateTime::now_utc();
	let record = ApiErrorRecord {
		timestamp: now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string()),
		user_id: user_id.to_string(),
		context: context.to_owned(),
		message: err.to_string(),
	};

	#[cfg(feature = "tracing")]
	tracing::error!(
		timestamp = %record.timestamp,
		user_id = %record.user_id,
		context = %record.context,
		error = %record.message,
		"Instagram API error."
	);

	record
}

/// Logs a retry decision made by the dispatcher.
pub fn record_retry(path: &str, attempt: u32, delay: Duration, err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::debug!(
		path,
		attempt,
		delay_ms = delay.whole_milliseconds() as u64,
		rate_limited = err.is_rate_limited(),
		error = %err,
		"Graph call failed, retrying."
	);

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (path, attempt, delay, err);
	}
}

/// Logs a completed long-lived token refresh.
pub fn record_refresh(user_id: &UserId, expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::info!(user_id = %user_id, %expires_at, "Instagram token refreshed.");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (user_id, expires_at);
	}
}
