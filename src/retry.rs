//! Graph call dispatch with bounded retries.
//!
//! [`Dispatcher::send`] performs one call and classifies failures through the active
//! [`GraphStrategy`]. [`Dispatcher::fetch_with_retry`] repeats it under a [`RetryPolicy`]: rate
//! limits wait for the `Retry-After` hint when the platform sends one, every other retryable
//! failure waits a linear delay, and nothing sleeps after the final attempt.

// crates.io
use oauth2::AsyncHttpClient;
// self
use crate::{
	_prelude::*,
	error::TransientError,
	graph::{
		ErrorEnvelope, GENERIC_API_FAILURE, GraphApiError, GraphErrorContext, GraphErrorKind,
		GraphStrategy,
	},
	http::{GraphHttpClient, GraphRequest, ResponseMetadata},
	obs,
	transport::TransportErrorMapper,
};

/// Bounded retry schedule for Graph calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total number of calls, including the first.
	pub max_attempts: u32,
	/// Delay unit; attempt `n` waits `base_delay * n`.
	pub base_delay: Duration,
	/// Upper bound for any single wait, including `Retry-After` hints.
	pub max_delay: Duration,
}
impl RetryPolicy {
	/// Overrides the attempt budget.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;

		self
	}

	/// Overrides the delay unit.
	pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
		self.base_delay = base_delay;

		self
	}

	/// Overrides the wait ceiling.
	pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
		self.max_delay = max_delay;

		self
	}

	/// Attempt budget, never below one call.
	pub fn attempts(&self) -> u32 {
		self.max_attempts.max(1)
	}

	/// Linear delay after the 1-indexed `attempt`, clamped to `[0, max_delay]`.
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let factor = i32::try_from(attempt).unwrap_or(i32::MAX);
		let delay = self.base_delay.checked_mul(factor).unwrap_or(self.max_delay);

		self.clamp(delay)
	}

	/// Wait before retrying `err` observed on the 1-indexed `attempt`.
	pub fn backoff_for(&self, attempt: u32, err: &Error) -> Duration {
		match err.retry_after() {
			Some(hint) if err.is_rate_limited() => self.clamp(hint),
			_ => self.delay_for(attempt),
		}
	}

	fn clamp(&self, delay: Duration) -> Duration {
		delay.min(self.max_delay).max(Duration::ZERO)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_attempts: 3, base_delay: Duration::seconds(1), max_delay: Duration::seconds(60) }
	}
}

/// Executes [`GraphRequest`]s against a transport and decodes their bodies.
pub struct Dispatcher<'a, C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: &'a C,
	mapper: &'a M,
	strategy: &'a dyn GraphStrategy,
}
impl<'a, C, M> Dispatcher<'a, C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Binds a transport, its error mapper, and the failure classifier.
	pub fn new(http_client: &'a C, mapper: &'a M, strategy: &'a dyn GraphStrategy) -> Self {
		Self { http_client, mapper, strategy }
	}

	/// Performs one call and decodes a successful body into `T`.
	pub async fn send<T>(&self, request: &GraphRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let http_request = request.to_http()?;
		let handle = self.http_client.handle();
		let response = handle
			.call(http_request)
			.await
			.map_err(|err| self.mapper.map_transport_error(None, err))?;
		let meta = ResponseMetadata::from_response(&response);

		if !response.status().is_success() {
			return Err(self.classify_failure(&meta, response.body()));
		}

		decode(response.body(), meta.status)
	}

	/// Calls [`send`](Self::send) until it succeeds, a non-retryable error occurs, or the policy's
	/// attempt budget runs out. Returns the last observed error on exhaustion.
	pub async fn fetch_with_retry<T>(&self, request: &GraphRequest, policy: &RetryPolicy) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let attempts = policy.attempts();
		let mut attempt = 1;

		loop {
			match self.send(request).await {
				Ok(value) => return Ok(value),
				Err(err) if attempt >= attempts || !err.is_retryable() => return Err(err),
				Err(err) => {
					let delay = policy.backoff_for(attempt, &err);

					obs::record_retry(request.path(), attempt, delay, &err);
					tokio::time::sleep(delay.unsigned_abs()).await;

					attempt += 1;
				},
			}
		}
	}

	fn classify_failure(&self, meta: &ResponseMetadata, body: &[u8]) -> Error {
		let detail = serde_json::from_slice::<ErrorEnvelope>(body).ok().and_then(|e| e.error);
		let mut ctx = GraphErrorContext::new().with_retry_after(meta.has_retry_after);

		if let Some(status) = meta.status {
			ctx = ctx.with_http_status(status);
		}
		if let Some(code) = detail.as_ref().and_then(|d| d.code) {
			ctx = ctx.with_code(code);
		}
		if let Some(error_type) = detail.as_ref().and_then(|d| d.error_type.clone()) {
			ctx = ctx.with_error_type(error_type);
		}

		match self.strategy.classify_error(&ctx) {
			GraphErrorKind::RateLimited => TransientError::RateLimited {
				message: detail
					.and_then(|d| d.message)
					.unwrap_or_else(|| GENERIC_API_FAILURE.into()),
				code: ctx.code,
				status: meta.status,
				retry_after: meta.retry_after,
			}
			.into(),
			kind => GraphApiError::from_body(meta.status, detail, kind).into(),
		}
	}
}

fn decode<T>(body: &[u8], status: Option<u16>) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| TransientError::ResponseParse { source, status }.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::graph::Profile;

	fn throttled(retry_after: Option<Duration>) -> Error {
		TransientError::RateLimited {
			message: "User request limit reached".into(),
			code: Some(17),
			status: Some(400),
			retry_after,
		}
		.into()
	}

	#[test]
	fn linear_delay_is_clamped() {
		let policy = RetryPolicy::default().with_max_delay(Duration::seconds(2));

		assert_eq!(policy.delay_for(1), Duration::seconds(1));
		assert_eq!(policy.delay_for(2), Duration::seconds(2));
		assert_eq!(policy.delay_for(5), Duration::seconds(2));
		assert_eq!(policy.delay_for(u32::MAX), Duration::seconds(2));
	}

	#[test]
	fn retry_after_hint_overrides_linear_delay() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.backoff_for(1, &throttled(Some(Duration::seconds(9)))), Duration::seconds(9));
		assert_eq!(
			policy.backoff_for(1, &throttled(Some(Duration::hours(2)))),
			Duration::seconds(60),
			"Hints should never exceed the ceiling."
		);
		assert_eq!(policy.backoff_for(2, &throttled(None)), Duration::seconds(2));
	}

	#[test]
	fn zero_attempt_budget_still_calls_once() {
		assert_eq!(RetryPolicy::default().with_max_attempts(0).attempts(), 1);
	}

	#[test]
	fn decode_reports_offending_field() {
		let err = decode::<Profile>(br#"{"id":7}"#, Some(200))
			.expect_err("A numeric id should fail to decode.");

		match err {
			Error::Transient(TransientError::ResponseParse { source, status }) => {
				assert_eq!(source.path().to_string(), "id");
				assert_eq!(status, Some(200));
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}
}
