//! Transport primitives for Graph API calls.
//!
//! [`GraphHttpClient`] is the crate's only dependency on an HTTP stack. Implementations hand out
//! [`AsyncHttpClient`] handles so the same request/response types (`oauth2::http`) flow through
//! reqwest in production and through fakes in tests. [`GraphRequest`] describes one outbound call
//! and [`ResponseMetadata`] captures the status and `Retry-After` hint the retry loop needs.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderValue, Method,
		header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER},
	},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ConfigError};

/// Abstraction over HTTP transports capable of executing Graph calls.
///
/// Implementations must be `Send + Sync + 'static` so one client can be shared by every
/// [`TokenManager`](crate::flows::TokenManager) clone, and the handles they return must own
/// whatever state the request future needs.
pub trait GraphHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single call.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for the next request.
	fn handle(&self) -> Self::Handle;
}

/// Outbound Graph call: method, URL with query parameters, and an optional JSON body.
#[derive(Clone)]
pub struct GraphRequest {
	method: Method,
	url: Url,
	body: Option<serde_json::Value>,
}
impl GraphRequest {
	/// Builds a `GET` request.
	pub fn get(url: Url) -> Self {
		Self { method: Method::GET, url, body: None }
	}

	/// Builds a `POST` request carrying a JSON body.
	pub fn post_json(url: Url, body: serde_json::Value) -> Self {
		Self { method: Method::POST, url, body: Some(body) }
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: &str, value: &str) -> Self {
		self.url.query_pairs_mut().append_pair(key, value);

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Target URL, including query parameters. Treat as secret: tokens travel in the query.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// URL path without the query, safe for logs.
	pub fn path(&self) -> &str {
		self.url.path()
	}

	/// Converts the request into the transport representation.
	pub fn to_http(&self) -> Result<HttpRequest, ConfigError> {
		let builder = oauth2::http::Request::builder()
			.method(self.method.clone())
			.uri(self.url.as_str())
			.header(ACCEPT, HeaderValue::from_static("application/json"));
		let request = match &self.body {
			Some(body) => builder
				.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
				.body(body.to_string().into_bytes())?,
			None => builder.body(Vec::new())?,
		};

		Ok(request)
	}
}
impl Debug for GraphRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GraphRequest")
			.field("method", &self.method)
			.field("host", &self.url.host_str())
			.field("path", &self.url.path())
			.field("has_body", &self.body.is_some())
			.finish()
	}
}

/// Status and retry hint captured from a response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Whether a `Retry-After` header was present, even if it could not be parsed.
	pub has_retry_after: bool,
}
impl ResponseMetadata {
	/// Extracts metadata from a transport response.
	pub fn from_response(response: &HttpResponse) -> Self {
		let headers = response.headers();

		Self {
			status: Some(response.status().as_u16()),
			retry_after: parse_retry_after(headers),
			has_retry_after: headers.contains_key(RETRY_AFTER),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl GraphHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// Handle returned by [`ReqwestHttpClient`] that satisfies [`AsyncHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Parses `Retry-After` as delta-seconds or an RFC 2822 date in the future.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_seconds_and_dates() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(7)));

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));

		assert_eq!(parse_retry_after(&headers), None, "Past dates carry no delay.");

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);
	}

	#[test]
	fn requests_carry_query_and_json_body() {
		let url = Url::parse("https://graph.instagram.com/t1/messages")
			.expect("Request fixture URL should parse.");
		let request = GraphRequest::post_json(url, serde_json::json!({ "message": "hi" }))
			.query("access_token", "tok");
		let http = request.to_http().expect("Request should convert to transport form.");

		assert_eq!(http.method(), Method::POST);
		assert_eq!(http.uri().query(), Some("access_token=tok"));
		assert_eq!(
			http.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()),
			Some("application/json"),
		);
		assert_eq!(http.body().as_slice(), br#"{"message":"hi"}"#);
		assert!(!format!("{request:?}").contains("tok"));
	}
}
