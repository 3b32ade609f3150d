#![cfg(feature = "reqwest")]

mod common;

// std
use std::{
	collections::VecDeque,
	future::Future,
	io,
	pin::Pin,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use httpmock::prelude::*;
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode};
use time::Duration;
use url::Url;
// self
use boop_instagram::{
	error::{Error, TransportError},
	graph::{DefaultGraphStrategy, Profile},
	http::{GraphHttpClient, GraphRequest, ResponseMetadata},
	retry::{Dispatcher, RetryPolicy},
	transport::{TransportErrorMapper, map_generic_transport_error},
};
use common::*;

type Scripted = Result<(u16, &'static str), io::ErrorKind>;

/// Transport that replays a fixed script of outcomes and counts calls.
#[derive(Clone, Default)]
struct ScriptedClient {
	script: Arc<Mutex<VecDeque<Scripted>>>,
	calls: Arc<AtomicUsize>,
}
impl ScriptedClient {
	fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
		Self { script: Arc::new(Mutex::new(script.into_iter().collect())), ..Default::default() }
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl GraphHttpClient for ScriptedClient {
	type Handle = ScriptedClient;
	type TransportError = io::Error;

	fn handle(&self) -> Self::Handle {
		self.clone()
	}
}
impl<'c> AsyncHttpClient<'c> for ScriptedClient {
	type Error = HttpClientError<io::Error>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, _request: HttpRequest) -> Self::Future {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let next = self.script.lock().expect("Script lock should not be poisoned.").pop_front();

		Box::pin(async move {
			match next {
				Some(Ok((status, body))) => {
					let mut response = HttpResponse::new(body.as_bytes().to_vec());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");

					Ok(response)
				},
				Some(Err(kind)) => Err(HttpClientError::Io(io::Error::from(kind))),
				None => Err(HttpClientError::Other("script exhausted".into())),
			}
		})
	}
}

struct IoMapper;
impl TransportErrorMapper<io::Error> for IoMapper {
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<io::Error>,
	) -> Error {
		match error {
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => map_generic_transport_error(metadata, other),
		}
	}
}

fn profile_request() -> GraphRequest {
	GraphRequest::get(
		Url::parse("https://graph.instagram.com/me").expect("Profile URL fixture should parse."),
	)
	.query("fields", "id,username")
}

#[tokio::test]
async fn transient_failure_then_success_uses_two_attempts() {
	let client = ScriptedClient::new([
		Err(io::ErrorKind::ConnectionReset),
		Ok((200, r#"{"id":"17841400000000000","username":"boop"}"#)),
	]);
	let dispatcher = Dispatcher::new(&client, &IoMapper, &DefaultGraphStrategy);
	let profile = dispatcher
		.fetch_with_retry::<Profile>(&profile_request(), &fast_retry_policy())
		.await
		.expect("Second attempt should succeed.");

	assert_eq!(profile.username.as_deref(), Some("boop"));
	assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn undecodable_success_is_retried_then_reported() {
	let client = ScriptedClient::new([(200, "not json"), (200, "not json"), (200, "not json")].map(Ok));
	let dispatcher = Dispatcher::new(&client, &IoMapper, &DefaultGraphStrategy);
	let err = dispatcher
		.fetch_with_retry::<Profile>(&profile_request(), &fast_retry_policy())
		.await
		.expect_err("Garbage bodies should exhaust the attempts.");

	assert!(err.is_retryable());
	assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn single_attempt_policy_never_retries() {
	let client = ScriptedClient::new([
		Err(io::ErrorKind::TimedOut),
		Ok((200, r#"{"id":"1"}"#)),
	]);
	let dispatcher = Dispatcher::new(&client, &IoMapper, &DefaultGraphStrategy);
	let err = dispatcher
		.fetch_with_retry::<Profile>(
			&profile_request(),
			&fast_retry_policy().with_max_attempts(1),
		)
		.await
		.expect_err("The only attempt fails.");

	assert!(matches!(err, Error::Transport(TransportError::Io(_))));
	assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn rate_limited_calls_exhaust_attempts() {
	let server = MockServer::start_async().await;
	let (manager, _store) = build_test_manager(&server);
	let throttled = server
		.mock_async(|when, then| {
			when.method(GET).path("/ig/me");
			then.status(400)
				.header("content-type", "application/json")
				.body(graph_error_body("Application request limit reached", "OAuthException", 4));
		})
		.await;
	let request = GraphRequest::get(
		Url::parse(&server.url("/ig/me")).expect("Mock profile URL should parse."),
	);
	let err = manager
		.dispatcher()
		.fetch_with_retry::<Profile>(&request, &manager.retry_policy)
		.await
		.expect_err("Persistent throttling should fail.");

	assert!(err.is_rate_limited());
	assert!(err.to_string().contains("Application request limit reached"));

	throttled.assert_calls_async(3).await;
}

#[tokio::test]
async fn zero_retry_after_overrides_long_backoff() {
	let server = MockServer::start_async().await;
	let (manager, _store) = build_test_manager(&server);
	let throttled = server
		.mock_async(|when, then| {
			when.method(GET).path("/ig/me");
			then.status(429).header("retry-after", "0").body("");
		})
		.await;
	let request = GraphRequest::get(
		Url::parse(&server.url("/ig/me")).expect("Mock profile URL should parse."),
	);
	let policy = RetryPolicy::default()
		.with_base_delay(Duration::seconds(30))
		.with_max_delay(Duration::seconds(60));
	let outcome = tokio::time::timeout(
		std::time::Duration::from_secs(10),
		manager.dispatcher().fetch_with_retry::<Profile>(&request, &policy),
	)
	.await
	.expect("Retry-After: 0 should not wait for the linear backoff.");

	assert!(outcome.expect_err("Throttling persists.").is_rate_limited());

	throttled.assert_calls_async(3).await;
}

#[tokio::test]
async fn rejected_call_is_not_retried_by_send() {
	let server = MockServer::start_async().await;
	let (manager, _store) = build_test_manager(&server);
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/ig/me");
			then.status(400)
				.header("content-type", "application/json")
				.body(graph_error_body("Unsupported get request.", "GraphMethodException", 100));
		})
		.await;
	let request = GraphRequest::get(
		Url::parse(&server.url("/ig/me")).expect("Mock profile URL should parse."),
	);
	let err = manager.dispatcher().send::<Profile>(&request).await.expect_err("Rejected call fails.");

	match err {
		Error::Api(api) => {
			assert_eq!(api.code, Some(100));
			assert_eq!(api.status, Some(400));
			assert_eq!(api.message, "Unsupported get request.");
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	rejected.assert_calls_async(1).await;
}
