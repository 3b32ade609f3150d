//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
use reqwest::Client as ReqwestClient;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use boop_instagram::{
	auth::{CredentialUpdate, UserId},
	config::PlatformConfig,
	flows::ReqwestTokenManager,
	graph::DefaultGraphStrategy,
	http::ReqwestHttpClient,
	retry::RetryPolicy,
	store::{CredentialStore, InboxStore, MemoryStore},
	transport::ReqwestTransportErrorMapper,
};

pub const APP_ID: &str = "1234567890";
pub const APP_SECRET: &str = "app-secret";
pub const REDIRECT_PATH: &str = "/api/instagram/auth/callback";

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

fn mock_url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse successfully.")
}

/// Configuration routing every Graph base to a prefix on the mock server.
///
/// `/ig` serves token checks, `/fb` the Facebook Graph, `/msg` the messaging API, and `/dialog`
/// the login dialog.
pub fn test_config(server: &MockServer) -> PlatformConfig {
	PlatformConfig::builder()
		.app_id(APP_ID)
		.app_secret(APP_SECRET)
		.graph_api_url(mock_url(server, "/ig"))
		.facebook_graph_url(mock_url(server, "/fb"))
		.messaging_api_url(mock_url(server, "/msg"))
		.dialog_url(mock_url(server, "/dialog"))
		.redirect_uri(mock_url(server, REDIRECT_PATH))
		.build()
		.expect("Test platform configuration should build successfully.")
}

/// Retry schedule that keeps tests fast while preserving attempt counts.
pub fn fast_retry_policy() -> RetryPolicy {
	RetryPolicy::default()
		.with_base_delay(Duration::milliseconds(1))
		.with_max_delay(Duration::milliseconds(10))
}

/// Constructs a [`ReqwestTokenManager`] backed by an in-memory store (credentials and inbox
/// mirrors) and the reqwest transport.
pub fn build_test_manager(server: &MockServer) -> (ReqwestTokenManager, Arc<MemoryStore>) {
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let inbox: Arc<dyn InboxStore> = store_backend.clone();
	let manager = ReqwestTokenManager::with_http_client(
		store,
		test_config(server),
		Arc::new(DefaultGraphStrategy),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.with_retry_policy(fast_retry_policy())
	.with_inbox_store(inbox);

	(manager, store_backend)
}

pub fn user(id: &str) -> UserId {
	UserId::new(id).expect("User fixture should be valid.")
}

/// Stores `token` for `user_id` with a local expiry `expires_in` from now.
pub async fn seed_credential(store: &MemoryStore, user_id: &UserId, token: &str, expires_in: Duration) {
	store
		.upsert(
			user_id,
			CredentialUpdate::default()
				.access_token(token)
				.expires_at(OffsetDateTime::now_utc() + expires_in)
				.scope("instagram_basic,instagram_manage_messages"),
		)
		.await
		.expect("Failed to seed credential into the store.");
}

/// `debug_token` body reporting `is_valid` and an expiry `expires_in` from now.
pub fn introspection_body(is_valid: bool, expires_in: Duration) -> String {
	let expires_at = (OffsetDateTime::now_utc() + expires_in).unix_timestamp();

	serde_json::json!({
		"data": {
			"app_id": APP_ID,
			"type": "USER",
			"application": "BOOP",
			"expires_at": expires_at,
			"is_valid": is_valid,
			"scopes": ["instagram_basic", "instagram_manage_messages"],
			"user_id": "17841400000000000"
		}
	})
	.to_string()
}

/// Graph error envelope.
pub fn graph_error_body(message: &str, error_type: &str, code: i64) -> String {
	serde_json::json!({
		"error": {
			"message": message,
			"type": error_type,
			"code": code,
			"fbtrace_id": "AbCdEf"
		}
	})
	.to_string()
}
