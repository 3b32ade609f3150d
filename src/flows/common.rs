//! Shared helpers for flow implementations (refresh window, per-user guards, Graph requests).

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserId},
	config,
	graph::TokenIntrospection,
	http::GraphRequest,
};

/// When to refresh a token and how long a refreshed token is assumed to live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshWindow {
	/// Tokens expiring within this horizon are refreshed.
	pub horizon: Duration,
	/// Lifetime recorded for a freshly exchanged long-lived token.
	pub renewed_lifetime: Duration,
}
impl RefreshWindow {
	/// Overrides the refresh horizon; negative values become zero.
	pub fn with_horizon(mut self, horizon: Duration) -> Self {
		self.horizon = horizon.max(Duration::ZERO);

		self
	}

	/// Overrides the renewed token lifetime.
	pub fn with_renewed_lifetime(mut self, lifetime: Duration) -> Self {
		self.renewed_lifetime = lifetime;

		self
	}

	/// Decides whether the introspected token must be exchanged.
	///
	/// Invalid tokens always qualify. Tokens without an expiry never do.
	pub fn needs_refresh(&self, info: &TokenIntrospection, now: OffsetDateTime) -> bool {
		if !info.is_valid {
			return true;
		}

		info.expiry().is_some_and(|expires_at| expires_at - now <= self.horizon)
	}

	/// Expiry recorded for a token refreshed at `now`.
	pub fn renewed_expiry(&self, now: OffsetDateTime) -> OffsetDateTime {
		now + self.renewed_lifetime
	}
}
impl Default for RefreshWindow {
	fn default() -> Self {
		Self { horizon: Duration::days(7), renewed_lifetime: Duration::days(60) }
	}
}

/// Per-user singleflight locks.
///
/// An entry lives only while some task holds or waits on it; the last lease to drop removes it.
#[derive(Clone, Debug, Default)]
pub(crate) struct UserGuards(Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>);
impl UserGuards {
	/// Waits for exclusive access to `user_id`.
	pub(crate) async fn lock(&self, user_id: &UserId) -> UserLease {
		let mutex = self.0.lock().entry(user_id.clone()).or_default().clone();
		let held = mutex.lock_arc().await;

		UserLease { guards: self.clone(), user_id: user_id.clone(), held: Some(held) }
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.0.lock().len()
	}
}

/// Exclusive access to one user, released on drop.
pub(crate) struct UserLease {
	guards: UserGuards,
	user_id: UserId,
	held: Option<MutexGuardArc<()>>,
}
impl Drop for UserLease {
	fn drop(&mut self) {
		drop(self.held.take());

		let mut guards = self.guards.0.lock();

		// Clones are only taken under the map lock, so a count of one means nobody is waiting.
		if guards.get(&self.user_id).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
			guards.remove(&self.user_id);
		}
	}
}

/// Builds a `GET` request under `base` authenticated with `token`.
pub(crate) fn authed_get(base: &Url, segments: &[&str], token: &TokenSecret) -> Result<GraphRequest> {
	Ok(GraphRequest::get(config::endpoint(base, segments)?).query("access_token", token.expose()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn introspection(is_valid: bool, expires_at: Option<i64>) -> TokenIntrospection {
		TokenIntrospection {
			is_valid,
			expires_at,
			app_id: None,
			token_type: None,
			scopes: Vec::new(),
			user_id: None,
		}
	}

	#[test]
	fn refresh_triggers_inside_horizon_or_when_invalid() {
		let window = RefreshWindow::default();
		let now = OffsetDateTime::now_utc();
		let in_days = |days: i64| Some((now + Duration::days(days)).unix_timestamp());

		assert!(window.needs_refresh(&introspection(true, in_days(3)), now));
		assert!(!window.needs_refresh(&introspection(true, in_days(30)), now));
		assert!(window.needs_refresh(&introspection(false, in_days(30)), now));
		assert!(window.needs_refresh(&introspection(true, in_days(-1)), now));
	}

	#[test]
	fn tokens_without_expiry_are_kept() {
		let window = RefreshWindow::default();
		let now = OffsetDateTime::now_utc();

		assert!(!window.needs_refresh(&introspection(true, Some(0)), now));
		assert!(!window.needs_refresh(&introspection(true, None), now));
	}

	#[tokio::test]
	async fn released_guards_are_pruned() {
		let guards = UserGuards::default();
		let user = UserId::new("u1").expect("User fixture should be valid.");
		let first = guards.lock(&user).await;

		assert_eq!(guards.len(), 1);

		drop(first);

		assert_eq!(guards.len(), 0);
	}

	#[tokio::test]
	async fn contended_guard_outlives_first_release() {
		let guards = UserGuards::default();
		let user = UserId::new("u1").expect("User fixture should be valid.");
		let first = guards.lock(&user).await;
		let waiter = {
			let guards = guards.clone();
			let user = user.clone();

			tokio::spawn(async move {
				let _lease = guards.lock(&user).await;
			})
		};

		tokio::task::yield_now().await;
		drop(first);

		assert_eq!(guards.len(), 1, "The waiting task still references the guard.");

		waiter.await.expect("Waiting task should finish.");

		assert_eq!(guards.len(), 0);
	}

	#[test]
	fn authed_requests_keep_base_version_prefix() {
		let base = Url::parse("https://graph.facebook.com/v20.0")
			.expect("Graph base fixture should parse.");
		let token = TokenSecret::new("tok");
		let request = authed_get(&base, &["me", "accounts"], &token)
			.expect("Request against a valid base should build.");

		assert_eq!(
			request.url().as_str(),
			"https://graph.facebook.com/v20.0/me/accounts?access_token=tok"
		);
	}
}
