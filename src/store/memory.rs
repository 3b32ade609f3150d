//! Thread-safe in-memory store for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AccountCredential, CredentialUpdate, UserId},
	store::{CredentialStore, InboxStore, MessageRecord, StoreError, StoreFuture, ThreadRecord},
};

type CredentialMap = Arc<RwLock<HashMap<UserId, AccountCredential>>>;
type ThreadMap = Arc<RwLock<HashMap<String, ThreadRecord>>>;
type MessageMap = Arc<RwLock<HashMap<String, MessageRecord>>>;

/// Keeps credentials and inbox mirrors in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	credentials: CredentialMap,
	threads: ThreadMap,
	messages: MessageMap,
}
impl MemoryStore {
	fn upsert_now(
		map: CredentialMap,
		user_id: UserId,
		update: CredentialUpdate,
	) -> Result<AccountCredential, StoreError> {
		let mut guard = map.write();
		let record = update.apply(&user_id, guard.get(&user_id).cloned(), OffsetDateTime::now_utc())?;

		guard.insert(user_id, record.clone());

		Ok(record)
	}

	fn threads_for_now(map: ThreadMap, user_id: UserId) -> Vec<ThreadRecord> {
		let mut threads = map
			.read()
			.values()
			.filter(|thread| thread.user_id == user_id)
			.cloned()
			.collect::<Vec<_>>();

		threads.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));

		threads
	}

	fn messages_in_now(map: MessageMap, thread_id: String) -> Vec<MessageRecord> {
		let mut messages = map
			.read()
			.values()
			.filter(|message| message.thread_id == thread_id)
			.cloned()
			.collect::<Vec<_>>();

		messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

		messages
	}
}
impl CredentialStore for MemoryStore {
	fn find_by_user_id<'a>(
		&'a self,
		user_id: &'a UserId,
	) -> StoreFuture<'a, Option<AccountCredential>> {
		let map = self.credentials.clone();

		Box::pin(async move { Ok(map.read().get(user_id).cloned()) })
	}

	fn upsert<'a>(
		&'a self,
		user_id: &'a UserId,
		update: CredentialUpdate,
	) -> StoreFuture<'a, AccountCredential> {
		let map = self.credentials.clone();
		let user_id = user_id.to_owned();

		Box::pin(async move { Self::upsert_now(map, user_id, update) })
	}
}
impl InboxStore for MemoryStore {
	fn upsert_thread(&self, record: ThreadRecord) -> StoreFuture<'_, ()> {
		let map = self.threads.clone();

		Box::pin(async move {
			map.write().insert(record.thread_id.clone(), record);

			Ok(())
		})
	}

	fn upsert_message(&self, record: MessageRecord) -> StoreFuture<'_, ()> {
		let map = self.messages.clone();

		Box::pin(async move {
			map.write().insert(record.message_id.clone(), record);

			Ok(())
		})
	}

	fn thread<'a>(&'a self, thread_id: &'a str) -> StoreFuture<'a, Option<ThreadRecord>> {
		let map = self.threads.clone();

		Box::pin(async move { Ok(map.read().get(thread_id).cloned()) })
	}

	fn threads_for<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<ThreadRecord>> {
		let map = self.threads.clone();
		let user_id = user_id.to_owned();

		Box::pin(async move { Ok(Self::threads_for_now(map, user_id)) })
	}

	fn messages_in<'a>(&'a self, thread_id: &'a str) -> StoreFuture<'a, Vec<MessageRecord>> {
		let map = self.messages.clone();
		let thread_id = thread_id.to_owned();

		Box::pin(async move { Ok(Self::messages_in_now(map, thread_id)) })
	}
}
