//! Local mirrors of Instagram conversations and messages.

// self
use crate::{_prelude::*, auth::UserId, store::StoreFuture};

/// Mirrored conversation, unique by `thread_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
	/// Platform conversation id.
	pub thread_id: String,
	/// Owning local user.
	pub user_id: UserId,
	/// Counterpart participant id.
	pub participant_id: Option<String>,
	/// Counterpart username.
	pub participant_name: Option<String>,
	/// Preview of the latest message.
	pub last_message: Option<String>,
	/// Time of the latest message.
	pub last_message_at: Option<OffsetDateTime>,
}

/// Mirrored message, unique by `message_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
	/// Platform message id.
	pub message_id: String,
	/// Conversation the message belongs to.
	pub thread_id: String,
	/// Owning local user.
	pub user_id: UserId,
	/// Sender id.
	pub from_id: Option<String>,
	/// Recipient id.
	pub to_id: Option<String>,
	/// Message text.
	pub content: String,
	/// Send time.
	pub timestamp: OffsetDateTime,
	/// Whether the message has been seen locally.
	pub is_read: bool,
}

/// Persistence contract for inbox mirrors. Upserts replace the record with the same external id.
pub trait InboxStore
where
	Self: Send + Sync,
{
	/// Creates or replaces a thread mirror.
	fn upsert_thread(&self, record: ThreadRecord) -> StoreFuture<'_, ()>;

	/// Creates or replaces a message mirror.
	fn upsert_message(&self, record: MessageRecord) -> StoreFuture<'_, ()>;

	/// Fetches one thread mirror.
	fn thread<'a>(&'a self, thread_id: &'a str) -> StoreFuture<'a, Option<ThreadRecord>>;

	/// Lists the thread mirrors owned by `user_id`, most recent activity first.
	fn threads_for<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<ThreadRecord>>;

	/// Lists the message mirrors of a thread in chronological order.
	fn messages_in<'a>(&'a self, thread_id: &'a str) -> StoreFuture<'a, Vec<MessageRecord>>;
}
