//! Conversation listing, message history, and sending, mirrored into an [`InboxStore`](crate::store::InboxStore).
//!
//! Every call obtains its token through [`TokenManager::verify_and_refresh`], so an expiring
//! token is renewed before the inbox is touched.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserId},
	config,
	error::ConfigError,
	flows::{TokenManager, common},
	graph::{self, Conversation, ConversationList, MessageList, MessagePayload, SentMessage},
	http::{GraphHttpClient, GraphRequest},
	obs::{self, FlowKind, FlowSpan},
	store::{MessageRecord, ThreadRecord},
	transport::TransportErrorMapper,
};

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + GraphHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Lists the user's conversations and mirrors them.
	pub async fn threads(&self, user_id: &UserId) -> Result<Vec<ThreadRecord>> {
		self.inbox_flow("threads", user_id, async {
			let token = self.inbox_token(user_id).await?;
			let request =
				common::authed_get(&self.config.messaging_api_url, &["me", "conversations"], &token)?
					.query("fields", "participants,last_message");
			let list = self
				.dispatcher()
				.fetch_with_retry::<ConversationList>(&request, &self.retry_policy)
				.await?;
			let threads = list
				.data
				.into_iter()
				.map(|conversation| thread_record(user_id, conversation))
				.collect::<Vec<_>>();

			if let Some(store) = &self.inbox_store {
				for thread in &threads {
					store.upsert_thread(thread.clone()).await?;
				}
			}

			Ok(threads)
		})
		.await
	}

	/// Lists a conversation's messages in chronological order and mirrors them as read.
	pub async fn messages(&self, user_id: &UserId, thread_id: &str) -> Result<Vec<MessageRecord>> {
		self.inbox_flow("messages", user_id, async {
			require("thread_id", thread_id)?;

			let token = self.inbox_token(user_id).await?;
			let request =
				common::authed_get(&self.config.messaging_api_url, &[thread_id, "messages"], &token)?;
			let list = self
				.dispatcher()
				.fetch_with_retry::<MessageList>(&request, &self.retry_policy)
				.await?;
			let now = OffsetDateTime::now_utc();
			let mut messages = list
				.data
				.into_iter()
				.map(|payload| message_record(user_id, thread_id, payload, now))
				.collect::<Vec<_>>();

			messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

			if let Some(store) = &self.inbox_store {
				for message in &messages {
					store.upsert_message(message.clone()).await?;
				}
			}

			Ok(messages)
		})
		.await
	}

	/// Sends `text` to a conversation, mirrors the sent message, and updates the thread preview.
	pub async fn send_message(
		&self,
		user_id: &UserId,
		thread_id: &str,
		text: &str,
	) -> Result<MessageRecord> {
		self.inbox_flow("send_message", user_id, async {
			require("thread_id", thread_id)?;
			require("message", text)?;

			let token = self.inbox_token(user_id).await?;
			let request = GraphRequest::post_json(
				config::endpoint(&self.config.messaging_api_url, &[thread_id, "messages"])?,
				serde_json::json!({ "message": text }),
			)
			.query("access_token", token.expose());
			let sent = self.dispatcher().send::<SentMessage>(&request).await?;
			let now = OffsetDateTime::now_utc();
			let existing = match &self.inbox_store {
				Some(store) => store.thread(thread_id).await?,
				None => None,
			};
			let to_id = sent
				.recipient_id
				.or_else(|| existing.as_ref().and_then(|thread| thread.participant_id.clone()));
			let message = MessageRecord {
				message_id: sent.id,
				thread_id: thread_id.to_owned(),
				user_id: user_id.clone(),
				from_id: Some(user_id.to_string()),
				to_id,
				content: text.to_owned(),
				timestamp: now,
				is_read: true,
			};

			if let Some(store) = &self.inbox_store {
				store.upsert_message(message.clone()).await?;
				store.upsert_thread(touch_thread(existing, user_id, thread_id, text, now)).await?;
			}

			Ok(message)
		})
		.await
	}

	async fn inbox_flow<T, F>(&self, stage: &'static str, user_id: &UserId, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let span = FlowSpan::new(FlowKind::Inbox, stage).user(user_id);
		let result = span.instrument(fut).await;

		if let Err(err) = &result {
			obs::record_api_error(stage, user_id, err);
		}

		span.record_result(&result);

		result
	}

	async fn inbox_token(&self, user_id: &UserId) -> Result<TokenSecret> {
		let verification = self.verify_and_refresh(user_id).await;

		match verification.token {
			Some(token) if verification.success => Ok(token),
			_ => Err(Error::ReauthRequired {
				reason: verification.error.unwrap_or_else(|| "token unavailable".into()),
			}),
		}
	}
}

fn require(field: &'static str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(ConfigError::MissingField { field }.into());
	}

	Ok(())
}

fn thread_record(user_id: &UserId, conversation: Conversation) -> ThreadRecord {
	let counterpart = conversation.counterpart().cloned();
	let last = conversation.last_message;

	ThreadRecord {
		thread_id: conversation.id,
		user_id: user_id.clone(),
		participant_id: counterpart.as_ref().map(|p| p.id.clone()),
		participant_name: counterpart.and_then(|p| p.username),
		last_message_at: last
			.as_ref()
			.and_then(|m| m.timestamp.as_deref())
			.and_then(graph::parse_graph_timestamp),
		last_message: last.and_then(|m| m.text),
	}
}

fn message_record(
	user_id: &UserId,
	thread_id: &str,
	payload: MessagePayload,
	fallback_time: OffsetDateTime,
) -> MessageRecord {
	MessageRecord {
		timestamp: payload
			.timestamp
			.as_deref()
			.and_then(graph::parse_graph_timestamp)
			.unwrap_or(fallback_time),
		to_id: payload.to.as_ref().and_then(|to| to.first_id()).map(str::to_owned),
		from_id: payload.from.map(|from| from.id),
		message_id: payload.id,
		thread_id: thread_id.to_owned(),
		user_id: user_id.clone(),
		content: payload.text.unwrap_or_default(),
		is_read: true,
	}
}

fn touch_thread(
	existing: Option<ThreadRecord>,
	user_id: &UserId,
	thread_id: &str,
	text: &str,
	now: OffsetDateTime,
) -> ThreadRecord {
	let mut thread = existing.unwrap_or_else(|| ThreadRecord {
		thread_id: thread_id.to_owned(),
		user_id: user_id.clone(),
		participant_id: None,
		participant_name: None,
		last_message: None,
		last_message_at: None,
	});

	thread.last_message = Some(text.to_owned());
	thread.last_message_at = Some(now);

	thread
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn user() -> UserId {
		UserId::new("u1").expect("User fixture should be valid.")
	}

	#[test]
	fn conversations_map_to_thread_mirrors() {
		let conversation: Conversation = serde_json::from_str(
			r#"{"id":"t1","participants":{"data":[{"id":"p1","username":"ana"},{"id":"me"}]},"last_message":{"text":"oi","timestamp":"2024-05-01T10:20:30+0000"}}"#,
		)
		.expect("Conversation fixture should parse.");
		let thread = thread_record(&user(), conversation);

		assert_eq!(thread.participant_id.as_deref(), Some("p1"));
		assert_eq!(thread.participant_name.as_deref(), Some("ana"));
		assert_eq!(thread.last_message.as_deref(), Some("oi"));
		assert!(thread.last_message_at.is_some());
	}

	#[test]
	fn blank_fields_are_rejected() {
		assert!(matches!(
			require("message", "  "),
			Err(Error::Config(ConfigError::MissingField { field: "message" }))
		));
		assert!(require("message", "hello").is_ok());
	}

	#[test]
	fn sending_into_unknown_thread_creates_preview() {
		let now = OffsetDateTime::now_utc();
		let thread = touch_thread(None, &user(), "t9", "hello", now);

		assert_eq!(thread.thread_id, "t9");
		assert_eq!(thread.last_message.as_deref(), Some("hello"));
		assert_eq!(thread.last_message_at, Some(now));
	}
}
