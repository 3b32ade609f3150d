//! Response bodies returned by the Graph and Instagram messaging endpoints.

// crates.io
use time::{format_description::well_known::Rfc3339, macros::format_description};
// self
use crate::_prelude::*;

/// Error envelope shared by every Graph endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorEnvelope {
	/// Error payload, when present.
	pub error: Option<GraphErrorBody>,
}

/// Inner error object of an [`ErrorEnvelope`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphErrorBody {
	/// Human-readable message.
	pub message: Option<String>,
	/// Error type such as `OAuthException`.
	#[serde(rename = "type")]
	pub error_type: Option<String>,
	/// Numeric error code.
	pub code: Option<i64>,
	/// Numeric error subcode.
	pub error_subcode: Option<i64>,
	/// Trace identifier.
	pub fbtrace_id: Option<String>,
}

/// `debug_token` response wrapper.
#[derive(Clone, Debug, Deserialize)]
pub struct DebugTokenResponse {
	/// Introspection details.
	pub data: TokenIntrospection,
}

/// Token metadata reported by `debug_token`.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenIntrospection {
	/// Whether the platform still accepts the token.
	pub is_valid: bool,
	/// Expiry as epoch seconds; `0` marks a token that never expires.
	pub expires_at: Option<i64>,
	/// Application the token was issued to.
	pub app_id: Option<String>,
	/// Token type (`USER`, `PAGE`, ...).
	#[serde(rename = "type")]
	pub token_type: Option<String>,
	/// Granted scopes.
	#[serde(default)]
	pub scopes: Vec<String>,
	/// Platform user the token belongs to.
	pub user_id: Option<String>,
}
impl TokenIntrospection {
	/// Expiry instant, or `None` for non-expiring tokens and unrepresentable timestamps.
	pub fn expiry(&self) -> Option<OffsetDateTime> {
		self.expires_at
			.filter(|secs| *secs > 0)
			.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
	}
}

/// Token exchange response (`oauth/access_token`).
#[derive(Clone, Deserialize)]
pub struct AccessTokenResponse {
	/// Newly issued token.
	pub access_token: String,
	/// Token type, usually `bearer`.
	pub token_type: Option<String>,
	/// Lifetime in seconds.
	pub expires_in: Option<i64>,
	/// Granted scopes, when reported.
	pub scope: Option<String>,
}
impl Debug for AccessTokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessTokenResponse")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.finish()
	}
}

/// Minimal profile returned by the `/me` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
	/// Platform user id.
	pub id: String,
	/// Username, when requested.
	pub username: Option<String>,
}

/// `me/accounts` response.
#[derive(Clone, Debug, Deserialize)]
pub struct PageList {
	/// Pages the user manages.
	#[serde(default)]
	pub data: Vec<Page>,
}

/// Facebook page managed by the user.
#[derive(Clone, Deserialize)]
pub struct Page {
	/// Page id.
	pub id: String,
	/// Page name.
	pub name: Option<String>,
	/// Page access token.
	pub access_token: Option<String>,
	/// Linked Instagram business account.
	pub instagram_business_account: Option<BusinessAccountRef>,
}
impl Debug for Page {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Page")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("instagram_business_account", &self.instagram_business_account)
			.finish()
	}
}

/// Reference to an Instagram business account.
#[derive(Clone, Debug, Deserialize)]
pub struct BusinessAccountRef {
	/// Instagram business account id.
	pub id: String,
}

/// Instagram business account details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstagramAccount {
	/// Account id.
	pub id: String,
	/// Display name.
	pub name: Option<String>,
	/// Username.
	pub username: Option<String>,
	/// Profile picture URL.
	pub profile_picture_url: Option<String>,
}

/// Page lookup with the nested Instagram business account.
#[derive(Clone, Debug, Deserialize)]
pub struct PageAccount {
	/// Page id.
	pub id: String,
	/// Linked Instagram business account.
	pub instagram_business_account: Option<InstagramAccount>,
}

/// `me/conversations` response.
#[derive(Clone, Debug, Deserialize)]
pub struct ConversationList {
	/// Conversations visible to the account.
	#[serde(default)]
	pub data: Vec<Conversation>,
}

/// Conversation summary.
#[derive(Clone, Debug, Deserialize)]
pub struct Conversation {
	/// Conversation id.
	pub id: String,
	/// Conversation participants.
	pub participants: Option<ParticipantList>,
	/// Most recent message.
	pub last_message: Option<LastMessage>,
}
impl Conversation {
	/// First participant listed by the platform.
	pub fn counterpart(&self) -> Option<&Participant> {
		self.participants.as_ref().and_then(|list| list.data.first())
	}
}

/// Participant collection wrapper.
#[derive(Clone, Debug, Deserialize)]
pub struct ParticipantList {
	/// Participants.
	#[serde(default)]
	pub data: Vec<Participant>,
}

/// Conversation participant.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Participant {
	/// Participant id.
	pub id: String,
	/// Participant username.
	pub username: Option<String>,
}

/// Last message preview on a conversation.
#[derive(Clone, Debug, Deserialize)]
pub struct LastMessage {
	/// Message text.
	pub text: Option<String>,
	/// Raw platform timestamp.
	pub timestamp: Option<String>,
}

/// `{thread}/messages` response.
#[derive(Clone, Debug, Deserialize)]
pub struct MessageList {
	/// Messages in the thread.
	#[serde(default)]
	pub data: Vec<MessagePayload>,
}

/// Message as returned by the platform.
#[derive(Clone, Debug, Deserialize)]
pub struct MessagePayload {
	/// Message id.
	pub id: String,
	/// Message text.
	#[serde(alias = "message")]
	pub text: Option<String>,
	/// Raw platform timestamp.
	#[serde(alias = "created_time")]
	pub timestamp: Option<String>,
	/// Sender.
	pub from: Option<Participant>,
	/// Recipient(s).
	pub to: Option<Recipients>,
}

/// Recipient field, either a single participant or a `data` list.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
	/// Single recipient object.
	One(Participant),
	/// Recipient list.
	Many(ParticipantList),
}
impl Recipients {
	/// First recipient id.
	pub fn first_id(&self) -> Option<&str> {
		match self {
			Self::One(participant) => Some(participant.id.as_str()),
			Self::Many(list) => list.data.first().map(|participant| participant.id.as_str()),
		}
	}
}

/// Send API response.
#[derive(Clone, Debug, Deserialize)]
pub struct SentMessage {
	/// Id of the created message.
	#[serde(alias = "message_id")]
	pub id: String,
	/// Recipient id, when reported.
	pub recipient_id: Option<String>,
}

/// Parses Graph timestamps, accepting RFC 3339 and the `+0000` offset form Graph emits.
pub fn parse_graph_timestamp(raw: &str) -> Option<OffsetDateTime> {
	if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Some(instant);
	}

	let compact = format_description!(
		"[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
	);

	OffsetDateTime::parse(raw, &compact).ok()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn zero_expiry_means_never_expires() {
		let response: DebugTokenResponse = serde_json::from_str(
			r#"{"data":{"app_id":"1234","type":"USER","is_valid":true,"expires_at":0,"scopes":["instagram_basic"]}}"#,
		)
		.expect("Introspection fixture should parse.");

		assert!(response.data.is_valid);
		assert_eq!(response.data.expiry(), None);
		assert_eq!(response.data.scopes, vec!["instagram_basic".to_owned()]);
	}

	#[test]
	fn graph_timestamps_parse_in_both_forms() {
		assert_eq!(
			parse_graph_timestamp("2024-05-01T10:20:30+0000"),
			Some(macros::datetime!(2024-05-01 10:20:30 UTC)),
		);
		assert_eq!(
			parse_graph_timestamp("2024-05-01T10:20:30Z"),
			Some(macros::datetime!(2024-05-01 10:20:30 UTC)),
		);
		assert_eq!(parse_graph_timestamp("yesterday"), None);
	}

	#[test]
	fn recipients_accept_object_or_list() {
		let single: MessagePayload =
			serde_json::from_str(r#"{"id":"m1","message":"hi","to":{"id":"p2"}}"#)
				.expect("Single recipient fixture should parse.");
		let listed: MessagePayload =
			serde_json::from_str(r#"{"id":"m2","text":"yo","to":{"data":[{"id":"p3"}]}}"#)
				.expect("Listed recipient fixture should parse.");

		assert_eq!(single.text.as_deref(), Some("hi"));
		assert_eq!(single.to.as_ref().and_then(Recipients::first_id), Some("p2"));
		assert_eq!(listed.to.as_ref().and_then(Recipients::first_id), Some("p3"));
	}
}
