//! Optional observability helpers for credential flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `boop_instagram.flow` with the `flow` and
//!   `stage` (call site) fields, plus events for retries, refreshes, and Graph API failures.
//! - Enable `metrics` to increment the `boop_instagram_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod events;
mod metrics;
mod tracing;

pub use events::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the token manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Stored token verification plus conditional refresh.
	Verify,
	/// Long-lived token exchange.
	Refresh,
	/// Connection check.
	Connection,
	/// OAuth login dialog and callback.
	Authorization,
	/// Conversation and message mirroring.
	Inbox,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Verify => "verify",
			FlowKind::Refresh => "refresh",
			FlowKind::Connection => "connection",
			FlowKind::Authorization => "authorization",
			FlowKind::Inbox => "inbox",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
