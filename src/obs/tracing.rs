// self
use crate::{
	_prelude::*,
	auth::UserId,
	obs::{self, FlowKind, FlowOutcome},
};

/// Future returned by [`FlowSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// One traced run of a flow.
///
/// The span is named `boop_instagram.flow` and carries `flow`, `stage`, and (once known)
/// `user_id` and `outcome`. [`FlowSpan::record`] also feeds the outcome counter, so a flow
/// reports attempts and results through its span alone.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at call site `stage` and records the attempt.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		let this = Self {
			kind,
			span: tracing::info_span!(
				"boop_instagram.flow",
				flow = kind.as_str(),
				stage,
				user_id = tracing::field::Empty,
				outcome = tracing::field::Empty,
			),
		};
		#[cfg(not(feature = "tracing"))]
		let this = {
			let _ = stage;

			Self { kind }
		};

		this.record(FlowOutcome::Attempt);

		this
	}

	/// Tags the span with the user the flow runs for.
	pub fn user(self, user_id: &UserId) -> Self {
		#[cfg(feature = "tracing")]
		self.span.record("user_id", tracing::field::display(user_id));
		#[cfg(not(feature = "tracing"))]
		let _ = user_id;

		self
	}

	/// Flow kind this span reports under.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Records `outcome` on the span and on the outcome counter.
	pub fn record(&self, outcome: FlowOutcome) {
		#[cfg(feature = "tracing")]
		{
			if outcome != FlowOutcome::Attempt {
				self.span.record("outcome", outcome.as_str());
			}
		}

		obs::record_flow_outcome(self.kind, outcome);
	}

	/// Records success or failure from `result`.
	pub fn record_result<T>(&self, result: &Result<T>) {
		self.record(if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure });
	}

	/// Enters the span for a synchronous flow.
	pub fn entered(&self) -> FlowSpanGuard<'_> {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { _entered: self.span.enter() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			FlowSpanGuard { _span: self }
		}
	}

	/// Runs `fut` inside the span without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Guard returned by [`FlowSpan::entered`]; the span stays entered until it drops.
pub struct FlowSpanGuard<'a> {
	#[cfg(feature = "tracing")]
	_entered: tracing::span::Entered<'a>,
	#[cfg(not(feature = "tracing"))]
	_span: &'a FlowSpan,
}
impl Debug for FlowSpanGuard<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn spans_keep_their_flow_kind() {
		let user = UserId::new("u1").expect("User fixture should be valid.");
		let span = FlowSpan::new(FlowKind::Inbox, "threads").user(&user);

		span.record_result(&Ok::<_, Error>(()));

		assert_eq!(span.kind(), FlowKind::Inbox);
		assert_eq!(format!("{:?}", span.entered()), "FlowSpanGuard(..)");
	}

	#[tokio::test]
	async fn instrument_preserves_output() {
		let span = FlowSpan::new(FlowKind::Verify, "verify_and_refresh");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
