// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for long-lived token exchanges triggered by verification.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of exchanges started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of exchanges whose new token was persisted.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of exchanges that failed or could not be persisted.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_track_each_outcome() {
		let metrics = RefreshMetrics::default();

		metrics.record_attempt();
		metrics.record_attempt();
		metrics.record_success();
		metrics.record_failure();

		assert_eq!((metrics.attempts(), metrics.successes(), metrics.failures()), (2, 1, 1));
	}
}
