//! Engine tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default quiet period of the render coalescing window.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(120);

/// Delay before re-subscribing after the push stream closes.
pub const DEFAULT_RESUBSCRIBE_DELAY: Duration = Duration::from_millis(1000);

/// Runtime configuration of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// Quiet period after the last change before a repaint is emitted.
	pub quiet_period_ms: u64,
	/// Delay before re-subscribing to a closed push stream.
	pub resubscribe_delay_ms: u64,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			quiet_period_ms: DEFAULT_QUIET_PERIOD.as_millis() as u64,
			resubscribe_delay_ms: DEFAULT_RESUBSCRIBE_DELAY.as_millis() as u64,
		}
	}
}

impl EngineConfig {
	/// Silence required after the last change before a repaint.
	pub fn quiet_period(&self) -> Duration {
		Duration::from_millis(self.quiet_period_ms)
	}

	/// Wait between losing the push stream and subscribing again.
	pub fn resubscribe_delay(&self) -> Duration {
		Duration::from_millis(self.resubscribe_delay_ms)
	}
}
