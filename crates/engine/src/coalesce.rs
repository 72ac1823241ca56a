//! Render Coalescer: debounces repaint requests into one trailing repaint.

use std::time::{Duration, Instant};

/// Repaint scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalescerState {
	/// No repaint is scheduled.
	Quiescent,
	/// A repaint is scheduled for `deadline`.
	WindowOpen {
		/// Time at which the repaint fires unless another request arrives.
		deadline: Instant,
		/// Requests folded into this window.
		requests: u32,
	},
}

/// Trailing-edge debouncer owning the single repaint deadline of a view.
///
/// Every request pushes the deadline to `now + quiet_period`, so a burst of
/// requests spaced closer than the quiet period yields exactly one repaint,
/// one quiet period after the last request.
#[derive(Debug, Clone)]
pub struct RenderCoalescer {
	quiet_period: Duration,
	state: CoalescerState,
}

impl RenderCoalescer {
	pub fn new(quiet_period: Duration) -> Self {
		Self {
			quiet_period,
			state: CoalescerState::Quiescent,
		}
	}

	/// Opens the window, or restarts it if already open.
	pub fn request(&mut self, now: Instant) {
		let deadline = now + self.quiet_period;
		self.state = match self.state {
			CoalescerState::Quiescent => CoalescerState::WindowOpen { deadline, requests: 1 },
			CoalescerState::WindowOpen { requests, .. } => CoalescerState::WindowOpen {
				deadline,
				requests: requests.saturating_add(1),
			},
		};
	}

	/// Fires the window if its deadline has passed.
	///
	/// Returns true exactly once per window and returns to quiescent.
	pub fn poll(&mut self, now: Instant) -> bool {
		match self.state {
			CoalescerState::WindowOpen { deadline, requests } if now >= deadline => {
				tracing::trace!(requests, "repaint window elapsed");
				self.state = CoalescerState::Quiescent;
				true
			}
			_ => false,
		}
	}

	/// Drops any scheduled repaint.
	pub fn cancel(&mut self) {
		self.state = CoalescerState::Quiescent;
	}

	pub fn deadline(&self) -> Option<Instant> {
		match self.state {
			CoalescerState::Quiescent => None,
			CoalescerState::WindowOpen { deadline, .. } => Some(deadline),
		}
	}

	pub fn is_open(&self) -> bool {
		matches!(self.state, CoalescerState::WindowOpen { .. })
	}

	pub fn state(&self) -> CoalescerState {
		self.state
	}

	pub fn quiet_period(&self) -> Duration {
		self.quiet_period
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const QUIET: Duration = Duration::from_millis(120);

	#[test]
	fn quiescent_until_requested() {
		let mut coalescer = RenderCoalescer::new(QUIET);
		let t0 = Instant::now();
		assert!(!coalescer.poll(t0 + Duration::from_secs(10)));
		assert_eq!(coalescer.deadline(), None);
	}

	#[test]
	fn single_request_fires_once_after_quiet_period() {
		let mut coalescer = RenderCoalescer::new(QUIET);
		let t0 = Instant::now();
		coalescer.request(t0);

		assert!(!coalescer.poll(t0 + Duration::from_millis(119)));
		assert!(coalescer.poll(t0 + QUIET));
		assert!(!coalescer.poll(t0 + QUIET * 2));
		assert_eq!(coalescer.state(), CoalescerState::Quiescent);
	}

	#[test]
	fn each_request_restarts_the_window() {
		let mut coalescer = RenderCoalescer::new(QUIET);
		let t0 = Instant::now();
		for step in 0..10u32 {
			coalescer.request(t0 + Duration::from_millis(100) * step);
		}
		let last = t0 + Duration::from_millis(900);

		assert_eq!(coalescer.deadline(), Some(last + QUIET));
		assert_eq!(
			coalescer.state(),
			CoalescerState::WindowOpen {
				deadline: last + QUIET,
				requests: 10,
			}
		);
		assert!(!coalescer.poll(last + Duration::from_millis(60)));
		assert!(coalescer.poll(last + QUIET));
	}

	#[test]
	fn cancel_discards_the_window() {
		let mut coalescer = RenderCoalescer::new(QUIET);
		let t0 = Instant::now();
		coalescer.request(t0);
		coalescer.cancel();
		assert!(!coalescer.is_open());
		assert!(!coalescer.poll(t0 + QUIET));
	}
}
