//! Rate limiting for generation jobs.
//!
//! Bounds memory and CPU pressure when many blocks become interesting at
//! once, e.g. after the viewer teleports.

use serde::Deserialize;

/// Scheduling budget for generation jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulingBudget {
	/// Maximum jobs in flight at once (0 = unlimited).
	pub max_in_flight: usize,
	/// Maximum jobs submitted per update (0 = unlimited).
	pub max_submissions_per_update: usize,
}

impl SchedulingBudget {
	/// Default budget with reasonable limits.
	pub const DEFAULT: Self = Self {
		max_in_flight: 64,
		max_submissions_per_update: 16,
	};

	/// Unlimited budget for testing or special cases.
	pub const UNLIMITED: Self = Self {
		max_in_flight: 0,
		max_submissions_per_update: 0,
	};

	/// Check if another job may be submitted.
	#[inline]
	pub fn can_submit(&self, in_flight: usize, submitted_this_update: usize) -> bool {
		(self.max_in_flight == 0 || in_flight < self.max_in_flight)
			&& (self.max_submissions_per_update == 0
				|| submitted_this_update < self.max_submissions_per_update)
	}
}

impl Default for SchedulingBudget {
	fn default() -> Self {
		Self::DEFAULT
	}
}
