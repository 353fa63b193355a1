//! Generation pipeline statistics.
//!
//! ```ignore
//! let metrics = manager.pipeline_metrics();
//! println!("mesh avg {:.0}us, {} stale", metrics.mesh_timings_us.average(), metrics.stale);
//! ```

use std::collections::VecDeque;

/// Samples kept per latency window.
pub const LATENCY_SAMPLES: usize = 128;

/// The most recent latency samples, oldest first.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<u64>,
    limit: usize,
    total: u64,
}

impl LatencyWindow {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(limit),
            limit: limit.max(1),
            total: 0,
        }
    }

    pub fn record(&mut self, sample: u64) {
        if self.samples.len() == self.limit {
            if let Some(dropped) = self.samples.pop_front() {
                self.total -= dropped;
            }
        }
        self.samples.push_back(sample);
        self.total += sample;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<u64> {
        self.samples.back().copied()
    }

    /// Mean of the kept samples; 0 when empty.
    pub fn average(&self) -> f64 {
        match self.samples.len() {
            0 => 0.0,
            n => self.total as f64 / n as f64,
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        self.samples
            .iter()
            .fold(None, |acc, &s| match acc {
                None => Some((s, s)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
            })
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::with_limit(LATENCY_SAMPLES)
    }
}

/// Counters and latency history of the generation pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    /// Submit-to-commit latency of voxel jobs, in microseconds.
    pub synthesis_timings_us: LatencyWindow,
    /// Submit-to-commit latency of mesh jobs, in microseconds.
    pub mesh_timings_us: LatencyWindow,
    pub voxel_jobs_submitted: u64,
    pub mesh_jobs_submitted: u64,
    pub committed: u64,
    /// Results dropped because their block changed or vanished.
    pub stale: u64,
    pub failed: u64,
    /// Requests turned away by the scheduling budget.
    pub deferred: u64,
}

impl PipelineMetrics {
    pub fn jobs_submitted(&self) -> u64 {
        self.voxel_jobs_submitted + self.mesh_jobs_submitted
    }
}
