//! Distance-driven LOD selection.
//!
//! Each LOD owns a `[min, max]` window of squared distances. Windows of
//! adjacent levels overlap so a trigger hovering near a threshold keeps the
//! same answer instead of flickering. When several levels qualify, the
//! finest one wins.
//!
//! ```text
//!  d²:  0 ─────────────────────────────────────────────────►
//!  LOD2 [══════════]                                   (finest)
//!  LOD1        [═════════════════]
//!  LOD0                     [═══════════════════════]  (coarsest)
//!              ▲ overlap ▲
//! ```

use glam::DVec3;
use serde::Deserialize;

use crate::error::ConfigError;

/// Squared-distance window of one LOD.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct LodRange {
  pub min_distance_sq: f64,
  pub max_distance_sq: f64,
}

impl LodRange {
  pub fn new(min_distance_sq: f64, max_distance_sq: f64) -> Self {
    Self {
      min_distance_sq,
      max_distance_sq,
    }
  }

  /// Window from plain (unsquared) distances.
  pub fn from_distances(min: f64, max: f64) -> Self {
    Self::new(min * min, max * max)
  }

  #[inline]
  pub fn contains(&self, distance_sq: f64) -> bool {
    distance_sq >= self.min_distance_sq && distance_sq <= self.max_distance_sq
  }
}

/// Per-LOD distance table, index 0 = coarsest.
#[derive(Clone, Debug, PartialEq)]
pub struct LodSelector {
  ranges: Vec<LodRange>,
}

impl LodSelector {
  pub fn new(ranges: Vec<LodRange>) -> Result<Self, ConfigError> {
    if ranges.is_empty() {
      return Err(ConfigError::Invalid("at least one LOD range is required".into()));
    }
    for (lod, range) in ranges.iter().enumerate() {
      if !(range.min_distance_sq >= 0.0 && range.min_distance_sq <= range.max_distance_sq) {
        return Err(ConfigError::Invalid(format!(
          "LOD {lod} range must satisfy 0 <= min <= max, got {range:?}"
        )));
      }
    }
    Ok(Self { ranges })
  }

  /// Table whose radii double per level from `finest_radius` at the finest
  /// LOD. Each level starts where the next finer one ends, pulled in by
  /// `overlap` (a fraction of that radius).
  pub fn doubling(lod_count: u32, finest_radius: f64, overlap: f64) -> Result<Self, ConfigError> {
    if lod_count == 0 {
      return Err(ConfigError::Invalid("lod_count must be at least 1".into()));
    }
    if !(finest_radius > 0.0) {
      return Err(ConfigError::Invalid("finest_radius must be positive".into()));
    }
    if !(0.0..1.0).contains(&overlap) {
      return Err(ConfigError::Invalid("lod_overlap must be within [0, 1)".into()));
    }

    let finest = lod_count - 1;
    let radius = |lod: u32| finest_radius * (1u64 << (finest - lod)) as f64;
    let ranges = (0..lod_count)
      .map(|lod| {
        let min = if lod == finest {
          0.0
        } else {
          radius(lod + 1) * (1.0 - overlap)
        };
        LodRange::from_distances(min, radius(lod))
      })
      .collect();
    Self::new(ranges)
  }

  #[inline]
  pub fn lod_count(&self) -> u32 {
    self.ranges.len() as u32
  }

  #[inline]
  pub fn ranges(&self) -> &[LodRange] {
    &self.ranges
  }

  /// Largest squared distance at which any level is selected.
  pub fn max_distance_sq(&self) -> f64 {
    self
      .ranges
      .iter()
      .map(|range| range.max_distance_sq)
      .fold(0.0, f64::max)
  }

  /// Minimum squared distance from `point` to any trigger.
  pub fn min_distance_sq(triggers: &[DVec3], point: DVec3) -> Option<f64> {
    triggers
      .iter()
      .map(|trigger| trigger.distance_squared(point))
      .min_by(f64::total_cmp)
  }

  /// Finest level whose window contains `distance_sq`.
  pub fn select_for_distance(&self, distance_sq: f64) -> Option<u32> {
    self
      .ranges
      .iter()
      .rposition(|range| range.contains(distance_sq))
      .map(|lod| lod as u32)
  }

  /// LOD wanted for a block centred at `center`, `None` when out of range.
  pub fn select_lod(&self, triggers: &[DVec3], center: DVec3) -> Option<u32> {
    Self::min_distance_sq(triggers, center).and_then(|d2| self.select_for_distance(d2))
  }
}

#[cfg(test)]
#[path = "lod_test.rs"]
mod lod_test;
