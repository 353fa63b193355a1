//! Run-length encoded vertical voxel column.
//!
//! ```text
//!   y
//!   ▲   runs (value, end)
//!  64 ┤──────────────
//!     │  0           │  (0, 64)
//!  32 ┤──────────────
//!     │  5           │  (5, 32)
//!   0 ┴──────────────
//! ```
//!
//! Each run covers `[previous.end, end)`. The last run always ends at the
//! pole height and two adjacent runs never carry the same value, so the run
//! list is the canonical encoding of the column.

use smallvec::SmallVec;

/// One run of identical values, ending (exclusive) at `end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
  pub value: u8,
  pub end: u32,
}

/// Vertical run-length encoded column of `u8` values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pole {
  runs: SmallVec<[Run; 4]>,
}

impl Pole {
  /// Create a pole of `height` cells all holding `value`.
  ///
  /// # Panics
  /// Panics if `height` is zero.
  pub fn new(height: u32, value: u8) -> Self {
    assert!(height > 0, "pole height must be positive");
    let mut runs = SmallVec::new();
    runs.push(Run { value, end: height });
    Self { runs }
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.runs.last().map_or(0, |run| run.end)
  }

  #[inline]
  pub fn run_count(&self) -> usize {
    self.runs.len()
  }

  /// Raw runs, bottom to top.
  #[inline]
  pub fn runs(&self) -> &[Run] {
    &self.runs
  }

  /// Iterate `(value, start, end)` spans bottom to top.
  pub fn spans(&self) -> impl Iterator<Item = (u8, u32, u32)> + '_ {
    let mut start = 0;
    self.runs.iter().map(move |run| {
      let span = (run.value, start, run.end);
      start = run.end;
      span
    })
  }

  /// True when the whole column holds a single value.
  #[inline]
  pub fn is_uniform(&self) -> bool {
    self.runs.len() == 1
  }

  /// Value at height `y`.
  ///
  /// # Panics
  /// Panics if `y` is outside the pole.
  #[inline]
  pub fn get(&self, y: u32) -> u8 {
    assert!(y < self.height(), "pole read out of bounds: y={y}, height={}", self.height());
    let index = self.runs.partition_point(|run| run.end <= y);
    self.runs[index].value
  }

  #[inline]
  pub fn set(&mut self, y: u32, value: u8) {
    self.fill(y, y + 1, value);
  }

  /// Overwrite `[start, end)` with `value`. Empty ranges are ignored.
  ///
  /// # Panics
  /// Panics if `end` exceeds the pole height.
  pub fn fill(&mut self, start: u32, end: u32, value: u8) {
    let height = self.height();
    assert!(end <= height, "pole write out of bounds: end={end}, height={height}");
    if start >= end {
      return;
    }

    let first = self.runs.partition_point(|run| run.end <= start);
    let last = self.runs.partition_point(|run| run.end <= end - 1);
    let first_start = if first == 0 { 0 } else { self.runs[first - 1].end };
    let first_value = self.runs[first].value;
    let last_run = self.runs[last];

    let mut pieces: SmallVec<[Run; 3]> = SmallVec::new();
    if first_start < start {
      pieces.push(Run { value: first_value, end: start });
    }
    pieces.push(Run { value, end });
    if last_run.end > end {
      pieces.push(last_run);
    }

    self.runs.drain(first..=last);
    self.runs.insert_many(first, pieces);
    self.merge_adjacent();
  }

  /// Reset the whole column to `value`.
  pub fn reset(&mut self, value: u8) {
    let height = self.height();
    self.runs.clear();
    self.runs.push(Run { value, end: height });
  }

  fn merge_adjacent(&mut self) {
    self.runs.dedup_by(|next, prev| {
      if next.value == prev.value {
        prev.end = next.end;
        true
      } else {
        false
      }
    });
  }
}

#[cfg(test)]
#[path = "pole_test.rs"]
mod pole_test;
