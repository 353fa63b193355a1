//! Integer 3D line stepping.

use glam::IVec3;

/// Iterator over the voxels of a 3D line, both endpoints included.
///
/// Advances along the dominant axis one voxel per step and accumulates an
/// integer error term for the other two axes.
#[derive(Clone, Debug)]
pub struct LineSteps {
  current: IVec3,
  step: IVec3,
  delta: IVec3,
  error: IVec3,
  dist: i32,
  remaining: i32,
}

impl LineSteps {
  pub fn new(from: IVec3, to: IVec3) -> Self {
    let diff = to - from;
    let delta = diff.abs();
    let dist = delta.max_element();
    Self {
      current: from,
      step: diff.signum(),
      delta,
      error: IVec3::splat(dist / 2),
      dist,
      remaining: dist + 1,
    }
  }

  /// Number of voxels the line visits.
  pub fn point_count(&self) -> usize {
    (self.dist + 1) as usize
  }
}

impl Iterator for LineSteps {
  type Item = IVec3;

  fn next(&mut self) -> Option<IVec3> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    let point = self.current;

    for axis in 0..3 {
      self.error[axis] += self.delta[axis];
      if self.error[axis] >= self.dist && self.delta[axis] != 0 {
        self.error[axis] -= self.dist;
        self.current[axis] += self.step[axis];
      }
    }

    Some(point)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = self.remaining as usize;
    (remaining, Some(remaining))
  }
}

impl ExactSizeIterator for LineSteps {}
