//! World-space layout of blocks.
//!
//! One world unit is one voxel of the finest LOD. A block at LOD `L` spans
//! `block_size * 2^(lod_count - 1 - L)` units per edge and samples
//! `block_size + overlap` voxels per axis so adjacent blocks share the
//! samples along their common faces.

use glam::{DVec3, I64Vec3, IVec3, UVec3};

use super::BlockAddress;
use crate::bounds::DAabb3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockGeometry {
  /// Voxel cells per block edge.
  pub block_size: u32,
  /// Extra samples past the positive faces.
  pub overlap: u32,
  /// Number of LOD levels.
  pub lod_count: u32,
}

impl BlockGeometry {
  pub fn new(block_size: u32, overlap: u32, lod_count: u32) -> Self {
    debug_assert!(lod_count > 0 && lod_count <= 16);
    debug_assert!(Self::root_sample_extent(block_size, overlap, lod_count) <= i32::MAX as u64);
    Self {
      block_size,
      overlap,
      lod_count,
    }
  }

  /// Finest LOD index.
  #[inline]
  pub fn finest_lod(&self) -> u32 {
    self.lod_count - 1
  }

  /// World units per voxel at `lod`.
  #[inline]
  pub fn voxel_scale(&self, lod: u32) -> i32 {
    1 << (self.finest_lod() - lod)
  }

  /// Edge length of a block at `lod` in world units.
  #[inline]
  pub fn world_size(&self, lod: u32) -> i32 {
    self.block_size as i32 * self.voxel_scale(lod)
  }

  /// Voxel grid dimensions of every block.
  #[inline]
  pub fn grid_dims(&self) -> UVec3 {
    UVec3::splat(self.block_size + self.overlap)
  }

  /// World position of the block's minimum corner.
  #[inline]
  pub fn origin(&self, address: &BlockAddress) -> IVec3 {
    address.position * self.world_size(address.lod)
  }

  #[inline]
  pub fn center(&self, address: &BlockAddress) -> DVec3 {
    let half = self.world_size(address.lod) as f64 * 0.5;
    self.origin(address).as_dvec3() + DVec3::splat(half)
  }

  /// Region the block is responsible for.
  pub fn bounds(&self, address: &BlockAddress) -> DAabb3 {
    let min = self.origin(address).as_dvec3();
    DAabb3::new(min, min + DVec3::splat(self.world_size(address.lod) as f64))
  }

  /// Inclusive world extent of the voxels the block samples, overlap included.
  pub fn sample_extent(&self, address: &BlockAddress) -> (IVec3, IVec3) {
    let origin = self.origin(address);
    (origin, origin + IVec3::splat(self.sample_span(address.lod)))
  }

  /// World distance from a block's first sample to its last along one axis.
  #[inline]
  fn sample_span(&self, lod: u32) -> i32 {
    (self.block_size + self.overlap - 1) as i32 * self.voxel_scale(lod)
  }

  /// Root block containing `world`. Saturates far outside the
  /// [`root_limits`](Self::root_limits).
  pub fn root_containing(&self, world: DVec3) -> IVec3 {
    (world / self.world_size(0) as f64).floor().as_ivec3()
  }

  /// Inclusive range of root positions whose samples all have `i32` world
  /// coordinates. Blocks outside it cannot exist.
  pub fn root_limits(&self) -> (IVec3, IVec3) {
    let size = i64::from(self.world_size(0));
    let low = -(1i64 << 31) / size;
    let high = (i64::from(i32::MAX) - i64::from(self.sample_span(0))) / size;
    (IVec3::splat(low as i32), IVec3::splat(high as i32))
  }

  /// Inclusive range of roots whose samples reach the world box
  /// `[min, max]`, clipped to the [`root_limits`](Self::root_limits).
  /// Every descendant samples within its root's extent.
  pub fn roots_sampling(&self, min: IVec3, max: IVec3) -> Option<(IVec3, IVec3)> {
    let size = I64Vec3::splat(i64::from(self.world_size(0)));
    let span = I64Vec3::splat(i64::from(self.sample_span(0)));
    let (limit_low, limit_high) = self.root_limits();
    let low = (-(span - min.as_i64vec3()).div_euclid(size)).max(limit_low.as_i64vec3());
    let high = max.as_i64vec3().div_euclid(size).min(limit_high.as_i64vec3());
    low.cmple(high).all().then(|| (low.as_ivec3(), high.as_ivec3()))
  }

  #[inline]
  pub fn is_representable_root(&self, position: IVec3) -> bool {
    let (low, high) = self.root_limits();
    position.cmpge(low).all() && position.cmple(high).all()
  }

  /// Largest per-axis sample extent of a root, in world units, for a layout.
  /// Layouts where this exceeds `i32::MAX` cannot address any block.
  pub fn root_sample_extent(block_size: u32, overlap: u32, lod_count: u32) -> u64 {
    (u64::from(block_size) + u64::from(overlap)) << lod_count.saturating_sub(1).min(32)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sizes_double_towards_root() {
    let geometry = BlockGeometry::new(32, 2, 3);
    assert_eq!(geometry.voxel_scale(2), 1);
    assert_eq!(geometry.voxel_scale(0), 4);
    assert_eq!(geometry.world_size(2), 32);
    assert_eq!(geometry.world_size(1), 64);
    assert_eq!(geometry.world_size(0), 128);
    assert_eq!(geometry.grid_dims(), UVec3::splat(34));
  }

  #[test]
  fn test_origin_and_center() {
    let geometry = BlockGeometry::new(32, 2, 2);
    let address = BlockAddress::new(1, IVec3::new(-1, 0, 2));
    assert_eq!(geometry.origin(&address), IVec3::new(-32, 0, 64));
    assert_eq!(geometry.center(&address), DVec3::new(-16.0, 16.0, 80.0));
  }

  #[test]
  fn test_children_tile_parent() {
    let geometry = BlockGeometry::new(16, 2, 3);
    let parent = BlockAddress::new(0, IVec3::new(1, 0, -1));
    let parent_bounds = geometry.bounds(&parent);
    for octant in 0..8 {
      let child_bounds = geometry.bounds(&parent.child(octant));
      assert!(parent_bounds.contains_point(child_bounds.min));
      assert!(parent_bounds.contains_point(child_bounds.max));
      let parent_edge = parent_bounds.max - parent_bounds.min;
      assert_eq!(child_bounds.max - child_bounds.min, parent_edge * 0.5);
    }
  }

  #[test]
  fn test_sample_extent_includes_overlap() {
    let geometry = BlockGeometry::new(32, 2, 1);
    let (min, max) = geometry.sample_extent(&BlockAddress::new(0, IVec3::new(1, 0, 0)));
    assert_eq!(min, IVec3::new(32, 0, 0));
    assert_eq!(max, IVec3::new(65, 33, 33));
  }

  #[test]
  fn test_root_limits_keep_samples_in_i32() {
    let geometry = BlockGeometry::new(32, 2, 8);
    let (low, high) = geometry.root_limits();
    let size = geometry.world_size(0);
    let (_, last) = geometry.sample_extent(&BlockAddress::new(0, high));
    assert!(last.x > i32::MAX - size, "high limit is tight");
    let first = geometry.origin(&BlockAddress::new(0, low));
    assert!(i64::from(first.x) - i64::from(i32::MIN) < i64::from(size), "low limit is tight");
    assert!(geometry.is_representable_root(IVec3::ZERO));
    assert!(!geometry.is_representable_root(high + IVec3::X));
    assert!(!geometry.is_representable_root(geometry.root_containing(DVec3::splat(1.0e10))));
  }

  #[test]
  fn test_roots_sampling_includes_overlap() {
    // Roots are 16 units wide and sample 19 units: [16p, 16p + 18].
    let geometry = BlockGeometry::new(8, 2, 2);
    let point = |x: i32| geometry.roots_sampling(IVec3::new(x, 0, 0), IVec3::new(x, 0, 0));
    assert_eq!(point(5).map(|(low, high)| (low.x, high.x)), Some((0, 0)));
    // y = z = 0 is also the last overlap sample of the roots below.
    assert_eq!(point(5).map(|(low, _)| low.y), Some(-1));
    assert_eq!(point(17).map(|(low, high)| (low.x, high.x)), Some((0, 1)));
    assert_eq!(point(-1).map(|(low, high)| (low.x, high.x)), Some((-1, -1)));
    assert_eq!(point(-13).map(|(low, high)| (low.x, high.x)), Some((-1, -1)));
    assert_eq!(point(-14).map(|(low, high)| (low.x, high.x)), Some((-2, -1)));

    let everything = geometry.roots_sampling(IVec3::splat(i32::MIN), IVec3::splat(i32::MAX));
    assert_eq!(everything, Some(geometry.root_limits()));
  }

  #[test]
  fn test_root_sample_extent() {
    assert_eq!(BlockGeometry::root_sample_extent(32, 2, 1), 34);
    assert_eq!(BlockGeometry::root_sample_extent(32, 2, 8), 34 * 128);
    assert!(BlockGeometry::root_sample_extent(1 << 20, 2, 16) > i32::MAX as u64);
  }

  #[test]
  fn test_root_containing() {
    let geometry = BlockGeometry::new(32, 2, 1);
    assert_eq!(geometry.root_containing(DVec3::new(-0.5, 31.9, 32.0)), IVec3::new(-1, 0, 1));
  }
}
