//! World-space voxel edits.
//!
//! Edits are recorded by the manager and replayed on top of procedural
//! content by every synthesis job whose region they touch, at that job's
//! resolution. Coordinates are finest-LOD voxel units.
//!
//! The [`EditLog`] keeps every edit in application order and indexes it by
//! the roots whose samples it reaches, so a synthesis job only walks the
//! edits of its own root.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{IVec3, UVec3};

use crate::block::BlockGeometry;
use crate::pipeline::SynthesisRegion;
use crate::voxel::{LineSteps, VoxelGrid};

/// Geometric footprint of an edit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditShape {
  /// Voxels on a 3D line, both endpoints included.
  Line { from: IVec3, to: IVec3 },
  /// `height` voxels upwards from `base`.
  Pole { base: IVec3, height: u32 },
  /// Inclusive box.
  Box { min: IVec3, max: IVec3 },
  Sphere { center: IVec3, radius: u32 },
}

/// Density (and optionally material) written over a shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelEdit {
  pub shape: EditShape,
  pub density: u8,
  pub material: Option<u8>,
}

impl VoxelEdit {
  pub fn line(from: IVec3, to: IVec3, density: u8) -> Self {
    Self::new(EditShape::Line { from, to }, density)
  }

  pub fn pole(base: IVec3, height: u32, density: u8) -> Self {
    Self::new(EditShape::Pole { base, height }, density)
  }

  pub fn cuboid(min: IVec3, max: IVec3, density: u8) -> Self {
    Self::new(
      EditShape::Box {
        min: min.min(max),
        max: min.max(max),
      },
      density,
    )
  }

  pub fn sphere(center: IVec3, radius: u32, density: u8) -> Self {
    Self::new(EditShape::Sphere { center, radius }, density)
  }

  fn new(shape: EditShape, density: u8) -> Self {
    Self {
      shape,
      density,
      material: None,
    }
  }

  pub fn with_material(mut self, material: u8) -> Self {
    self.material = Some(material);
    self
  }

  /// Inclusive world bounds of the edit.
  pub fn bounds(&self) -> (IVec3, IVec3) {
    match self.shape {
      EditShape::Line { from, to } => (from.min(to), from.max(to)),
      EditShape::Pole { base, height } => {
        let rise = i32::try_from(height.max(1) - 1).unwrap_or(i32::MAX);
        (base, IVec3::new(base.x, base.y.saturating_add(rise), base.z))
      }
      EditShape::Box { min, max } => (min, max),
      EditShape::Sphere { center, radius } => {
        let r = IVec3::splat(i32::try_from(radius).unwrap_or(i32::MAX));
        (center.saturating_sub(r), center.saturating_add(r))
      }
    }
  }

  /// True when the edit writes inside `region` at the finest resolution.
  pub fn touches(&self, region: &SynthesisRegion) -> bool {
    let (min, max) = self.bounds();
    if !region.overlaps(min, max) {
      return false;
    }
    match self.shape {
      EditShape::Line { from, to } => {
        LineSteps::new(from, to).any(|point| region.overlaps(point, point))
      }
      EditShape::Pole { height, .. } => height > 0,
      _ => true,
    }
  }

  /// Write the edit into `grid`, which samples `region`.
  pub fn apply(&self, region: &SynthesisRegion, grid: &mut VoxelGrid) {
    match self.shape {
      EditShape::Line { from, to } => self.apply_line(region, grid, from, to),
      EditShape::Pole { base, height } => {
        if height == 0 {
          return;
        }
        let (min, max) = self.bounds();
        let column = region.nearest_voxel(base);
        let sample = region.origin + column * region.voxel_scale;
        let bottom = IVec3::new(sample.x, min.y, sample.z);
        let top = IVec3::new(sample.x, max.y, sample.z);
        if let Some((low, high)) = region.voxel_span(bottom, top) {
          self.fill_column(grid, column.x, column.z, low.y, high.y);
        }
      }
      EditShape::Box { min, max } => {
        let Some((low, high)) = region.voxel_span(min, max) else {
          return;
        };
        for z in low.z..=high.z {
          for x in low.x..=high.x {
            self.fill_column(grid, x as i32, z as i32, low.y, high.y);
          }
        }
      }
      EditShape::Sphere { center, radius } => self.apply_sphere(region, grid, center, radius),
    }
  }

  fn apply_line(&self, region: &SynthesisRegion, grid: &mut VoxelGrid, from: IVec3, to: IVec3) {
    let from = region.nearest_voxel(from);
    let to = region.nearest_voxel(to);
    for point in LineSteps::new(from, to) {
      if !grid.contains(point) {
        continue;
      }
      let voxel = point.as_uvec3();
      grid.set_density(voxel, self.density);
      if let Some(material) = self.material {
        grid.set_material(voxel, material);
      }
    }
  }

  fn apply_sphere(&self, region: &SynthesisRegion, grid: &mut VoxelGrid, center: IVec3, radius: u32) {
    let (min, max) = self.bounds();
    let Some((low, high)) = region.voxel_span(min, max) else {
      return;
    };
    let radius_sq = i128::from(radius).pow(2);
    for z in low.z..=high.z {
      for x in low.x..=high.x {
        let world = region.voxel_to_world(UVec3::new(x, 0, z));
        let dx = i128::from(world.x) - i128::from(center.x);
        let dz = i128::from(world.z) - i128::from(center.z);
        let rest = radius_sq - dx * dx - dz * dz;
        if rest < 0 {
          continue;
        }
        let half = (rest as f64).sqrt().floor() as i32;
        let y_min = IVec3::new(world.x, center.y.saturating_sub(half), world.z);
        let y_max = IVec3::new(world.x, center.y.saturating_add(half), world.z);
        if let Some((span_low, span_high)) = region.voxel_span(y_min, y_max) {
          self.fill_column(grid, x as i32, z as i32, span_low.y, span_high.y);
        }
      }
    }
  }

  /// Fill voxels `low..=high` of column (x, z), ignoring columns outside the grid.
  fn fill_column(&self, grid: &mut VoxelGrid, x: i32, z: i32, low: u32, high: u32) {
    if !grid.contains(IVec3::new(x, 0, z)) || low > high {
      return;
    }
    let base = UVec3::new(x as u32, low, z as u32);
    let height = high - low + 1;
    grid.set_pole(base, height, self.density);
    if let Some(material) = self.material {
      grid.set_material_pole(base, height, material);
    }
  }
}

// =============================================================================
// Edit log
// =============================================================================

/// Every edit applied so far, bucketed by root position.
///
/// Edits reaching more than [`EditLog::MAX_BUCKETS`] roots go to a shared
/// list offered to every root instead.
#[derive(Debug)]
pub struct EditLog {
  geometry: BlockGeometry,
  edits: Vec<Arc<VoxelEdit>>,
  /// Indices into `edits`, ascending.
  by_root: HashMap<IVec3, Vec<usize>>,
  /// Indices into `edits`, ascending.
  wide: Vec<usize>,
}

impl EditLog {
  pub const MAX_BUCKETS: u64 = 4096;

  pub fn new(geometry: BlockGeometry) -> Self {
    Self {
      geometry,
      edits: Vec::new(),
      by_root: HashMap::new(),
      wide: Vec::new(),
    }
  }

  pub fn push(&mut self, edit: Arc<VoxelEdit>) {
    let index = self.edits.len();
    let (min, max) = edit.bounds();
    if let Some((low, high)) = self.geometry.roots_sampling(min, max) {
      let roots = (high.as_i64vec3() - low.as_i64vec3() + 1)
        .to_array()
        .iter()
        .fold(1u64, |count, &extent| count.saturating_mul(extent as u64));
      if roots > Self::MAX_BUCKETS {
        self.wide.push(index);
      } else {
        for z in low.z..=high.z {
          for y in low.y..=high.y {
            for x in low.x..=high.x {
              self.by_root.entry(IVec3::new(x, y, z)).or_default().push(index);
            }
          }
        }
      }
    }
    self.edits.push(edit);
  }

  /// Edits that may reach blocks under the root at `position`, oldest first.
  pub fn for_root(&self, position: IVec3) -> impl Iterator<Item = &Arc<VoxelEdit>> + '_ {
    let bucket = self.by_root.get(&position).map_or(&[][..], Vec::as_slice);
    let mut bucket = bucket.iter().copied().peekable();
    let mut wide = self.wide.iter().copied().peekable();
    std::iter::from_fn(move || {
      let index = match (bucket.peek(), wide.peek()) {
        (Some(&local), Some(&shared)) if shared < local => wide.next(),
        (Some(_), _) => bucket.next(),
        (None, _) => wide.next(),
      }?;
      self.edits.get(index)
    })
  }

  #[inline]
  pub fn as_slice(&self) -> &[Arc<VoxelEdit>] {
    &self.edits
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.edits.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.edits.is_empty()
  }

  /// Roots holding at least one bucketed edit.
  #[inline]
  pub fn bucket_count(&self) -> usize {
    self.by_root.len()
  }
}

#[cfg(test)]
#[path = "edit_test.rs"]
mod edit_test;
