//! Dense logical voxel grid stored as run-length encoded poles.
//!
//! ```text
//!        z
//!       ╱
//!      ┌──┬──┬──┐
//!     ╱  ╱  ╱  ╱│   one density pole + one material pole
//!    ┌──┬──┬──┐ │   per (x, z) column, index = z * width + x
//!    │▓▓│  │  │ │
//!    │▓▓│▓▓│  │╱
//!    └──┴──┴──┘ ── x
//! ```
//!
//! Density 0 is outside, 1 is a zero-volume boundary and anything above 1 is
//! inside, with the magnitude used for sub-voxel surface placement.

use glam::{IVec3, UVec3};

use super::line::LineSteps;
use super::pole::Pole;
use crate::error::GridError;

/// Density of empty space.
pub const DENSITY_VOID: u8 = 0;
/// Density of a zero-thickness boundary.
pub const DENSITY_SURFACE: u8 = 1;
/// Densest possible voxel.
pub const DENSITY_FULL: u8 = u8::MAX;

/// True when `density` counts as solid for ray and transition tests.
#[inline]
pub fn is_solid(density: u8) -> bool {
  density != DENSITY_VOID
}

/// Result of a ray walk crossing from void into solid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RayHit {
  /// Last void voxel before the surface.
  pub outside: IVec3,
  /// First solid voxel.
  pub inside: IVec3,
}

/// Voxel grid of density and material values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
  dims: UVec3,
  clear_density: u8,
  clear_material: u8,
  density: Vec<Pole>,
  material: Vec<Pole>,
}

impl VoxelGrid {
  /// Create an uninitialized grid whose poles will be seeded with `clear_density`.
  pub fn new(clear_density: u8) -> Self {
    Self {
      dims: UVec3::ZERO,
      clear_density,
      clear_material: 0,
      density: Vec::new(),
      material: Vec::new(),
    }
  }

  pub fn with_clear_material(mut self, material: u8) -> Self {
    self.clear_material = material;
    self
  }

  /// Allocate one pole per column, seeded with the clear values.
  ///
  /// Re-initializing with the same dimensions resets the content. Changing
  /// dimensions requires [`clear`](Self::clear) first.
  pub fn initialize(&mut self, width: u32, height: u32, depth: u32) -> Result<(), GridError> {
    let requested = UVec3::new(width, height, depth);
    if requested.min_element() < 2 {
      return Err(GridError::InvalidDimensions(requested));
    }
    if self.is_initialized() && self.dims != requested {
      return Err(GridError::DimensionMismatch {
        current: self.dims,
        requested,
      });
    }

    let columns = (width * depth) as usize;
    self.dims = requested;
    self.density.clear();
    self.density.resize(columns, Pole::new(height, self.clear_density));
    self.material.clear();
    self.material.resize(columns, Pole::new(height, self.clear_material));
    Ok(())
  }

  /// Release all poles; the grid becomes uninitialized.
  pub fn clear(&mut self) {
    self.dims = UVec3::ZERO;
    self.density = Vec::new();
    self.material = Vec::new();
  }

  #[inline]
  pub fn is_initialized(&self) -> bool {
    !self.density.is_empty()
  }

  #[inline]
  pub fn dimensions(&self) -> UVec3 {
    self.dims
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.dims.x
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.dims.y
  }

  #[inline]
  pub fn depth(&self) -> u32 {
    self.dims.z
  }

  #[inline]
  pub fn clear_density(&self) -> u8 {
    self.clear_density
  }

  /// True when `pos` lies inside the grid.
  #[inline]
  pub fn contains(&self, pos: IVec3) -> bool {
    pos.cmpge(IVec3::ZERO).all() && pos.cmplt(self.dims.as_ivec3()).all()
  }

  #[inline]
  fn column(&self, x: u32, z: u32) -> usize {
    assert!(
      x < self.dims.x && z < self.dims.z,
      "voxel column out of bounds: ({x}, {z}) in {}",
      self.dims
    );
    (z * self.dims.x + x) as usize
  }

  // ===========================================================================
  // Point access
  // ===========================================================================

  #[inline]
  pub fn density(&self, pos: UVec3) -> u8 {
    self.density[self.column(pos.x, pos.z)].get(pos.y)
  }

  #[inline]
  pub fn set_density(&mut self, pos: UVec3, density: u8) {
    let column = self.column(pos.x, pos.z);
    self.density[column].set(pos.y, density);
  }

  #[inline]
  pub fn material(&self, pos: UVec3) -> u8 {
    self.material[self.column(pos.x, pos.z)].get(pos.y)
  }

  #[inline]
  pub fn set_material(&mut self, pos: UVec3, material: u8) {
    let column = self.column(pos.x, pos.z);
    self.material[column].set(pos.y, material);
  }

  // ===========================================================================
  // Column access
  // ===========================================================================

  /// Overwrite `height` voxels upwards from `base` with `density`.
  ///
  /// The run is clipped at the top of the grid.
  ///
  /// # Panics
  ///
  /// If `base` lies outside the grid.
  pub fn set_pole(&mut self, base: UVec3, height: u32, density: u8) {
    let (column, end) = self.pole_span(base, height);
    self.density[column].fill(base.y, end, density);
  }

  /// Material counterpart of [`set_pole`](Self::set_pole).
  pub fn set_material_pole(&mut self, base: UVec3, height: u32, material: u8) {
    let (column, end) = self.pole_span(base, height);
    self.material[column].fill(base.y, end, material);
  }

  fn pole_span(&self, base: UVec3, height: u32) -> (usize, u32) {
    assert!(
      base.y < self.dims.y,
      "pole base out of bounds: y={} in {}",
      base.y,
      self.dims
    );
    let column = self.column(base.x, base.z);
    (column, base.y.saturating_add(height).min(self.dims.y))
  }

  #[inline]
  pub fn density_pole(&self, x: u32, z: u32) -> &Pole {
    &self.density[self.column(x, z)]
  }

  #[inline]
  pub fn material_pole(&self, x: u32, z: u32) -> &Pole {
    &self.material[self.column(x, z)]
  }

  // ===========================================================================
  // Lines and rays
  // ===========================================================================

  /// Write `density` to every voxel on the line, endpoints included.
  ///
  /// # Panics
  /// Panics if either endpoint is outside the grid.
  pub fn set_line(&mut self, from: IVec3, to: IVec3, density: u8) {
    self.assert_endpoints(from, to);
    for point in LineSteps::new(from, to) {
      self.set_density(point.as_uvec3(), density);
    }
  }

  /// Material counterpart of [`set_line`](Self::set_line).
  pub fn set_material_line(&mut self, from: IVec3, to: IVec3, material: u8) {
    self.assert_endpoints(from, to);
    for point in LineSteps::new(from, to) {
      self.set_material(point.as_uvec3(), material);
    }
  }

  /// Read densities along the line, endpoints included.
  pub fn get_line(&self, from: IVec3, to: IVec3) -> Vec<u8> {
    self.assert_endpoints(from, to);
    LineSteps::new(from, to)
      .map(|point| self.density(point.as_uvec3()))
      .collect()
  }

  fn assert_endpoints(&self, from: IVec3, to: IVec3) {
    assert!(
      self.contains(from) && self.contains(to),
      "line {from} -> {to} leaves grid {}",
      self.dims
    );
  }

  /// Walk from `pos` along `dir` and report the first void to solid crossing.
  ///
  /// A walk starting inside solid must leave it before it can hit anything.
  /// Voxels outside the grid count as void.
  pub fn intersect(&self, pos: IVec3, dir: IVec3) -> Option<RayHit> {
    let mut last_void = None;
    for point in LineSteps::new(pos, pos + dir) {
      let solid = self.contains(point) && is_solid(self.density(point.as_uvec3()));
      if !solid {
        last_void = Some(point);
      } else if let Some(outside) = last_void {
        return Some(RayHit {
          outside,
          inside: point,
        });
      }
    }
    None
  }

  // ===========================================================================
  // Whole-grid operations
  // ===========================================================================

  /// Deep copy into `dst`, reusing its allocations.
  pub fn get_copy(&self, dst: &mut VoxelGrid) {
    dst.dims = self.dims;
    dst.clear_density = self.clear_density;
    dst.clear_material = self.clear_material;
    dst.density.clone_from(&self.density);
    dst.material.clone_from(&self.material);
  }

  /// True when the grid holds both solid and void voxels.
  pub fn has_transition(&self) -> bool {
    let mut solid = false;
    let mut void = false;
    for pole in &self.density {
      for run in pole.runs() {
        if is_solid(run.value) {
          solid = true;
        } else {
          void = true;
        }
        if solid && void {
          return true;
        }
      }
    }
    false
  }

  /// Total number of density runs, a measure of compression.
  pub fn density_run_count(&self) -> usize {
    self.density.iter().map(Pole::run_count).sum()
  }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
