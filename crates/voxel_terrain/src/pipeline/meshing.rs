//! Mesh building: surface nets over committed voxels, plus seam handling.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ MeshInput { voxels, neighbours_lod, parent_voxels, ... }            │
//! │        │                                                            │
//! │        ▼                                                            │
//! │  density poles ──► SDF (void = +1, full = -1)                       │
//! │        │                                                            │
//! │        ▼                                                            │
//! │  fast_surface_nets::surface_nets ──► positions, normals, indices    │
//! │        │                                                            │
//! │        ▼                                                            │
//! │  SeamStrategy::stitch (faces bordering coarser content)             │
//! │        │                                                            │
//! │        ▼                                                            │
//! │  TerrainMesh in block-local voxel units                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use fast_surface_nets::ndshape::{RuntimeShape, Shape};
use fast_surface_nets::{surface_nets, SurfaceNetsBuffer};
use glam::{IVec3, UVec3, Vec3};
use serde::Deserialize;

use super::types::{MeshBuilder, MeshInput};
use crate::block::{BlockAddress, Face};
use crate::error::GenerationError;
use crate::mesh::{MaterialId, TerrainMesh, Vertex};
use crate::voxel::{VoxelGrid, DENSITY_FULL, DENSITY_VOID};

/// Signed distance of a density value: void is +1, every solid density is
/// negative, down to -1 at full.
///
/// Along an edge from solid to void the surface crosses at
/// `|sdf| / (1 + |sdf|)`, so denser voxels push it further out, halfway at
/// full density.
#[inline]
pub fn density_to_sdf(density: u8) -> f32 {
  if density == DENSITY_VOID {
    1.0
  } else {
    -(density as f32) / DENSITY_FULL as f32
  }
}

// =============================================================================
// Seams
// =============================================================================

/// Post-process hook for faces that border coarser content.
///
/// Runs on worker threads after the surface is extracted.
pub trait SeamStrategy: Send + Sync {
  fn stitch(&self, mesh: &mut TerrainMesh, input: &MeshInput);
}

/// Leave boundary vertices untouched; cracks may show between LODs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSeams;

impl SeamStrategy for NoSeams {
  fn stitch(&self, _mesh: &mut TerrainMesh, _input: &MeshInput) {}
}

/// Snap vertices near a coarser face onto the coarser sample lattice.
///
/// Within one cell of a flagged face, the two tangent coordinates are
/// rounded to even local positions, which are exactly the samples of the
/// block one LOD coarser. When the parent's voxels are at hand, the vertex
/// then slides along its dominant tangent axis onto the parent's surface
/// crossing, which the coarser neighbour extracts from the same samples.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundarySnap;

impl BoundarySnap {
  const INFLUENCE: f32 = 1.0;

  fn near_face(position: [f32; 3], face: Face, block_size: f32) -> bool {
    let value = position[face.axis()];
    if face.is_positive() {
      value >= block_size - Self::INFLUENCE
    } else {
      value <= Self::INFLUENCE
    }
  }
}

impl SeamStrategy for BoundarySnap {
  fn stitch(&self, mesh: &mut TerrainMesh, input: &MeshInput) {
    if input.neighbours_lod == 0 {
      return;
    }
    let block_size = input.block_size as f32;
    let parent = ParentSamples::new(input);
    for vertex in &mut mesh.vertices {
      for face in Face::ALL {
        if input.neighbours_lod & face.lod_bit() == 0
          || !Self::near_face(vertex.position, face, block_size)
        {
          continue;
        }
        let extracted = vertex.position;
        for axis in (0..3).filter(|&axis| axis != face.axis()) {
          vertex.position[axis] = (vertex.position[axis] * 0.5).round() * 2.0;
        }
        if let Some(parent) = &parent {
          parent.settle(vertex, extracted, face);
        }
      }
    }
  }
}

/// The parent's voxels seen from one of its children.
///
/// Child-local voxel `v` sits at parent-local `(v + offset) / 2`.
struct ParentSamples<'a> {
  voxels: &'a VoxelGrid,
  offset: Vec3,
}

impl<'a> ParentSamples<'a> {
  fn new(input: &'a MeshInput) -> Option<Self> {
    let voxels = input.parent_voxels.as_deref()?;
    let octant = input.child_address?;
    let offset = BlockAddress::octant_offset(octant).as_vec3() * input.block_size as f32;
    Some(Self { voxels, offset })
  }

  fn sdf(&self, at: IVec3) -> Option<f32> {
    let dims = self.voxels.dimensions().as_ivec3();
    if at.cmplt(IVec3::ZERO).any() || at.cmpge(dims).any() {
      return None;
    }
    Some(density_to_sdf(self.voxels.density(at.as_uvec3())))
  }

  /// Move a snapped vertex along its dominant tangent axis to the nearest
  /// parent crossing within one coarse cell of where it was extracted.
  fn settle(&self, vertex: &mut Vertex, extracted: [f32; 3], face: Face) {
    let normal = vertex.normal;
    let Some(axis) = (0..3)
      .filter(|&axis| axis != face.axis())
      .max_by(|&a, &b| normal[a].abs().total_cmp(&normal[b].abs()))
    else {
      return;
    };

    let mut lattice = ((Vec3::from_array(vertex.position) + self.offset) * 0.5)
      .round()
      .as_ivec3();
    let along = (extracted[axis] + self.offset[axis]) * 0.5;
    let base = along.floor() as i32;
    let mut nearest: Option<f32> = None;
    for k in base - 1..=base + 1 {
      lattice[axis] = k;
      let Some(low) = self.sdf(lattice) else {
        continue;
      };
      lattice[axis] = k + 1;
      let Some(high) = self.sdf(lattice) else {
        continue;
      };
      if (low < 0.0) == (high < 0.0) {
        continue;
      }
      let crossing = k as f32 + low / (low - high);
      let closer = match nearest {
        Some(best) => (crossing - along).abs() < (best - along).abs(),
        None => true,
      };
      if closer {
        nearest = Some(crossing);
      }
    }
    if let Some(crossing) = nearest {
      vertex.position[axis] = crossing * 2.0 - self.offset[axis];
    }
  }
}

/// Seam handling selected in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeamMode {
  None,
  #[default]
  BoundarySnap,
}

impl SeamMode {
  pub fn strategy(self) -> Arc<dyn SeamStrategy> {
    match self {
      SeamMode::None => Arc::new(NoSeams),
      SeamMode::BoundarySnap => Arc::new(BoundarySnap),
    }
  }
}

// =============================================================================
// Surface nets
// =============================================================================

/// [`MeshBuilder`] backed by `fast-surface-nets`.
pub struct SurfaceNetsMeshBuilder {
  seams: Arc<dyn SeamStrategy>,
}

impl SurfaceNetsMeshBuilder {
  pub fn new() -> Self {
    Self {
      seams: Arc::new(NoSeams),
    }
  }

  pub fn with_seams(mut self, seams: Arc<dyn SeamStrategy>) -> Self {
    self.seams = seams;
    self
  }
}

impl Default for SurfaceNetsMeshBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl MeshBuilder for SurfaceNetsMeshBuilder {
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "meshing::surface_nets"))]
  fn build(&self, input: &MeshInput) -> Result<TerrainMesh, GenerationError> {
    let grid = input.voxels.as_ref();
    let dims = grid.dimensions();
    if dims.cmplt(UVec3::splat(2)).any() {
      return Err(GenerationError::Meshing(format!("grid {dims} is too small to mesh")));
    }

    let shape = RuntimeShape::<u32, 3>::new(dims.to_array());
    let sdf = sample_sdf(grid, &shape);
    let mut buffer = SurfaceNetsBuffer::default();
    surface_nets(&sdf, &shape, [0; 3], (dims - UVec3::ONE).to_array(), &mut buffer);
    if buffer.positions.is_empty() {
      return Ok(TerrainMesh::new());
    }

    let vertices = buffer
      .positions
      .iter()
      .zip(&buffer.normals)
      .map(|(&position, &normal)| Vertex {
        position,
        normal: unit_normal(normal),
        material: material_near(grid, position),
      })
      .collect();
    let mut mesh = TerrainMesh {
      vertices,
      indices: std::mem::take(&mut buffer.indices),
      ..Default::default()
    };
    self.seams.stitch(&mut mesh, input);
    mesh.recompute_bounds();
    Ok(mesh)
  }
}

/// Expand the density poles into a dense SDF laid out for `shape`.
fn sample_sdf(grid: &VoxelGrid, shape: &RuntimeShape<u32, 3>) -> Vec<f32> {
  let dims = grid.dimensions();
  let mut sdf = vec![1.0f32; shape.usize()];
  for z in 0..dims.z {
    for x in 0..dims.x {
      for (density, start, end) in grid.density_pole(x, z).spans() {
        let value = density_to_sdf(density);
        for y in start..end {
          sdf[shape.linearize([x, y, z]) as usize] = value;
        }
      }
    }
  }
  sdf
}

fn unit_normal(normal: [f32; 3]) -> [f32; 3] {
  let normal = Vec3::from_array(normal).normalize_or_zero();
  if normal == Vec3::ZERO {
    Vec3::Y.to_array()
  } else {
    normal.to_array()
  }
}

/// Material of the densest corner of the cell containing `position`.
fn material_near(grid: &VoxelGrid, position: [f32; 3]) -> MaterialId {
  let max_cell = grid.dimensions() - UVec3::splat(2);
  let cell = Vec3::from_array(position).floor().max(Vec3::ZERO).as_uvec3().min(max_cell);
  (0..8u32)
    .map(|corner| cell + UVec3::new(corner & 1, (corner >> 1) & 1, (corner >> 2) & 1))
    .max_by_key(|&voxel| grid.density(voxel))
    .map_or(0, |voxel| grid.material(voxel))
}

#[cfg(test)]
#[path = "meshing_test.rs"]
mod meshing_test;
