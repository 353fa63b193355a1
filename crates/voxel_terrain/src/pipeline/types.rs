//! Core types for the generation pipeline.

use std::sync::Arc;

use glam::{I64Vec3, IVec3, UVec3};
use web_time::Instant;

use crate::block::{BlockAddress, BlockGeometry, BlockId};
use crate::edit::VoxelEdit;
use crate::error::GenerationError;
use crate::mesh::TerrainMesh;
use crate::threading::TaskId;
use crate::voxel::VoxelGrid;

// =============================================================================
// Regions
// =============================================================================

/// World region sampled by one block's voxel grid.
///
/// Voxel `i` samples world position `origin + i * voxel_scale`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthesisRegion {
  pub address: BlockAddress,
  pub origin: IVec3,
  pub voxel_scale: i32,
  pub dims: UVec3,
}

impl SynthesisRegion {
  pub fn for_block(geometry: &BlockGeometry, address: BlockAddress) -> Self {
    Self {
      address,
      origin: geometry.origin(&address),
      voxel_scale: geometry.voxel_scale(address.lod),
      dims: geometry.grid_dims(),
    }
  }

  /// World position of the first sample.
  #[inline]
  pub fn world_min(&self) -> IVec3 {
    self.origin
  }

  /// World position of the last sample (inclusive).
  #[inline]
  pub fn world_max(&self) -> IVec3 {
    self.origin + (self.dims.as_ivec3() - IVec3::ONE) * self.voxel_scale
  }

  #[inline]
  pub fn voxel_to_world(&self, voxel: UVec3) -> IVec3 {
    self.origin + voxel.as_ivec3() * self.voxel_scale
  }

  /// Nearest sample to `world`, possibly outside the grid.
  #[inline]
  pub fn nearest_voxel(&self, world: IVec3) -> IVec3 {
    let scale = I64Vec3::splat(i64::from(self.voxel_scale));
    let voxel = (world.as_i64vec3() - self.origin.as_i64vec3() + scale / 2).div_euclid(scale);
    voxel
      .clamp(I64Vec3::splat(i32::MIN.into()), I64Vec3::splat(i32::MAX.into()))
      .as_ivec3()
  }

  /// Sample index range whose world positions fall inside `[min, max]`,
  /// clipped to the grid. `None` when no sample does.
  pub fn voxel_span(&self, min: IVec3, max: IVec3) -> Option<(UVec3, UVec3)> {
    let scale = I64Vec3::splat(i64::from(self.voxel_scale));
    let origin = self.origin.as_i64vec3();
    let low = -(origin - min.as_i64vec3()).div_euclid(scale);
    let high = (max.as_i64vec3() - origin).div_euclid(scale);
    let low = low.max(I64Vec3::ZERO);
    let high = high.min(self.dims.as_i64vec3() - I64Vec3::ONE);
    if low.cmple(high).all() {
      Some((low.as_uvec3(), high.as_uvec3()))
    } else {
      None
    }
  }

  /// True when the inclusive world box `[min, max]` meets the sampled extent.
  #[inline]
  pub fn overlaps(&self, min: IVec3, max: IVec3) -> bool {
    min.cmple(self.world_max()).all() && max.cmpge(self.world_min()).all()
  }
}

// =============================================================================
// Jobs
// =============================================================================

/// Phase of a generation job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
  Voxels,
  Mesh,
}

/// In-flight job record: binds a block and its mutation counter at
/// submission to a task.
#[derive(Clone, Copy, Debug)]
pub struct GenerationJob {
  pub block: BlockId,
  pub task: TaskId,
  pub kind: JobKind,
  pub mutation_counter: u64,
  pub submitted_at: Instant,
}

/// Result payload of a finished job.
#[derive(Debug)]
pub enum JobOutput {
  Voxels { grid: VoxelGrid, uniform: bool },
  Mesh(TerrainMesh),
}

/// What a job closure returns.
pub type JobResult = Result<JobOutput, GenerationError>;

/// Outcome of a [`request`](super::GenerationPipeline::request_voxel_generation).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
  Submitted(TaskId),
  /// A job for the block is already in flight.
  InFlight,
  /// The scheduling budget is exhausted; retry next update.
  OverBudget,
  /// Block is unknown or not in a state that allows the request.
  Rejected,
}

impl RequestOutcome {
  pub fn is_submitted(&self) -> bool {
    matches!(self, RequestOutcome::Submitted(_))
  }
}

/// What happened to a job observed by [`poll`](super::GenerationPipeline::poll).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
  /// Voxels committed; `uniform` blocks went `Empty`.
  VoxelsCommitted { block: BlockId, uniform: bool },
  /// Mesh committed; block is `Ready`.
  MeshCommitted { block: BlockId, mutation_counter: u64 },
  /// Result discarded: block evicted, superseded or mutated.
  Stale { block: BlockId, kind: JobKind },
  /// Job failed; block is back to `Initial`.
  Failed { block: BlockId, kind: JobKind },
}

// =============================================================================
// Collaborators
// =============================================================================

/// Fills a fresh grid with procedurally generated voxels.
///
/// Runs on worker threads. Edits are replayed by the pipeline afterwards.
pub trait VoxelSynthesizer: Send + Sync {
  fn synthesize(&self, region: &SynthesisRegion, grid: &mut VoxelGrid) -> Result<(), GenerationError>;
}

impl<F> VoxelSynthesizer for F
where
  F: Fn(&SynthesisRegion, &mut VoxelGrid) -> Result<(), GenerationError> + Send + Sync,
{
  fn synthesize(&self, region: &SynthesisRegion, grid: &mut VoxelGrid) -> Result<(), GenerationError> {
    self(region, grid)
  }
}

/// Everything a mesh build may read.
#[derive(Clone, Debug)]
pub struct MeshInput {
  pub block: BlockId,
  pub region: SynthesisRegion,
  /// Cells per block edge; the `+` faces sit at this local coordinate.
  pub block_size: u32,
  /// Committed voxels of the block.
  pub voxels: Arc<VoxelGrid>,
  /// Committed voxels of the parent, when it has any.
  pub parent_voxels: Option<Arc<VoxelGrid>>,
  /// Octant within the parent, `None` for roots.
  pub child_address: Option<u8>,
  /// Faces bordering coarser content.
  pub neighbours_lod: u8,
}

/// Turns committed voxels into a mesh. Runs on worker threads.
pub trait MeshBuilder: Send + Sync {
  fn build(&self, input: &MeshInput) -> Result<TerrainMesh, GenerationError>;
}

/// Voxel job input, owned by the job closure.
pub(crate) struct SynthesisJob {
  pub region: SynthesisRegion,
  pub clear_density: u8,
  pub edits: Vec<Arc<VoxelEdit>>,
}
