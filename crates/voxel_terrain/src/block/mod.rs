//! Terrain blocks: octree nodes owning voxel and mesh content.
//!
//! Blocks never own each other. Parent, child and neighbour links are
//! [`BlockId`]s resolved through the [`BlockTable`] arena, which is the only
//! owner of block records.

mod address;
mod geometry;
mod state;
mod table;

use std::fmt;
use std::sync::Arc;

use glam::{DAffine3, DVec3, IVec3};

pub use address::{BlockAddress, Face};
pub use geometry::BlockGeometry;
pub use state::BlockState;
pub use table::BlockTable;

use crate::mesh::TerrainMesh;
use crate::threading::TaskId;
use crate::voxel::VoxelGrid;

/// Monotonically increasing block identifier, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

impl BlockId {
  /// Id for blocks built outside a [`BlockTable`], e.g. hand-made mesh inputs.
  #[inline]
  pub fn from_raw(raw: u64) -> Self {
    Self(raw)
  }

  #[inline]
  pub fn raw(self) -> u64 {
    self.0
  }
}

impl fmt::Display for BlockId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// One octree node: a cubic region at a specific LOD.
#[derive(Debug)]
pub struct TerrainBlock {
  pub(crate) id: BlockId,
  pub(crate) address: BlockAddress,
  pub(crate) origin: IVec3,
  pub(crate) world_size: i32,
  pub(crate) voxel_scale: i32,
  pub(crate) state: BlockState,
  /// Committed voxels, shared read-only with mesh jobs.
  pub(crate) voxels: Option<Arc<VoxelGrid>>,
  /// Committed voxels hold no solid/void transition.
  pub(crate) uniform: bool,
  pub(crate) mesh: Option<Arc<TerrainMesh>>,
  pub(crate) parent: Option<BlockId>,
  pub(crate) children: Option<[BlockId; 8]>,
  pub(crate) neighbours: [Option<BlockId>; 6],
  pub(crate) dirty: bool,
  pub(crate) in_range: bool,
  pub(crate) dirty_neighbours: bool,
  pub(crate) neighbours_lod: u8,
  pub(crate) mutation_counter: u64,
  /// Task bound to this block; any other task reporting for it is stale.
  pub(crate) job: Option<TaskId>,
  pub(crate) distance_sq: f64,
  /// Mutation counter of the mesh currently published to the scene.
  pub(crate) published: Option<u64>,
}

impl TerrainBlock {
  pub(crate) fn new(
    id: BlockId,
    address: BlockAddress,
    geometry: &BlockGeometry,
    parent: Option<BlockId>,
  ) -> Self {
    Self {
      id,
      address,
      origin: geometry.origin(&address),
      world_size: geometry.world_size(address.lod),
      voxel_scale: geometry.voxel_scale(address.lod),
      state: BlockState::Initial,
      voxels: None,
      uniform: false,
      mesh: None,
      parent,
      children: None,
      neighbours: [None; 6],
      dirty: false,
      in_range: false,
      dirty_neighbours: false,
      neighbours_lod: 0,
      mutation_counter: 0,
      job: None,
      distance_sq: f64::INFINITY,
      published: None,
    }
  }

  #[inline]
  pub fn id(&self) -> BlockId {
    self.id
  }

  #[inline]
  pub fn address(&self) -> BlockAddress {
    self.address
  }

  #[inline]
  pub fn lod(&self) -> u32 {
    self.address.lod
  }

  /// Octant within the parent, `None` for root blocks.
  pub fn child_address(&self) -> Option<u8> {
    self.address.parent().map(|(_, octant)| octant)
  }

  #[inline]
  pub fn origin(&self) -> IVec3 {
    self.origin
  }

  #[inline]
  pub fn world_size(&self) -> i32 {
    self.world_size
  }

  #[inline]
  pub fn voxel_scale(&self) -> i32 {
    self.voxel_scale
  }

  #[inline]
  pub fn state(&self) -> BlockState {
    self.state
  }

  pub fn voxels(&self) -> Option<&Arc<VoxelGrid>> {
    self.voxels.as_ref()
  }

  pub fn mesh(&self) -> Option<&Arc<TerrainMesh>> {
    self.mesh.as_ref()
  }

  #[inline]
  pub fn parent(&self) -> Option<BlockId> {
    self.parent
  }

  #[inline]
  pub fn children(&self) -> Option<&[BlockId; 8]> {
    self.children.as_ref()
  }

  #[inline]
  pub fn neighbour(&self, face: Face) -> Option<BlockId> {
    self.neighbours[face.index()]
  }

  #[inline]
  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  #[inline]
  pub fn is_in_range(&self) -> bool {
    self.in_range
  }

  #[inline]
  pub fn has_dirty_neighbours(&self) -> bool {
    self.dirty_neighbours
  }

  /// Faces bordering coarser content (see [`Face::lod_bit`]).
  #[inline]
  pub fn neighbours_lod(&self) -> u8 {
    self.neighbours_lod
  }

  #[inline]
  pub fn mutation_counter(&self) -> u64 {
    self.mutation_counter
  }

  /// Task currently bound to the block.
  #[inline]
  pub fn job(&self) -> Option<TaskId> {
    self.job
  }

  #[inline]
  pub fn is_published(&self) -> bool {
    self.published.is_some()
  }

  pub fn center(&self) -> DVec3 {
    self.origin.as_dvec3() + DVec3::splat(self.world_size as f64 * 0.5)
  }

  /// Transform from block-local voxel units to world space.
  pub fn transform(&self) -> DAffine3 {
    DAffine3::from_translation(self.origin.as_dvec3())
      * DAffine3::from_scale(DVec3::splat(self.voxel_scale as f64))
  }

  /// Apply a state transition, refusing illegal ones.
  pub(crate) fn set_state(&mut self, next: BlockState) -> bool {
    if !self.state.can_transition_to(next) {
      debug_assert!(
        false,
        "illegal block transition {:?} -> {:?} for {}",
        self.state, next, self.id
      );
      log::warn!(
        "illegal block transition {:?} -> {:?} for {}",
        self.state,
        next,
        self.id
      );
      return false;
    }
    self.state = next;
    true
  }

  /// Store synthesized voxels and advance to meshing or `Empty`.
  pub(crate) fn commit_voxels(&mut self, voxels: VoxelGrid, uniform: bool) {
    self.job = None;
    let next = if uniform {
      BlockState::Empty
    } else {
      BlockState::GeneratingMesh
    };
    if self.set_state(next) {
      self.voxels = Some(Arc::new(voxels));
      self.uniform = uniform;
      if uniform {
        self.mesh = None;
      }
    }
  }

  /// Swap in a new mesh; bumps the mutation counter.
  pub(crate) fn commit_mesh(&mut self, mesh: TerrainMesh) {
    self.job = None;
    if self.set_state(BlockState::Ready) {
      self.mesh = Some(Arc::new(mesh));
      self.mutation_counter += 1;
    }
  }

  /// Job failed: back to `Initial` for a later retry.
  pub(crate) fn fail(&mut self) {
    self.job = None;
    self.set_state(BlockState::Initial);
  }

  /// True when the block's content covers its region: a committed mesh or
  /// committed uniform voxels.
  pub(crate) fn has_content(&self) -> bool {
    self.mesh.is_some() || (self.voxels.is_some() && self.uniform)
  }
}

#[cfg(test)]
#[path = "block_test.rs"]
mod block_test;
