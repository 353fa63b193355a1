//! TerrainManager - owner of the block arena and driver of the per-tick
//! update.
//!
//! ```text
//! update(triggers, scene)
//!   │
//!   ├─ drain       pipeline.poll → commits, stale drops, failures
//!   ├─ discover    LOD 0 roots around the triggers (throttled)
//!   ├─ select      top-down: in range? refine into 8 children?
//!   ├─ issue       Initial → Setup → voxel job → mesh job, coarse first
//!   ├─ follow-up   drain + issue again while jobs finished synchronously
//!   ├─ evict       out-of-range blocks, finest first
//!   └─ present     publish / retract meshes
//! ```
//!
//! All block state is owned here and mutated only on the update thread.
//! Workers see private inputs and report through the pipeline.

mod update;

use std::sync::Arc;

use glam::{DVec3, IVec3};
use log::debug;

use crate::block::{BlockAddress, BlockGeometry, BlockId, BlockState, BlockTable, TerrainBlock};
use crate::bounds::DAabb3;
use crate::config::TerrainConfig;
use crate::edit::{EditLog, VoxelEdit};
use crate::error::ConfigError;
use crate::lod::LodSelector;
use crate::metrics::PipelineMetrics;
use crate::pipeline::{
  GenerationPipeline, HeightfieldSynthesizer, JobResult, MeshBuilder, SurfaceNetsMeshBuilder,
  SynthesisRegion, VoxelSynthesizer,
};
use crate::threading::{TaskExecutor, TaskService};
use crate::voxel::{is_solid, LineSteps, RayHit, VoxelGrid};

pub use update::UpdateStats;

/// Adaptive voxel terrain: an octree of blocks streamed around trigger
/// points.
pub struct TerrainManager {
  table: BlockTable,
  selector: LodSelector,
  pipeline: GenerationPipeline,
  edits: EditLog,
  world_bounds: Option<DAabb3>,
  rediscovery_distance: Option<f64>,
  /// Trigger positions at the last root discovery.
  discovered_at: Option<Vec<DVec3>>,
}

impl TerrainManager {
  /// Manager with explicit collaborators.
  pub fn new(
    config: &TerrainConfig,
    tasks: Box<dyn TaskService<JobResult>>,
    synthesizer: Arc<dyn VoxelSynthesizer>,
    mesh_builder: Arc<dyn MeshBuilder>,
  ) -> Result<Self, ConfigError> {
    config.validate()?;
    let geometry = config.geometry();
    let selector = config.lod_selector()?;
    let pipeline = GenerationPipeline::new(
      tasks,
      synthesizer,
      mesh_builder,
      geometry,
      config.clear_density,
    )
    .with_budget(config.budget);

    Ok(Self {
      table: BlockTable::new(geometry),
      selector,
      pipeline,
      edits: EditLog::new(geometry),
      world_bounds: config.world_bounds,
      rediscovery_distance: config.rediscovery_distance,
      discovered_at: None,
    })
  }

  /// Manager on the rayon executor with heightfield terrain and surface-nets
  /// meshes, all configured from `config`.
  pub fn with_defaults(config: &TerrainConfig) -> Result<Self, ConfigError> {
    let tasks = TaskExecutor::with_threads(config.worker_threads)?;
    let synthesizer = HeightfieldSynthesizer::new(config.heightfield.clone());
    let mesh_builder = SurfaceNetsMeshBuilder::new().with_seams(config.seams.strategy());
    Self::new(
      config,
      Box::new(tasks),
      Arc::new(synthesizer),
      Arc::new(mesh_builder),
    )
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  #[inline]
  pub fn geometry(&self) -> &BlockGeometry {
    self.table.geometry()
  }

  #[inline]
  pub fn selector(&self) -> &LodSelector {
    &self.selector
  }

  pub fn block(&self, id: BlockId) -> Option<&TerrainBlock> {
    self.table.get(id)
  }

  pub fn find(&self, address: &BlockAddress) -> Option<BlockId> {
    self.table.find(address)
  }

  pub fn blocks(&self) -> impl Iterator<Item = &TerrainBlock> {
    self.table.iter()
  }

  #[inline]
  pub fn block_count(&self) -> usize {
    self.table.len()
  }

  /// Version of a block's renderable content; bumps on every mesh commit.
  pub fn mutation_counter(&self, id: BlockId) -> Option<u64> {
    self.table.get(id).map(TerrainBlock::mutation_counter)
  }

  pub fn pipeline_metrics(&self) -> &PipelineMetrics {
    self.pipeline.metrics()
  }

  #[inline]
  pub fn in_flight_count(&self) -> usize {
    self.pipeline.in_flight_count()
  }

  /// Edits applied so far, oldest first.
  pub fn edits(&self) -> &[Arc<VoxelEdit>] {
    self.edits.as_slice()
  }

  // ===========================================================================
  // Edits
  // ===========================================================================

  /// Record `edit` and mark every block sampling it dirty, plus their
  /// same-LOD neighbours for a neighbour-LOD recompute. Returns the number
  /// of blocks marked dirty.
  ///
  /// The edit takes effect when the affected blocks resynthesize, and is
  /// replayed by every later synthesis that touches it.
  pub fn edit(&mut self, edit: VoxelEdit) -> usize {
    let edit = Arc::new(edit);
    let geometry = *self.table.geometry();
    let touched: Vec<BlockId> = self
      .table
      .iter()
      .filter(|block| edit.touches(&SynthesisRegion::for_block(&geometry, block.address)))
      .map(|block| block.id)
      .collect();

    for &id in &touched {
      if let Some(block) = self.table.get_mut(id) {
        block.dirty = true;
      }
      self.table.mark_neighbours_dirty(id);
    }
    debug!("edit {:?} touches {} blocks", edit.shape, touched.len());
    self.edits.push(edit);
    touched.len()
  }

  // ===========================================================================
  // Queries
  // ===========================================================================

  /// Ready blocks whose bounds intersect `aabb`, in id order.
  pub fn query(&self, aabb: &DAabb3) -> Vec<BlockId> {
    let geometry = self.table.geometry();
    let mut hits: Vec<BlockId> = self
      .table
      .iter()
      .filter(|block| block.state == BlockState::Ready)
      .filter(|block| geometry.bounds(&block.address).overlaps(aabb))
      .map(|block| block.id)
      .collect();
    hits.sort_unstable();
    hits
  }

  /// Deep copy of a block's committed voxels into `dst`. False when the
  /// block is unknown or has no committed voxels.
  pub fn copy_voxels(&self, id: BlockId, dst: &mut VoxelGrid) -> bool {
    match self.table.get(id).and_then(|block| block.voxels.as_ref()) {
      Some(voxels) => {
        voxels.get_copy(dst);
        true
      }
      None => false,
    }
  }

  /// Density at a world voxel, read from the finest block with committed
  /// voxels covering it. `None` where nothing has been synthesized.
  pub fn voxel_density(&self, world: IVec3) -> Option<u8> {
    let geometry = *self.table.geometry();
    let position = geometry.root_containing(world.as_dvec3());
    if !geometry.is_representable_root(position) {
      return None;
    }
    let root = BlockAddress::new(0, position);
    let mut current = self.table.find(&root).and_then(|id| self.table.get(id));
    let mut density = None;

    while let Some(block) = current {
      if let Some(voxels) = &block.voxels {
        let region = SynthesisRegion::for_block(&geometry, block.address);
        let voxel = region.nearest_voxel(world);
        if voxels.contains(voxel) {
          density = Some(voxels.density(voxel.as_uvec3()));
        }
      }
      current = block.children.and_then(|children| {
        children
          .iter()
          .filter_map(|&child| self.table.get(child))
          .find(|child| {
            let min = child.origin;
            let max = min + IVec3::splat(child.world_size);
            world.cmpge(min).all() && world.cmplt(max).all()
          })
      });
    }
    density
  }

  /// Walk the world line `from → to` and report the first crossing from
  /// void into solid. Unsynthesized space counts as void; a walk starting
  /// inside solid must leave it first.
  pub fn cast_ray(&self, from: IVec3, to: IVec3) -> Option<RayHit> {
    let mut last_void = None;
    for point in LineSteps::new(from, to) {
      let solid = self.voxel_density(point).is_some_and(is_solid);
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
}
