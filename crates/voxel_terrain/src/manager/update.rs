//! The per-tick update pass.

use std::sync::Arc;

use glam::{DVec3, IVec3};
use log::{debug, trace};

use super::TerrainManager;
use crate::block::{BlockAddress, BlockId, BlockState};
use crate::lod::LodSelector;
use crate::pipeline::{Completion, RequestOutcome};
use crate::presentation::ScenePublisher;

/// Drain/issue rounds after the main issuance pass. Lets synchronous task
/// services carry a block through voxels and mesh within one update.
const FOLLOW_UP_ROUNDS: usize = 4;

/// What one [`TerrainManager::update`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
  pub blocks_created: usize,
  pub blocks_evicted: usize,
  pub voxel_jobs: usize,
  pub mesh_jobs: usize,
  /// Results committed to blocks.
  pub committed: usize,
  /// Results dropped because their block changed or vanished.
  pub stale: usize,
  pub failed: usize,
  /// The scheduling budget stopped issuance early.
  pub budget_exhausted: bool,
  pub published: usize,
  pub retracted: usize,
  /// Blocks alive after the update.
  pub block_count: usize,
  /// Jobs still in flight after the update.
  pub in_flight: usize,
}

impl UpdateStats {
  #[inline]
  pub fn jobs_submitted(&self) -> usize {
    self.voxel_jobs + self.mesh_jobs
  }
}

impl TerrainManager {
  /// Run one update pass for the given trigger positions.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "terrain::update"))]
  pub fn update(&mut self, triggers: &[DVec3], scene: &mut dyn ScenePublisher) -> UpdateStats {
    let mut stats = UpdateStats::default();
    self.pipeline.begin_update();

    self.drain(&mut stats);
    self.discover_roots(triggers, &mut stats);
    self.select(triggers, &mut stats);
    self.issue(&mut stats);
    for _ in 0..FOLLOW_UP_ROUNDS {
      if self.drain(&mut stats) == 0 {
        break;
      }
      self.issue(&mut stats);
    }
    self.evict(scene, &mut stats);
    self.present(scene, &mut stats);

    stats.block_count = self.table.len();
    stats.in_flight = self.pipeline.in_flight_count();
    debug!(
      "update: {} blocks (+{} -{}), {} jobs submitted, {} committed, {} stale, {} failed, {} in flight",
      stats.block_count,
      stats.blocks_created,
      stats.blocks_evicted,
      stats.jobs_submitted(),
      stats.committed,
      stats.stale,
      stats.failed,
      stats.in_flight
    );
    stats
  }

  // ===========================================================================
  // Completions
  // ===========================================================================

  /// Apply finished jobs; returns how many were observed.
  fn drain(&mut self, stats: &mut UpdateStats) -> usize {
    let completions = self.pipeline.poll(&mut self.table);
    for completion in &completions {
      match completion {
        Completion::VoxelsCommitted { .. } | Completion::MeshCommitted { .. } => stats.committed += 1,
        Completion::Stale { .. } => stats.stale += 1,
        Completion::Failed { .. } => stats.failed += 1,
      }
    }
    completions.len()
  }

  // ===========================================================================
  // Discovery and selection
  // ===========================================================================

  fn needs_discovery(&self, triggers: &[DVec3]) -> bool {
    let (Some(previous), Some(threshold)) = (&self.discovered_at, self.rediscovery_distance) else {
      return true;
    };
    previous.len() != triggers.len()
      || previous
        .iter()
        .zip(triggers)
        .any(|(before, now)| before.distance(*now) > threshold)
  }

  /// Create `Initial` roots for every in-range LOD 0 position around the
  /// triggers, inside the world bounds.
  fn discover_roots(&mut self, triggers: &[DVec3], stats: &mut UpdateStats) {
    if triggers.is_empty() || !self.needs_discovery(triggers) {
      return;
    }
    self.discovered_at = Some(triggers.to_vec());

    let geometry = *self.table.geometry();
    let reach = DVec3::splat(self.selector.max_distance_sq().sqrt());
    let (min_root, max_root) = geometry.root_limits();
    let mut created = 0;
    for trigger in triggers {
      let low = geometry.root_containing(*trigger - reach).max(min_root);
      let high = geometry.root_containing(*trigger + reach).min(max_root);
      for z in low.z..=high.z {
        for y in low.y..=high.y {
          for x in low.x..=high.x {
            let address = BlockAddress::new(0, IVec3::new(x, y, z));
            if self.table.find(&address).is_some() {
              continue;
            }
            if let Some(bounds) = &self.world_bounds {
              if !geometry.bounds(&address).overlaps(bounds) {
                continue;
              }
            }
            if self
              .selector
              .select_lod(triggers, geometry.center(&address))
              .is_some()
            {
              self.table.insert(address, None);
              created += 1;
            }
          }
        }
      }
    }
    if created > 0 {
      trace!("discovered {created} roots");
    }
    stats.blocks_created += created;
  }

  /// Top-down LOD selection.
  ///
  /// Roots are in range when any LOD qualifies for them. A block refines
  /// when a finer LOD qualifies, it holds non-uniform voxels and a finer
  /// level exists; its eight children are then in range together. An
  /// unrefined block takes its whole subtree out of range.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "terrain::select"))]
  fn select(&mut self, triggers: &[DVec3], stats: &mut UpdateStats) {
    let finest = self.table.geometry().finest_lod();
    let mut stack: Vec<(BlockId, Option<bool>)> =
      self.table.roots().into_iter().map(|id| (id, None)).collect();

    while let Some((id, parent_refines)) = stack.pop() {
      let Some(block) = self.table.get(id) else {
        continue;
      };
      let lod = block.address.lod;
      let distance_sq = LodSelector::min_distance_sq(triggers, block.center()).unwrap_or(f64::INFINITY);
      let selected = self.selector.select_for_distance(distance_sq);
      let in_range = parent_refines.unwrap_or(selected.is_some());
      let has_detail = block.voxels.is_some() && !block.uniform;
      let refines =
        in_range && has_detail && lod < finest && selected.is_some_and(|wanted| wanted > lod);
      let mut children = block.children;

      if let Some(block) = self.table.get_mut(id) {
        block.distance_sq = distance_sq;
        if block.in_range != in_range {
          block.in_range = in_range;
          block.dirty_neighbours = true;
          self.table.mark_neighbours_dirty(id);
        }
      }

      if refines && children.is_none() {
        children = self.table.create_children(id);
        if children.is_some() {
          stats.blocks_created += 8;
          trace!("refined {id} at lod {lod}");
        }
      }
      if let Some(children) = children {
        stack.extend(children.iter().map(|&child| (child, Some(refines))));
      }
    }
  }

  // ===========================================================================
  // Issuance
  // ===========================================================================

  /// Submit the next job for every in-range block, coarse LODs first, then
  /// nearest first, until the budget runs out.
  fn issue(&mut self, stats: &mut UpdateStats) {
    let mut order: Vec<(u32, f64, BlockId)> = self
      .table
      .iter()
      .filter(|block| block.in_range)
      .map(|block| (block.address.lod, block.distance_sq, block.id))
      .collect();
    order.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));

    for (_, _, id) in order {
      let outcome = self.issue_block(id, stats);
      if outcome == RequestOutcome::OverBudget {
        stats.budget_exhausted = true;
        break;
      }
    }
  }

  fn issue_block(&mut self, id: BlockId, stats: &mut UpdateStats) -> RequestOutcome {
    let mask = self.table.compute_neighbours_lod(id);
    let parent_voxels = self
      .table
      .get(id)
      .and_then(|block| block.parent)
      .and_then(|parent| self.table.get(parent))
      .and_then(|parent| parent.voxels.clone());
    let Some(block) = self.table.get_mut(id) else {
      return RequestOutcome::Rejected;
    };

    if block.state == BlockState::Initial {
      block.set_state(BlockState::Setup);
    }

    if block.state == BlockState::Setup || block.dirty {
      let edits = self.edits.for_root(block.address.root());
      let outcome = self.pipeline.request_voxel_generation(block, edits);
      if outcome.is_submitted() {
        stats.voxel_jobs += 1;
      }
      return outcome;
    }

    match block.state {
      BlockState::GeneratingMesh if block.job.is_none() => {
        let previous = (block.neighbours_lod, block.dirty_neighbours);
        block.neighbours_lod = mask;
        block.dirty_neighbours = false;
        let outcome = self.pipeline.request_mesh_generation(block, parent_voxels);
        if outcome.is_submitted() {
          stats.mesh_jobs += 1;
        } else {
          (block.neighbours_lod, block.dirty_neighbours) = previous;
        }
        outcome
      }
      BlockState::Ready | BlockState::Empty if block.dirty_neighbours && block.job.is_none() => {
        if mask == block.neighbours_lod || block.state == BlockState::Empty {
          block.neighbours_lod = mask;
          block.dirty_neighbours = false;
          return RequestOutcome::Rejected;
        }
        let previous = block.neighbours_lod;
        block.neighbours_lod = mask;
        let outcome = self.pipeline.request_mesh_generation(block, parent_voxels);
        if outcome.is_submitted() {
          block.dirty_neighbours = false;
          stats.mesh_jobs += 1;
          trace!("{id} remeshes for lod mask {previous:#04x} -> {mask:#04x}");
        } else {
          block.neighbours_lod = previous;
        }
        outcome
      }
      _ => RequestOutcome::InFlight,
    }
  }

  // ===========================================================================
  // Eviction and presentation
  // ===========================================================================

  /// Remove every out-of-range block, finest first. Their in-flight jobs
  /// are dropped as stale when they arrive.
  fn evict(&mut self, scene: &mut dyn ScenePublisher, stats: &mut UpdateStats) {
    let mut doomed: Vec<(u32, BlockId)> = self
      .table
      .iter()
      .filter(|block| !block.in_range)
      .map(|block| (block.address.lod, block.id))
      .collect();
    doomed.sort_unstable_by(|a, b| b.cmp(a));

    for (_, id) in doomed {
      if let Some(block) = self.table.remove(id) {
        if block.published.is_some() {
          scene.retract(id);
          stats.retracted += 1;
        }
        stats.blocks_evicted += 1;
      }
    }
  }

  /// Publish meshes that became visible or changed, retract hidden ones.
  ///
  /// A block is visible while it is in range and holds a non-empty mesh,
  /// unless all of its children are in range and have content of their own.
  fn present(&mut self, scene: &mut dyn ScenePublisher, stats: &mut UpdateStats) {
    for id in self.table.ids() {
      let Some(block) = self.table.get(id) else {
        continue;
      };
      let covered = block.children.is_some_and(|children| {
        children.iter().all(|&child| {
          self
            .table
            .get(child)
            .is_some_and(|child| child.in_range && child.has_content())
        })
      });
      let mesh = block
        .mesh
        .as_ref()
        .filter(|mesh| block.in_range && !covered && !mesh.is_empty())
        .map(Arc::clone);
      let counter = block.mutation_counter;
      let transform = block.transform();
      let published = block.published;

      let Some(block) = self.table.get_mut(id) else {
        continue;
      };
      match mesh {
        Some(mesh) if published != Some(counter) => {
          scene.publish(id, mesh, transform);
          block.published = Some(counter);
          stats.published += 1;
        }
        None if published.is_some() => {
          scene.retract(id);
          block.published = None;
          stats.retracted += 1;
        }
        _ => {}
      }
    }
  }
}
