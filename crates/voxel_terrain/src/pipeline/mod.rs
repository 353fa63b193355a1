//! Generation pipeline: voxel synthesis and mesh building off the update
//! thread.
//!
//! ```text
//!   request_voxel_generation          request_mesh_generation
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐  voxels      ┌─────────────────┐  mesh
//!   │ VoxelSynthesizer├─────────────►│   MeshBuilder   ├──────────► Ready
//!   │ + edit replay   │  (uniform ──► Empty)             │
//!   └─────────────────┘              └─────────────────┘
//!            ▲                                  ▲
//!            └────────── TaskService ───────────┘
//!                            │
//!                          poll ──► commit | stale | failed
//! ```
//!
//! Every submitted job is recorded against its block together with the
//! block's mutation counter. A result is committed only if the block still
//! exists, is still bound to the same task and still has the same counter;
//! anything else is dropped as stale. Failed jobs send the block back to
//! `Initial` for a later retry.

mod budget;
pub mod meshing;
pub mod synthesis;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use web_time::Instant;

pub use budget::SchedulingBudget;
pub use meshing::{BoundarySnap, NoSeams, SeamMode, SeamStrategy, SurfaceNetsMeshBuilder};
pub use synthesis::{HeightfieldSettings, HeightfieldSynthesizer};
pub use types::{
  Completion, GenerationJob, JobKind, JobOutput, JobResult, MeshBuilder, MeshInput, RequestOutcome,
  SynthesisRegion, VoxelSynthesizer,
};

use self::synthesis::run_synthesis;
use self::types::SynthesisJob;
use crate::block::{BlockGeometry, BlockState, BlockTable, TerrainBlock};
use crate::edit::VoxelEdit;
use crate::metrics::PipelineMetrics;
use crate::threading::{TaskId, TaskPoll, TaskService};
use crate::voxel::VoxelGrid;

/// Submits generation jobs and commits their results to blocks.
pub struct GenerationPipeline {
  tasks: Box<dyn TaskService<JobResult>>,
  synthesizer: Arc<dyn VoxelSynthesizer>,
  mesh_builder: Arc<dyn MeshBuilder>,
  geometry: BlockGeometry,
  clear_density: u8,
  budget: SchedulingBudget,
  in_flight: HashMap<TaskId, GenerationJob>,
  submitted_this_update: usize,
  metrics: PipelineMetrics,
}

impl GenerationPipeline {
  pub fn new(
    tasks: Box<dyn TaskService<JobResult>>,
    synthesizer: Arc<dyn VoxelSynthesizer>,
    mesh_builder: Arc<dyn MeshBuilder>,
    geometry: BlockGeometry,
    clear_density: u8,
  ) -> Self {
    Self {
      tasks,
      synthesizer,
      mesh_builder,
      geometry,
      clear_density,
      budget: SchedulingBudget::DEFAULT,
      in_flight: HashMap::new(),
      submitted_this_update: 0,
      metrics: PipelineMetrics::default(),
    }
  }

  pub fn with_budget(mut self, budget: SchedulingBudget) -> Self {
    self.budget = budget;
    self
  }

  #[inline]
  pub fn budget(&self) -> SchedulingBudget {
    self.budget
  }

  /// Reset the per-update submission count.
  pub fn begin_update(&mut self) {
    self.submitted_this_update = 0;
  }

  /// Jobs submitted and not yet observed by [`poll`](Self::poll), stale
  /// ones included.
  #[inline]
  pub fn in_flight_count(&self) -> usize {
    self.in_flight.len()
  }

  pub fn is_tracking(&self, task: TaskId) -> bool {
    self.in_flight.contains_key(&task)
  }

  #[inline]
  pub fn metrics(&self) -> &PipelineMetrics {
    &self.metrics
  }

  fn take_budget(&mut self) -> bool {
    if self
      .budget
      .can_submit(self.in_flight.len(), self.submitted_this_update)
    {
      self.submitted_this_update += 1;
      true
    } else {
      self.metrics.deferred += 1;
      false
    }
  }

  fn track(&mut self, block: &mut TerrainBlock, task: TaskId, kind: JobKind) {
    block.job = Some(task);
    self.in_flight.insert(
      task,
      GenerationJob {
        block: block.id,
        task,
        kind,
        mutation_counter: block.mutation_counter,
        submitted_at: Instant::now(),
      },
    );
  }

  // ===========================================================================
  // Requests
  // ===========================================================================

  /// Submit a voxel job for `block`, replaying the `edits` that touch it.
  ///
  /// Accepted from `Setup`, `Ready` and `Empty`. A block that is already
  /// generating is only resubmitted when it is dirty; the new task
  /// supersedes the old one, whose result will arrive stale.
  pub fn request_voxel_generation<'a>(
    &mut self,
    block: &mut TerrainBlock,
    edits: impl IntoIterator<Item = &'a Arc<VoxelEdit>>,
  ) -> RequestOutcome {
    match block.state {
      BlockState::Initial => return RequestOutcome::Rejected,
      BlockState::GeneratingVoxel | BlockState::GeneratingMesh if !block.dirty => {
        return if block.job.is_some() {
          RequestOutcome::InFlight
        } else {
          RequestOutcome::Rejected
        };
      }
      _ => {}
    }
    if !self.take_budget() {
      return RequestOutcome::OverBudget;
    }

    let region = SynthesisRegion::for_block(&self.geometry, block.address);
    let job = SynthesisJob {
      region,
      clear_density: self.clear_density,
      edits: edits
        .into_iter()
        .filter(|edit| edit.touches(&region))
        .cloned()
        .collect(),
    };
    let superseded = block.job;
    let synthesizer = Arc::clone(&self.synthesizer);
    let task = self
      .tasks
      .submit(Box::new(move || run_synthesis(synthesizer.as_ref(), &job)));

    block.set_state(BlockState::GeneratingVoxel);
    block.dirty = false;
    self.track(block, task, JobKind::Voxels);
    self.metrics.voxel_jobs_submitted += 1;
    match superseded {
      Some(old) => debug!("voxel job {task:?} for {} supersedes {old:?}", block.id),
      None => trace!("voxel job {task:?} for {} at {:?}", block.id, block.address),
    }
    RequestOutcome::Submitted(task)
  }

  /// Submit a mesh job for `block` from its committed voxels.
  ///
  /// Accepted from `GeneratingMesh` without a job, and from `Ready` (a
  /// remesh after the neighbour-LOD mask changed).
  pub fn request_mesh_generation(
    &mut self,
    block: &mut TerrainBlock,
    parent_voxels: Option<Arc<VoxelGrid>>,
  ) -> RequestOutcome {
    if !matches!(block.state, BlockState::GeneratingMesh | BlockState::Ready) {
      return RequestOutcome::Rejected;
    }
    if block.job.is_some() {
      return RequestOutcome::InFlight;
    }
    let Some(voxels) = block.voxels.clone() else {
      return RequestOutcome::Rejected;
    };
    if !self.take_budget() {
      return RequestOutcome::OverBudget;
    }

    let input = MeshInput {
      block: block.id,
      region: SynthesisRegion::for_block(&self.geometry, block.address),
      block_size: self.geometry.block_size,
      voxels,
      parent_voxels,
      child_address: block.child_address(),
      neighbours_lod: block.neighbours_lod,
    };
    let builder = Arc::clone(&self.mesh_builder);
    let task = self
      .tasks
      .submit(Box::new(move || builder.build(&input).map(JobOutput::Mesh)));

    if block.state == BlockState::Ready {
      block.set_state(BlockState::GeneratingMesh);
    }
    self.track(block, task, JobKind::Mesh);
    self.metrics.mesh_jobs_submitted += 1;
    trace!("mesh job {task:?} for {} (lod mask {:#04x})", block.id, block.neighbours_lod);
    RequestOutcome::Submitted(task)
  }

  // ===========================================================================
  // Completion
  // ===========================================================================

  /// Collect finished jobs and apply them to `table`.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "pipeline::poll"))]
  pub fn poll(&mut self, table: &mut BlockTable) -> Vec<Completion> {
    let mut tasks: Vec<TaskId> = self.in_flight.keys().copied().collect();
    tasks.sort_unstable();

    let mut completions = Vec::new();
    for task in tasks {
      let result = match self.tasks.poll(task) {
        TaskPoll::Pending => continue,
        TaskPoll::Done(result) => result,
        TaskPoll::Failed(failure) => Err(failure.into()),
      };
      if let Some(job) = self.in_flight.remove(&task) {
        completions.push(self.complete(table, job, result));
      }
    }
    completions
  }

  fn complete(&mut self, table: &mut BlockTable, job: GenerationJob, result: JobResult) -> Completion {
    let stale = Completion::Stale {
      block: job.block,
      kind: job.kind,
    };
    let Some(block) = table.get_mut(job.block) else {
      trace!("{:?} result for evicted block {} dropped", job.kind, job.block);
      self.metrics.stale += 1;
      return stale;
    };
    if block.job != Some(job.task) || block.mutation_counter != job.mutation_counter {
      trace!("stale {:?} result {:?} for {}", job.kind, job.task, job.block);
      self.metrics.stale += 1;
      return stale;
    }

    let elapsed_us = job.submitted_at.elapsed().as_micros() as u64;
    match (job.kind, result) {
      (JobKind::Voxels, Ok(JobOutput::Voxels { grid, uniform })) => {
        block.commit_voxels(grid, uniform);
        self.metrics.committed += 1;
        self.metrics.synthesis_timings_us.record(elapsed_us);
        Completion::VoxelsCommitted {
          block: job.block,
          uniform,
        }
      }
      (JobKind::Mesh, Ok(JobOutput::Mesh(mesh))) => {
        block.commit_mesh(mesh);
        self.metrics.committed += 1;
        self.metrics.mesh_timings_us.record(elapsed_us);
        Completion::MeshCommitted {
          block: job.block,
          mutation_counter: block.mutation_counter,
        }
      }
      (kind, result) => {
        match result {
          Err(error) => warn!("{kind:?} job for {} failed: {error}", job.block),
          Ok(_) => warn!("{kind:?} job for {} returned the wrong output", job.block),
        }
        block.fail();
        self.metrics.failed += 1;
        Completion::Failed {
          block: job.block,
          kind,
        }
      }
    }
  }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
