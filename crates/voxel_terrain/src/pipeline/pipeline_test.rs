use glam::{IVec3, UVec3};

use super::*;
use crate::block::{BlockAddress, BlockId};
use crate::error::GenerationError;
use crate::threading::DeferredTaskService;
use crate::voxel::DENSITY_FULL;

fn geometry() -> BlockGeometry {
  BlockGeometry::new(8, 2, 2)
}

/// Solid below world y = 4.
fn ground(region: &SynthesisRegion, grid: &mut VoxelGrid) -> Result<(), GenerationError> {
  let solid = (4 - region.origin.y)
    .div_euclid(region.voxel_scale)
    .clamp(0, grid.height() as i32) as u32;
  for z in 0..grid.depth() {
    for x in 0..grid.width() {
      grid.set_pole(UVec3::new(x, 0, z), solid, DENSITY_FULL);
    }
  }
  Ok(())
}

fn failing(_region: &SynthesisRegion, _grid: &mut VoxelGrid) -> Result<(), GenerationError> {
  Err(GenerationError::Synthesis("no terrain here".into()))
}

struct Harness {
  pipeline: GenerationPipeline,
  tasks: DeferredTaskService<JobResult>,
  table: BlockTable,
}

impl Harness {
  fn new(synthesizer: Arc<dyn VoxelSynthesizer>, budget: SchedulingBudget) -> Self {
    let tasks = DeferredTaskService::new();
    let pipeline = GenerationPipeline::new(
      Box::new(tasks.clone()),
      synthesizer,
      Arc::new(SurfaceNetsMeshBuilder::new()),
      geometry(),
      0,
    )
    .with_budget(budget);
    Self {
      pipeline,
      tasks,
      table: BlockTable::new(geometry()),
    }
  }

  fn ground() -> Self {
    Self::new(Arc::new(ground), SchedulingBudget::UNLIMITED)
  }

  /// Finest-LOD block at height `y`, moved to `Setup`.
  fn add(&mut self, y: i32) -> BlockId {
    let id = self.table.insert(BlockAddress::new(1, IVec3::new(0, y, 0)), None);
    assert!(self.table.get_mut(id).unwrap().set_state(BlockState::Setup));
    id
  }

  fn request_voxels(&mut self, id: BlockId, edits: &[Arc<VoxelEdit>]) -> RequestOutcome {
    let block = self.table.get_mut(id).unwrap();
    self.pipeline.request_voxel_generation(block, edits)
  }

  fn request_mesh(&mut self, id: BlockId) -> RequestOutcome {
    let block = self.table.get_mut(id).unwrap();
    self.pipeline.request_mesh_generation(block, None)
  }

  fn run(&mut self) -> Vec<Completion> {
    self.tasks.run_all();
    self.pipeline.poll(&mut self.table)
  }

  fn block(&self, id: BlockId) -> &TerrainBlock {
    self.table.get(id).unwrap()
  }
}

// ============================================================================
// Batch 1: Happy path
// ============================================================================

#[test]
fn test_voxels_then_mesh_reaches_ready() {
  let mut h = Harness::ground();
  let id = h.add(0);

  assert!(h.request_voxels(id, &[]).is_submitted());
  assert_eq!(h.block(id).state(), BlockState::GeneratingVoxel);
  assert_eq!(h.pipeline.in_flight_count(), 1);
  assert!(h.pipeline.poll(&mut h.table).is_empty(), "nothing ran yet");

  assert_eq!(
    h.run(),
    vec![Completion::VoxelsCommitted {
      block: id,
      uniform: false
    }]
  );
  assert_eq!(h.block(id).state(), BlockState::GeneratingMesh);
  assert!(h.block(id).job().is_none());

  assert!(h.request_mesh(id).is_submitted());
  assert_eq!(
    h.run(),
    vec![Completion::MeshCommitted {
      block: id,
      mutation_counter: 1
    }]
  );
  let block = h.block(id);
  assert_eq!(block.state(), BlockState::Ready);
  assert!(!block.mesh().unwrap().is_empty());
  assert_eq!(h.pipeline.in_flight_count(), 0);
  assert_eq!(h.pipeline.metrics().committed, 2);
  assert_eq!(h.pipeline.metrics().jobs_submitted(), 2);
}

#[test]
fn test_uniform_voxels_go_empty() {
  let mut h = Harness::ground();
  let id = h.add(1);
  h.request_voxels(id, &[]);
  assert_eq!(
    h.run(),
    vec![Completion::VoxelsCommitted {
      block: id,
      uniform: true
    }]
  );
  assert_eq!(h.block(id).state(), BlockState::Empty);
  assert!(h.block(id).mesh().is_none());
  assert_eq!(h.request_mesh(id), RequestOutcome::Rejected);
}

#[test]
fn test_edits_touching_the_region_are_replayed() {
  let mut h = Harness::ground();
  let id = h.add(1);
  let edits = vec![
    Arc::new(VoxelEdit::sphere(IVec3::new(4, 12, 4), 2, DENSITY_FULL)),
    Arc::new(VoxelEdit::sphere(IVec3::new(100, 12, 4), 2, DENSITY_FULL)),
  ];
  h.request_voxels(id, &edits);
  h.run();
  let voxels = h.block(id).voxels().unwrap();
  assert_eq!(voxels.density(UVec3::new(4, 4, 4)), DENSITY_FULL);
  assert_eq!(h.block(id).state(), BlockState::GeneratingMesh);
}

// ============================================================================
// Batch 2: Request gating
// ============================================================================

#[test]
fn test_requests_rejected_in_wrong_state() {
  let mut h = Harness::ground();
  let id = h.table.insert(BlockAddress::new(1, IVec3::ZERO), None);
  assert_eq!(h.request_voxels(id, &[]), RequestOutcome::Rejected, "still Initial");

  let id = h.add(3);
  assert_eq!(h.request_mesh(id), RequestOutcome::Rejected, "no voxels yet");
  assert_eq!(h.pipeline.in_flight_count(), 0);
}

#[test]
fn test_clean_block_in_flight_is_not_resubmitted() {
  let mut h = Harness::ground();
  let id = h.add(0);
  h.request_voxels(id, &[]);
  assert_eq!(h.request_voxels(id, &[]), RequestOutcome::InFlight);
  assert_eq!(h.pipeline.in_flight_count(), 1);
}

#[test]
fn test_submission_budget_per_update() {
  let budget = SchedulingBudget {
    max_in_flight: 0,
    max_submissions_per_update: 1,
  };
  let mut h = Harness::new(Arc::new(ground), budget);
  let a = h.add(0);
  let b = h.add(1);

  assert!(h.request_voxels(a, &[]).is_submitted());
  assert_eq!(h.request_voxels(b, &[]), RequestOutcome::OverBudget);
  assert_eq!(h.block(b).state(), BlockState::Setup);
  assert_eq!(h.pipeline.metrics().deferred, 1);

  h.pipeline.begin_update();
  assert!(h.request_voxels(b, &[]).is_submitted());
}

#[test]
fn test_in_flight_budget() {
  let budget = SchedulingBudget {
    max_in_flight: 1,
    max_submissions_per_update: 0,
  };
  let mut h = Harness::new(Arc::new(ground), budget);
  let a = h.add(0);
  let b = h.add(1);

  assert!(h.request_voxels(a, &[]).is_submitted());
  h.pipeline.begin_update();
  assert_eq!(h.request_voxels(b, &[]), RequestOutcome::OverBudget);

  h.run();
  assert!(h.request_voxels(b, &[]).is_submitted());
}

// ============================================================================
// Batch 3: Staleness
// ============================================================================

#[test]
fn test_result_for_evicted_block_is_stale() {
  let mut h = Harness::ground();
  let id = h.add(0);
  h.request_voxels(id, &[]);
  h.table.remove(id);

  assert_eq!(
    h.run(),
    vec![Completion::Stale {
      block: id,
      kind: JobKind::Voxels
    }]
  );
  assert_eq!(h.pipeline.metrics().stale, 1);
  assert_eq!(h.pipeline.in_flight_count(), 0);
}

#[test]
fn test_dirty_block_supersedes_its_job() {
  let mut h = Harness::ground();
  let id = h.add(0);
  let RequestOutcome::Submitted(first) = h.request_voxels(id, &[]) else {
    panic!("first request refused");
  };

  h.table.get_mut(id).unwrap().dirty = true;
  let RequestOutcome::Submitted(second) = h.request_voxels(id, &[]) else {
    panic!("superseding request refused");
  };
  assert_ne!(first, second);
  assert_eq!(h.block(id).job(), Some(second));
  assert!(!h.block(id).is_dirty());
  assert!(h.pipeline.is_tracking(first));
  assert_eq!(h.pipeline.in_flight_count(), 2);

  assert_eq!(
    h.run(),
    vec![
      Completion::Stale {
        block: id,
        kind: JobKind::Voxels
      },
      Completion::VoxelsCommitted {
        block: id,
        uniform: false
      },
    ]
  );
}

#[test]
fn test_mutation_counter_change_makes_result_stale() {
  let mut h = Harness::ground();
  let id = h.add(0);
  h.request_voxels(id, &[]);
  h.run();
  h.request_mesh(id);
  h.run();
  assert_eq!(h.block(id).mutation_counter(), 1);

  // Remesh from Ready, then commit a mesh behind the job's back.
  assert!(h.request_mesh(id).is_submitted());
  assert_eq!(h.block(id).state(), BlockState::GeneratingMesh);
  h.table.get_mut(id).unwrap().mutation_counter += 1;

  assert_eq!(
    h.run(),
    vec![Completion::Stale {
      block: id,
      kind: JobKind::Mesh
    }]
  );
}

// ============================================================================
// Batch 4: Failures
// ============================================================================

#[test]
fn test_failed_job_returns_block_to_initial() {
  let mut h = Harness::new(Arc::new(failing), SchedulingBudget::UNLIMITED);
  let id = h.add(0);
  h.request_voxels(id, &[]);

  assert_eq!(
    h.run(),
    vec![Completion::Failed {
      block: id,
      kind: JobKind::Voxels
    }]
  );
  let block = h.block(id);
  assert_eq!(block.state(), BlockState::Initial);
  assert!(block.job().is_none());
  assert_eq!(h.pipeline.metrics().failed, 1);
}

#[test]
fn test_lost_task_counts_as_failure() {
  let mut h = Harness::ground();
  let id = h.add(0);
  h.request_voxels(id, &[]);
  assert!(h.tasks.lose_next());

  let completions = h.pipeline.poll(&mut h.table);
  assert_eq!(
    completions,
    vec![Completion::Failed {
      block: id,
      kind: JobKind::Voxels
    }]
  );
  assert_eq!(h.block(id).state(), BlockState::Initial);
}
