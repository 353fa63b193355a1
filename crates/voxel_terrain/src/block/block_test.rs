use glam::UVec3;

use super::*;
use crate::voxel::DENSITY_FULL;

fn block() -> TerrainBlock {
  let geometry = BlockGeometry::new(16, 2, 3);
  TerrainBlock::new(
    BlockId(1),
    BlockAddress::new(1, IVec3::new(1, 0, -1)),
    &geometry,
    None,
  )
}

fn grid(solid_columns: bool) -> VoxelGrid {
  let mut grid = VoxelGrid::new(0);
  grid.initialize(4, 4, 4).unwrap();
  if solid_columns {
    grid.set_pole(UVec3::ZERO, 2, DENSITY_FULL);
  }
  grid
}

fn advance_to_voxel_generation(block: &mut TerrainBlock) {
  assert!(block.set_state(BlockState::Setup));
  assert!(block.set_state(BlockState::GeneratingVoxel));
}

#[test]
fn test_new_block_layout() {
  let block = block();
  assert_eq!(block.state(), BlockState::Initial);
  assert_eq!(block.voxel_scale(), 2);
  assert_eq!(block.world_size(), 32);
  assert_eq!(block.origin(), IVec3::new(32, 0, -32));
  assert_eq!(block.child_address(), Some(0b101));
  assert!(block.voxels().is_none());
  assert_eq!(block.mutation_counter(), 0);
}

#[test]
fn test_transform_scales_local_units() {
  let block = block();
  let world = block.transform().transform_point3(DVec3::new(1.0, 2.0, 3.0));
  assert_eq!(world, DVec3::new(34.0, 4.0, -26.0));
}

#[test]
fn test_uniform_commit_goes_empty() {
  let mut block = block();
  advance_to_voxel_generation(&mut block);
  block.commit_voxels(grid(false), true);

  assert_eq!(block.state(), BlockState::Empty);
  assert!(block.has_content());
  assert_eq!(block.mutation_counter(), 0, "empty commit is not a Ready transition");
}

#[test]
fn test_full_cycle_bumps_counter_once() {
  let mut block = block();
  advance_to_voxel_generation(&mut block);
  block.commit_voxels(grid(true), false);
  assert_eq!(block.state(), BlockState::GeneratingMesh);
  assert!(!block.has_content(), "no mesh yet");

  block.commit_mesh(TerrainMesh::new());
  assert_eq!(block.state(), BlockState::Ready);
  assert_eq!(block.mutation_counter(), 1);

  assert!(block.set_state(BlockState::GeneratingMesh));
  block.commit_mesh(TerrainMesh::new());
  assert_eq!(block.mutation_counter(), 2);
}

#[test]
fn test_failure_returns_to_initial_and_keeps_old_mesh() {
  let mut block = block();
  advance_to_voxel_generation(&mut block);
  block.commit_voxels(grid(true), false);
  block.commit_mesh(TerrainMesh::new());

  assert!(block.set_state(BlockState::GeneratingVoxel));
  block.fail();
  assert_eq!(block.state(), BlockState::Initial);
  assert!(block.mesh().is_some());
  assert_eq!(block.mutation_counter(), 1);
}

#[test]
#[should_panic(expected = "illegal block transition")]
fn test_illegal_transition_asserts_in_debug() {
  let mut block = block();
  block.set_state(BlockState::Ready);
}
