//! Voxel grid benchmarks.
//!
//! - **pole**: random single-voxel writes into an RLE pole
//! - **synthesis**: heightfield fill of one 34³ grid
//! - **meshing**: surface nets over a synthesized grid
//! - **edits**: line and sphere edits applied to a synthesized grid

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{IVec3, UVec3};
use rand::{Rng, SeedableRng};
use voxel_terrain::block::BlockId;
use voxel_terrain::pipeline::{MeshInput, SynthesisRegion};
use voxel_terrain::voxel::Pole;
use voxel_terrain::{
  BlockAddress, BlockGeometry, HeightfieldSynthesizer, MeshBuilder, SurfaceNetsMeshBuilder,
  VoxelEdit, VoxelGrid, VoxelSynthesizer, DENSITY_FULL,
};

fn region(lod: u32) -> SynthesisRegion {
  let geometry = BlockGeometry::new(32, 2, 4);
  SynthesisRegion::for_block(&geometry, BlockAddress::new(lod, IVec3::ZERO))
}

fn synthesized(region: &SynthesisRegion) -> VoxelGrid {
  let mut grid = VoxelGrid::new(0);
  grid
    .initialize(region.dims.x, region.dims.y, region.dims.z)
    .unwrap();
  HeightfieldSynthesizer::default()
    .synthesize(region, &mut grid)
    .unwrap();
  grid
}

// =============================================================================
// Poles
// =============================================================================

fn bench_pole_writes(c: &mut Criterion) {
  let mut group = c.benchmark_group("pole_writes");

  for height in [34u32, 128, 512] {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let writes: Vec<(u32, u8)> = (0..256)
      .map(|_| (rng.random_range(0..height), rng.random_range(0..4u8)))
      .collect();

    group.bench_with_input(BenchmarkId::from_parameter(height), &writes, |b, writes| {
      b.iter(|| {
        let mut pole = Pole::new(height, 0);
        for &(y, value) in writes {
          pole.set(y, value);
        }
        black_box(pole.run_count())
      })
    });
  }

  group.finish();
}

// =============================================================================
// Synthesis and meshing
// =============================================================================

fn bench_heightfield(c: &mut Criterion) {
  let mut group = c.benchmark_group("heightfield");

  for lod in [0u32, 3] {
    let region = region(lod);
    group.bench_with_input(BenchmarkId::new("lod", lod), &region, |b, region| {
      b.iter(|| black_box(synthesized(region).density_run_count()))
    });
  }

  group.finish();
}

fn bench_surface_nets(c: &mut Criterion) {
  let region = region(3);
  let input = MeshInput {
    block: BlockId::from_raw(1),
    region,
    block_size: 32,
    voxels: Arc::new(synthesized(&region)),
    parent_voxels: None,
    child_address: None,
    neighbours_lod: 0,
  };
  let builder = SurfaceNetsMeshBuilder::new();

  c.bench_function("surface_nets (34³ heightfield)", |b| {
    b.iter(|| black_box(builder.build(&input).unwrap().triangle_count()))
  });
}

// =============================================================================
// Edits
// =============================================================================

fn bench_edits(c: &mut Criterion) {
  let region = region(3);
  let base = synthesized(&region);
  let edits = [
    (
      "line",
      VoxelEdit::line(IVec3::new(0, 30, 0), IVec3::new(33, 30, 33), DENSITY_FULL),
    ),
    (
      "sphere",
      VoxelEdit::sphere(IVec3::splat(16), 10, DENSITY_FULL),
    ),
  ];

  let mut group = c.benchmark_group("edits");
  for (name, edit) in edits {
    group.bench_function(name, |b| {
      b.iter(|| {
        let mut grid = base.clone();
        edit.apply(&region, &mut grid);
        black_box(grid.density(UVec3::splat(16)))
      })
    });
  }
  group.finish();
}

criterion_group!(
  benches,
  bench_pole_writes,
  bench_heightfield,
  bench_surface_nets,
  bench_edits
);
criterion_main!(benches);
