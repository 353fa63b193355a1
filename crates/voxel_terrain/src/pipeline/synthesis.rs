//! Voxel synthesis: procedural content plus replayed edits.

use glam::UVec3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::Deserialize;

use super::types::{JobOutput, JobResult, SynthesisJob, SynthesisRegion, VoxelSynthesizer};
use crate::error::GenerationError;
use crate::voxel::{VoxelGrid, DENSITY_FULL, DENSITY_SURFACE};

/// Job body for voxel generation.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "pipeline::synthesize"))]
pub(crate) fn run_synthesis(synthesizer: &dyn VoxelSynthesizer, job: &SynthesisJob) -> JobResult {
  let dims = job.region.dims;
  let mut grid = VoxelGrid::new(job.clear_density);
  grid.initialize(dims.x, dims.y, dims.z)?;
  synthesizer.synthesize(&job.region, &mut grid)?;
  for edit in &job.edits {
    edit.apply(&job.region, &mut grid);
  }
  let uniform = !grid.has_transition();
  Ok(JobOutput::Voxels { grid, uniform })
}

/// Density of a surface voxel filled to `fraction` (0..1).
#[inline]
fn partial_density(fraction: f64) -> u8 {
  let span = (DENSITY_FULL - DENSITY_SURFACE) as f64;
  (DENSITY_SURFACE as f64 + fraction.clamp(0.0, 1.0) * span).round() as u8
}

/// Parameters of [`HeightfieldSynthesizer`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeightfieldSettings {
  pub seed: u32,
  /// Mean surface height in world units.
  pub base_height: f64,
  /// Peak deviation from `base_height`.
  pub amplitude: f64,
  /// Noise frequency per world unit. Smaller = larger features.
  pub frequency: f64,
  pub octaves: usize,
  /// Material of the top `soil_depth` voxels.
  pub surface_material: u8,
  pub rock_material: u8,
  /// Soil thickness in world units.
  pub soil_depth: u32,
}

impl Default for HeightfieldSettings {
  fn default() -> Self {
    Self {
      seed: 1337,
      base_height: 32.0,
      amplitude: 24.0,
      frequency: 0.01,
      octaves: 4,
      surface_material: 1,
      rock_material: 2,
      soil_depth: 3,
    }
  }
}

/// Rolling-hills terrain from 2D fractal Perlin noise.
///
/// Columns are painted with [`VoxelGrid::set_pole`]: solid up to the surface,
/// one partially filled voxel at the surface, void above.
pub struct HeightfieldSynthesizer {
  settings: HeightfieldSettings,
  noise: Fbm<Perlin>,
}

impl HeightfieldSynthesizer {
  pub fn new(settings: HeightfieldSettings) -> Self {
    let noise = Fbm::<Perlin>::new(settings.seed)
      .set_octaves(settings.octaves.max(1))
      .set_frequency(settings.frequency)
      .set_persistence(0.5)
      .set_lacunarity(2.0);
    Self { settings, noise }
  }

  pub fn settings(&self) -> &HeightfieldSettings {
    &self.settings
  }

  /// Surface height at world (x, z).
  pub fn height_at(&self, x: f64, z: f64) -> f64 {
    self.settings.base_height + self.noise.get([x, z]) * self.settings.amplitude
  }
}

impl Default for HeightfieldSynthesizer {
  fn default() -> Self {
    Self::new(HeightfieldSettings::default())
  }
}

impl VoxelSynthesizer for HeightfieldSynthesizer {
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "synthesis::heightfield"))]
  fn synthesize(&self, region: &SynthesisRegion, grid: &mut VoxelGrid) -> Result<(), GenerationError> {
    let dims = grid.dimensions();
    if dims != region.dims {
      return Err(GenerationError::Synthesis(format!(
        "grid {dims} does not match region {}",
        region.dims
      )));
    }

    let scale = region.voxel_scale as f64;
    let soil = self.settings.soil_depth.div_ceil(region.voxel_scale as u32).max(1);
    for z in 0..dims.z {
      for x in 0..dims.x {
        let world = region.voxel_to_world(UVec3::new(x, 0, z));
        let surface = (self.height_at(world.x as f64, world.z as f64) - region.origin.y as f64) / scale;
        if surface <= 0.0 {
          continue;
        }

        let base = UVec3::new(x, 0, z);
        let solid = (surface.floor() as u32).min(dims.y);
        grid.set_pole(base, solid, DENSITY_FULL);
        if solid < dims.y {
          let fraction = surface - surface.floor();
          if fraction > 0.0 {
            grid.set_density(UVec3::new(x, solid, z), partial_density(fraction));
          }
        }

        let top = (solid + 1).min(dims.y);
        let soil_start = top.saturating_sub(soil);
        grid.set_material_pole(base, soil_start, self.settings.rock_material);
        grid.set_material_pole(
          UVec3::new(x, soil_start, z),
          top - soil_start,
          self.settings.surface_material,
        );
      }
    }
    Ok(())
  }
}
