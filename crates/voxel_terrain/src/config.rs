//! Terrain configuration, loadable from TOML.
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```toml
//! block_size = 32
//! lod_count = 5
//! finest_radius = 128.0
//! seams = "boundary_snap"
//!
//! [budget]
//! max_in_flight = 32
//!
//! [heightfield]
//! seed = 7
//! amplitude = 40.0
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::block::BlockGeometry;
use crate::bounds::DAabb3;
use crate::error::ConfigError;
use crate::lod::{LodRange, LodSelector};
use crate::pipeline::{HeightfieldSettings, SchedulingBudget, SeamMode};

/// Configuration for a [`TerrainManager`](crate::TerrainManager).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
  /// Voxel cells per block edge.
  pub block_size: u32,
  /// Extra samples past the positive faces of every block.
  pub block_overlap: u32,
  pub lod_count: u32,
  /// Outer radius of the finest LOD window, in world units.
  pub finest_radius: f64,
  /// Fraction by which adjacent LOD windows overlap.
  pub lod_overlap: f64,
  /// Explicit squared-distance windows, coarsest first. Overrides
  /// `finest_radius`/`lod_overlap`.
  pub lod_ranges: Option<Vec<LodRange>>,
  /// Density seeding fresh voxel grids.
  pub clear_density: u8,
  /// Roots are only created where they overlap these bounds.
  pub world_bounds: Option<DAabb3>,
  /// Minimum trigger movement before roots are rediscovered. `None`
  /// rediscovers every update.
  pub rediscovery_distance: Option<f64>,
  pub budget: SchedulingBudget,
  /// Worker threads for the rayon executor (0 = global pool).
  pub worker_threads: usize,
  pub seams: SeamMode,
  pub heightfield: HeightfieldSettings,
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self {
      block_size: 32,
      block_overlap: 2,
      lod_count: 4,
      finest_radius: 96.0,
      lod_overlap: 0.2,
      lod_ranges: None,
      clear_density: 0,
      world_bounds: None,
      rediscovery_distance: Some(8.0),
      budget: SchedulingBudget::DEFAULT,
      worker_threads: 0,
      seams: SeamMode::default(),
      heightfield: HeightfieldSettings::default(),
    }
  }
}

impl TerrainConfig {
  /// Parse and validate a TOML document.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Load and validate a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.block_size < 2 {
      return Err(ConfigError::Invalid(format!(
        "block_size must be at least 2, got {}",
        self.block_size
      )));
    }
    if self.block_overlap == 0 {
      return Err(ConfigError::Invalid(
        "block_overlap must be at least 1 so neighbouring blocks share samples".into(),
      ));
    }
    if !(1..=16).contains(&self.lod_count) {
      return Err(ConfigError::Invalid(format!(
        "lod_count must be within 1..=16, got {}",
        self.lod_count
      )));
    }
    let extent = BlockGeometry::root_sample_extent(self.block_size, self.block_overlap, self.lod_count);
    if extent > i32::MAX as u64 {
      return Err(ConfigError::Invalid(format!(
        "root blocks would span {extent} world units, more than i32 coordinates hold"
      )));
    }
    if let Some(ranges) = &self.lod_ranges {
      if ranges.len() != self.lod_count as usize {
        return Err(ConfigError::Invalid(format!(
          "lod_ranges has {} entries for {} LODs",
          ranges.len(),
          self.lod_count
        )));
      }
    }
    if let Some(bounds) = &self.world_bounds {
      if !bounds.is_valid() {
        return Err(ConfigError::Invalid(format!("world_bounds are inverted: {bounds:?}")));
      }
    }
    if self.rediscovery_distance.is_some_and(|distance| !(distance >= 0.0)) {
      return Err(ConfigError::Invalid("rediscovery_distance must not be negative".into()));
    }
    self.lod_selector().map(|_| ())
  }

  pub fn geometry(&self) -> BlockGeometry {
    BlockGeometry::new(self.block_size, self.block_overlap, self.lod_count)
  }

  pub fn lod_selector(&self) -> Result<LodSelector, ConfigError> {
    match &self.lod_ranges {
      Some(ranges) => LodSelector::new(ranges.clone()),
      None => LodSelector::doubling(self.lod_count, self.finest_radius, self.lod_overlap),
    }
  }

  // ===========================================================================
  // Builders
  // ===========================================================================

  pub fn with_block_size(mut self, block_size: u32) -> Self {
    self.block_size = block_size;
    self
  }

  pub fn with_lod_count(mut self, lod_count: u32) -> Self {
    self.lod_count = lod_count;
    self
  }

  pub fn with_finest_radius(mut self, radius: f64) -> Self {
    self.finest_radius = radius;
    self
  }

  pub fn with_lod_ranges(mut self, ranges: Vec<LodRange>) -> Self {
    self.lod_count = ranges.len() as u32;
    self.lod_ranges = Some(ranges);
    self
  }

  pub fn with_world_bounds(mut self, bounds: DAabb3) -> Self {
    self.world_bounds = Some(bounds);
    self
  }

  pub fn with_rediscovery_distance(mut self, distance: Option<f64>) -> Self {
    self.rediscovery_distance = distance;
    self
  }

  pub fn with_budget(mut self, budget: SchedulingBudget) -> Self {
    self.budget = budget;
    self
  }

  pub fn with_seams(mut self, seams: SeamMode) -> Self {
    self.seams = seams;
    self
  }

  pub fn with_heightfield(mut self, heightfield: HeightfieldSettings) -> Self {
    self.heightfield = heightfield;
    self
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
