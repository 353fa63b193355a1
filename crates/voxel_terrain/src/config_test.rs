use glam::DVec3;

use super::*;

// ============================================================================
// Batch 1: Defaults and parsing
// ============================================================================

#[test]
fn test_default_is_valid() {
  let config = TerrainConfig::default();
  config.validate().unwrap();
  assert_eq!(config.geometry(), BlockGeometry::new(32, 2, 4));
  assert_eq!(config.lod_selector().unwrap().lod_count(), 4);
}

#[test]
fn test_empty_document_uses_defaults() {
  assert_eq!(TerrainConfig::from_toml_str("").unwrap(), TerrainConfig::default());
}

#[test]
fn test_partial_document() {
  let config = TerrainConfig::from_toml_str(
    r#"
      block_size = 16
      lod_count = 2
      seams = "none"
      rediscovery_distance = 4.0

      [budget]
      max_in_flight = 8

      [heightfield]
      seed = 7
      amplitude = 40.0

      [world_bounds]
      min = [0.0, -64.0, 0.0]
      max = [256.0, 64.0, 256.0]
    "#,
  )
  .unwrap();

  assert_eq!(config.block_size, 16);
  assert_eq!(config.lod_count, 2);
  assert_eq!(config.seams, SeamMode::None);
  assert_eq!(config.rediscovery_distance, Some(4.0));
  assert_eq!(config.budget.max_in_flight, 8);
  assert_eq!(
    config.budget.max_submissions_per_update,
    SchedulingBudget::DEFAULT.max_submissions_per_update
  );
  assert_eq!(config.heightfield.seed, 7);
  assert_eq!(config.heightfield.amplitude, 40.0);
  assert_eq!(config.heightfield.octaves, HeightfieldSettings::default().octaves);
  let bounds = config.world_bounds.unwrap();
  assert_eq!(bounds.min, DVec3::new(0.0, -64.0, 0.0));
}

#[test]
fn test_explicit_lod_ranges() {
  let config = TerrainConfig::from_toml_str(
    r#"
      lod_count = 2
      lod_ranges = [
        { min_distance_sq = 100.0, max_distance_sq = 1000.0 },
        { min_distance_sq = 0.0, max_distance_sq = 120.0 },
      ]
    "#,
  )
  .unwrap();
  let selector = config.lod_selector().unwrap();
  assert_eq!(selector.select_for_distance(110.0), Some(1));
  assert_eq!(selector.select_for_distance(500.0), Some(0));
}

// ============================================================================
// Batch 2: Validation
// ============================================================================

#[test]
fn test_parse_error() {
  let result = TerrainConfig::from_toml_str("block_size = \"big\"");
  assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_rejects_bad_values() {
  let invalid = [
    TerrainConfig::default().with_block_size(1),
    TerrainConfig::default().with_lod_count(0),
    TerrainConfig::default().with_lod_count(17),
    TerrainConfig::default().with_finest_radius(0.0),
    TerrainConfig::default().with_rediscovery_distance(Some(-1.0)),
    TerrainConfig::default().with_world_bounds(DAabb3 {
      min: DVec3::ONE,
      max: DVec3::ZERO,
    }),
    TerrainConfig::default().with_block_size(1 << 20).with_lod_count(16),
    TerrainConfig {
      block_overlap: 0,
      ..Default::default()
    },
    TerrainConfig {
      lod_overlap: 1.5,
      ..Default::default()
    },
  ];
  for config in invalid {
    assert!(
      matches!(config.validate(), Err(ConfigError::Invalid(_))),
      "{config:?} should be rejected"
    );
  }
}

#[test]
fn test_root_extent_must_fit_i32() {
  let largest = TerrainConfig::default().with_block_size(1 << 15).with_lod_count(16);
  largest.validate().unwrap();
  let overflowing = largest.with_block_size(1 << 16);
  let Err(ConfigError::Invalid(message)) = overflowing.validate() else {
    panic!("root extent past i32 should be rejected");
  };
  assert!(message.contains("i32"), "{message}");
}

#[test]
fn test_lod_range_count_must_match() {
  let mut config = TerrainConfig::default().with_lod_ranges(vec![LodRange::new(0.0, 10.0)]);
  config.validate().unwrap();
  config.lod_count = 3;
  assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_missing_file() {
  let result = TerrainConfig::load(Path::new("/nonexistent/terrain.toml"));
  assert!(matches!(result, Err(ConfigError::Io { .. })));
}
