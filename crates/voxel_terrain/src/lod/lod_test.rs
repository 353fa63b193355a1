use super::*;

// ============================================================================
// Batch 1: Table construction
// ============================================================================

#[test]
fn test_rejects_empty_table() {
  assert!(LodSelector::new(Vec::new()).is_err());
}

#[test]
fn test_rejects_inverted_range() {
  let err = LodSelector::new(vec![LodRange::new(50.0, 10.0)]).unwrap_err();
  assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_doubling_table() {
  let selector = LodSelector::doubling(3, 10.0, 0.5).unwrap();
  let ranges = selector.ranges();
  assert_eq!(selector.lod_count(), 3);

  // Finest level reaches the trigger.
  assert_eq!(ranges[2], LodRange::from_distances(0.0, 10.0));
  // Each coarser level starts inside the finer level's window.
  assert_eq!(ranges[1], LodRange::from_distances(5.0, 20.0));
  assert_eq!(ranges[0], LodRange::from_distances(10.0, 40.0));
  assert_eq!(selector.max_distance_sq(), 1600.0);
}

#[test]
fn test_doubling_rejects_bad_overlap() {
  assert!(LodSelector::doubling(2, 10.0, 1.0).is_err());
  assert!(LodSelector::doubling(2, 0.0, 0.2).is_err());
  assert!(LodSelector::doubling(0, 10.0, 0.2).is_err());
}

// ============================================================================
// Batch 2: Selection
// ============================================================================

#[test]
fn test_finest_qualifying_level_wins() {
  let selector = LodSelector::doubling(3, 10.0, 0.5).unwrap();
  assert_eq!(selector.select_for_distance(0.0), Some(2));
  assert_eq!(selector.select_for_distance(64.0), Some(2), "8 < 10 keeps the finest level");
  assert_eq!(selector.select_for_distance(225.0), Some(1), "15 falls in LOD1 only");
  assert_eq!(selector.select_for_distance(900.0), Some(0));
  assert_eq!(selector.select_for_distance(1601.0), None);
}

#[test]
fn test_select_uses_nearest_trigger() {
  let selector = LodSelector::new(vec![LodRange::new(0.0, 100.0)]).unwrap();
  let triggers = [DVec3::new(1000.0, 0.0, 0.0), DVec3::new(3.0, 4.0, 0.0)];

  assert_eq!(LodSelector::min_distance_sq(&triggers, DVec3::ZERO), Some(25.0));
  assert_eq!(selector.select_lod(&triggers, DVec3::ZERO), Some(0));
  assert_eq!(selector.select_lod(&triggers[..1], DVec3::ZERO), None);
}

#[test]
fn test_no_triggers_means_out_of_range() {
  let selector = LodSelector::new(vec![LodRange::new(0.0, 100.0)]).unwrap();
  assert_eq!(selector.select_lod(&[], DVec3::ZERO), None);
}

/// A trigger oscillating inside the overlap of two windows never changes
/// the selected level.
#[test]
fn test_overlap_hysteresis() {
  let selector =
    LodSelector::new(vec![LodRange::new(0.0, 120.0), LodRange::new(100.0, 1000.0)]).unwrap();

  let first = selector.select_for_distance(105.0);
  for step in 0..20 {
    let distance_sq = if step % 2 == 0 { 115.0 } else { 105.0 };
    assert_eq!(selector.select_for_distance(distance_sq), first);
  }
  assert_eq!(first, Some(1));
}
