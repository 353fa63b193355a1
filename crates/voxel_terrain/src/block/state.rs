//! Block generation state machine.
//!
//! ```text
//!   Initial ─► Setup ─► GeneratingVoxel ─┬─► GeneratingMesh ─► Ready
//!                             ▲           └─► Empty
//!                             └── dirty (Ready, Empty or in flight)
//!
//!   GeneratingVoxel | GeneratingMesh ── job failed ──► Initial
//!   Ready ── neighbour LOD mask changed ──► GeneratingMesh
//! ```

/// Generation state of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BlockState {
  /// Created, not yet scheduled.
  #[default]
  Initial,
  /// Region of interest; bookkeeping allocated, no job yet.
  Setup,
  /// Voxel synthesis job issued or about to be.
  GeneratingVoxel,
  /// Voxels committed with at least one solid/void transition; mesh pending.
  GeneratingMesh,
  /// Mesh committed and presentable.
  Ready,
  /// Voxels committed and uniform; nothing to mesh.
  Empty,
}

impl BlockState {
  /// True when `self -> next` is a legal transition.
  pub fn can_transition_to(self, next: BlockState) -> bool {
    use BlockState::*;
    matches!(
      (self, next),
      (Initial, Setup)
        | (Setup, GeneratingVoxel)
        | (GeneratingVoxel, GeneratingVoxel)
        | (GeneratingVoxel, GeneratingMesh)
        | (GeneratingVoxel, Empty)
        | (GeneratingVoxel, Initial)
        | (GeneratingMesh, Ready)
        | (GeneratingMesh, GeneratingVoxel)
        | (GeneratingMesh, Initial)
        | (Ready, GeneratingVoxel)
        | (Ready, GeneratingMesh)
        | (Empty, GeneratingVoxel)
    )
  }

  /// True while a generation phase is active.
  #[inline]
  pub fn is_generating(self) -> bool {
    matches!(self, BlockState::GeneratingVoxel | BlockState::GeneratingMesh)
  }

  /// True once voxel content has been committed at least once.
  #[inline]
  pub fn is_settled(self) -> bool {
    matches!(self, BlockState::Ready | BlockState::Empty)
  }
}

#[cfg(test)]
mod tests {
  use super::BlockState::*;
  use super::*;

  const ALL: [BlockState; 6] = [Initial, Setup, GeneratingVoxel, GeneratingMesh, Ready, Empty];

  #[test]
  fn test_mesh_requires_voxels_first() {
    for from in ALL {
      if from.can_transition_to(GeneratingMesh) {
        assert!(
          matches!(from, GeneratingVoxel | Ready),
          "{from:?} must not reach GeneratingMesh"
        );
      }
    }
    assert!(!Initial.can_transition_to(GeneratingMesh));
    assert!(!Setup.can_transition_to(GeneratingMesh));
  }

  #[test]
  fn test_empty_only_from_voxel_generation() {
    let sources: Vec<_> = ALL.into_iter().filter(|s| s.can_transition_to(Empty)).collect();
    assert_eq!(sources, vec![GeneratingVoxel]);
  }

  #[test]
  fn test_ready_only_from_mesh_generation() {
    let sources: Vec<_> = ALL.into_iter().filter(|s| s.can_transition_to(Ready)).collect();
    assert_eq!(sources, vec![GeneratingMesh]);
  }

  #[test]
  fn test_dirty_reentry() {
    assert!(Ready.can_transition_to(GeneratingVoxel));
    assert!(Empty.can_transition_to(GeneratingVoxel));
    assert!(!Empty.can_transition_to(GeneratingMesh));
  }

  #[test]
  fn test_failures_return_to_initial() {
    assert!(GeneratingVoxel.can_transition_to(Initial));
    assert!(GeneratingMesh.can_transition_to(Initial));
    assert!(!Ready.can_transition_to(Initial));
  }

  #[test]
  fn test_default_is_initial() {
    assert_eq!(BlockState::default(), Initial);
    assert!(!Initial.is_settled());
    assert!(Empty.is_settled());
    assert!(GeneratingMesh.is_generating());
  }
}
