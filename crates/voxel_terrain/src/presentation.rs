//! ScenePublisher - callback interface for whatever displays block meshes.
//!
//! The manager calls into it from [`update`](crate::TerrainManager::update)
//! only, on the update thread; nothing here needs to be thread-safe.

use std::collections::HashMap;
use std::sync::Arc;

use glam::DAffine3;

use crate::block::BlockId;
use crate::mesh::TerrainMesh;

/// Receives mesh visibility changes.
///
/// # Example
///
/// ```ignore
/// struct Renderer { handles: HashMap<BlockId, GpuMesh> }
///
/// impl ScenePublisher for Renderer {
///     fn publish(&mut self, block: BlockId, mesh: Arc<TerrainMesh>, transform: DAffine3) {
///         self.handles.insert(block, upload(&mesh, transform));
///     }
///     fn retract(&mut self, block: BlockId) {
///         self.handles.remove(&block);
///     }
/// }
/// ```
pub trait ScenePublisher {
  /// Show `mesh` for `block`, replacing whatever was shown for it.
  ///
  /// `transform` maps block-local voxel units to world space.
  fn publish(&mut self, block: BlockId, mesh: Arc<TerrainMesh>, transform: DAffine3);

  /// Stop showing `block`.
  fn retract(&mut self, block: BlockId);
}

/// No-op implementation for headless operation.
pub struct NullScene;

impl ScenePublisher for NullScene {
  fn publish(&mut self, _block: BlockId, _mesh: Arc<TerrainMesh>, _transform: DAffine3) {}

  fn retract(&mut self, _block: BlockId) {}
}

/// Keeps the currently shown meshes in a map; useful for tools and tests.
#[derive(Default)]
pub struct SceneSnapshot {
  pub shown: HashMap<BlockId, (Arc<TerrainMesh>, DAffine3)>,
  pub publishes: usize,
  pub retracts: usize,
}

impl SceneSnapshot {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_shown(&self, block: BlockId) -> bool {
    self.shown.contains_key(&block)
  }

  /// Triangles across all shown meshes.
  pub fn triangle_count(&self) -> usize {
    self.shown.values().map(|(mesh, _)| mesh.triangle_count()).sum()
  }
}

impl ScenePublisher for SceneSnapshot {
  fn publish(&mut self, block: BlockId, mesh: Arc<TerrainMesh>, transform: DAffine3) {
    self.publishes += 1;
    self.shown.insert(block, (mesh, transform));
  }

  fn retract(&mut self, block: BlockId) {
    self.retracts += 1;
    self.shown.remove(&block);
  }
}
