//! Renderable block geometry.

use glam::Vec3;

/// Material identifier stored in voxel material poles.
pub type MaterialId = u8;

/// One mesh vertex, in block-local voxel units.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
  pub position: [f32; 3],
  /// Unit length; `+Y` where the surface gradient vanished.
  pub normal: [f32; 3],
  pub material: MaterialId,
}

impl Default for Vertex {
  fn default() -> Self {
    Self {
      position: [0.0; 3],
      normal: [0.0, 1.0, 0.0],
      material: 0,
    }
  }
}

/// Extent of a mesh's vertices. `None` until a vertex exists.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshBounds(Option<(Vec3, Vec3)>);

impl MeshBounds {
  pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
    positions.into_iter().fold(Self(None), |bounds, &p| {
      let p = Vec3::from_array(p);
      Self(Some(match bounds.0 {
        Some((min, max)) => (min.min(p), max.max(p)),
        None => (p, p),
      }))
    })
  }

  #[inline]
  pub fn min(&self) -> Option<Vec3> {
    self.0.map(|(min, _)| min)
  }

  #[inline]
  pub fn max(&self) -> Option<Vec3> {
    self.0.map(|(_, max)| max)
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.0.is_none()
  }
}

/// Triangle mesh of one block.
#[derive(Clone, Default, PartialEq)]
pub struct TerrainMesh {
  pub vertices: Vec<Vertex>,
  /// Three per triangle, counter-clockwise seen from outside the solid.
  pub indices: Vec<u32>,
  pub bounds: MeshBounds,
}

impl TerrainMesh {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.vertices.is_empty()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Refresh `bounds` after vertices moved.
  pub fn recompute_bounds(&mut self) {
    self.bounds = MeshBounds::from_positions(self.vertices.iter().map(|v| &v.position));
  }
}

impl std::fmt::Debug for TerrainMesh {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TerrainMesh")
      .field("vertices", &self.vertices.len())
      .field("triangles", &self.triangle_count())
      .field("bounds", &self.bounds)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_mesh_has_no_bounds() {
    let mut mesh = TerrainMesh::new();
    mesh.recompute_bounds();
    assert!(mesh.is_empty());
    assert!(mesh.bounds.is_empty());
    assert_eq!(mesh.bounds.min(), None);
  }

  #[test]
  fn test_recompute_bounds() {
    let mut mesh = TerrainMesh::new();
    for position in [[1.0, 2.0, 3.0], [-1.0, 5.0, 0.5], [0.0, 0.0, 4.0]] {
      mesh.vertices.push(Vertex {
        position,
        ..Default::default()
      });
    }
    mesh.recompute_bounds();
    assert_eq!(mesh.bounds.min(), Some(Vec3::new(-1.0, 0.0, 0.5)));
    assert_eq!(mesh.bounds.max(), Some(Vec3::new(1.0, 5.0, 4.0)));
  }
}
