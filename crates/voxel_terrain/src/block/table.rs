//! BlockTable - id-indexed arena owning every block.
//!
//! Cross-references between blocks are ids, so eviction never leaves a
//! dangling link: lookups of a removed id simply miss.

use std::collections::HashMap;

use super::{BlockAddress, BlockGeometry, BlockId, Face, TerrainBlock};

pub struct BlockTable {
  blocks: HashMap<BlockId, TerrainBlock>,
  index: HashMap<BlockAddress, BlockId>,
  geometry: BlockGeometry,
  next_id: u64,
}

impl BlockTable {
  pub fn new(geometry: BlockGeometry) -> Self {
    Self {
      blocks: HashMap::new(),
      index: HashMap::new(),
      geometry,
      next_id: 1,
    }
  }

  #[inline]
  pub fn geometry(&self) -> &BlockGeometry {
    &self.geometry
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  #[inline]
  pub fn get(&self, id: BlockId) -> Option<&TerrainBlock> {
    self.blocks.get(&id)
  }

  #[inline]
  pub(crate) fn get_mut(&mut self, id: BlockId) -> Option<&mut TerrainBlock> {
    self.blocks.get_mut(&id)
  }

  #[inline]
  pub fn contains(&self, id: BlockId) -> bool {
    self.blocks.contains_key(&id)
  }

  /// Block at `address`, if one exists.
  #[inline]
  pub fn find(&self, address: &BlockAddress) -> Option<BlockId> {
    self.index.get(address).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = &TerrainBlock> {
    self.blocks.values()
  }

  pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TerrainBlock> {
    self.blocks.values_mut()
  }

  /// All ids in creation order.
  pub fn ids(&self) -> Vec<BlockId> {
    let mut ids: Vec<_> = self.blocks.keys().copied().collect();
    ids.sort_unstable();
    ids
  }

  /// Root (LOD 0) block ids.
  pub fn roots(&self) -> Vec<BlockId> {
    let mut roots: Vec<_> = self
      .blocks
      .values()
      .filter(|block| block.parent.is_none())
      .map(|block| block.id)
      .collect();
    roots.sort_unstable();
    roots
  }

  /// Create an `Initial` block and link it with its same-LOD neighbours.
  pub(crate) fn insert(&mut self, address: BlockAddress, parent: Option<BlockId>) -> BlockId {
    debug_assert!(!self.index.contains_key(&address), "duplicate block at {address:?}");
    let id = BlockId(self.next_id);
    self.next_id += 1;

    let mut block = TerrainBlock::new(id, address, &self.geometry, parent);
    for face in Face::ALL {
      let Some(&neighbour_id) = self.index.get(&address.neighbour(face)) else {
        continue;
      };
      block.neighbours[face.index()] = Some(neighbour_id);
      if let Some(neighbour) = self.blocks.get_mut(&neighbour_id) {
        neighbour.neighbours[face.opposite().index()] = Some(id);
        neighbour.dirty_neighbours = true;
      }
    }
    block.dirty_neighbours = true;

    self.index.insert(address, id);
    self.blocks.insert(id, block);
    id
  }

  /// Create the eight children of `parent`.
  pub(crate) fn create_children(&mut self, parent: BlockId) -> Option<[BlockId; 8]> {
    let address = self.blocks.get(&parent)?.address;
    if address.lod >= self.geometry.finest_lod() {
      return None;
    }
    let children: [BlockId; 8] =
      std::array::from_fn(|octant| self.insert(address.child(octant as u8), Some(parent)));
    if let Some(block) = self.blocks.get_mut(&parent) {
      block.children = Some(children);
    }
    Some(children)
  }

  /// Remove a block, unlinking neighbours and the parent's child set.
  ///
  /// Siblings are evicted together, so losing one child drops the parent's
  /// whole child set.
  pub(crate) fn remove(&mut self, id: BlockId) -> Option<TerrainBlock> {
    let block = self.blocks.remove(&id)?;
    self.index.remove(&block.address);

    for face in Face::ALL {
      let Some(neighbour_id) = block.neighbours[face.index()] else {
        continue;
      };
      if let Some(neighbour) = self.blocks.get_mut(&neighbour_id) {
        neighbour.neighbours[face.opposite().index()] = None;
        neighbour.dirty_neighbours = true;
      }
    }

    if let Some(parent) = block.parent.and_then(|parent| self.blocks.get_mut(&parent)) {
      if parent.children.is_some_and(|children| children.contains(&id)) {
        parent.children = None;
        parent.dirty_neighbours = true;
      }
    }
    Some(block)
  }

  /// Flag the six same-LOD neighbours of `id` for a neighbour-LOD recompute.
  pub(crate) fn mark_neighbours_dirty(&mut self, id: BlockId) {
    let Some(neighbours) = self.blocks.get(&id).map(|block| block.neighbours) else {
      return;
    };
    for neighbour_id in neighbours.into_iter().flatten() {
      if let Some(neighbour) = self.blocks.get_mut(&neighbour_id) {
        neighbour.dirty_neighbours = true;
      }
    }
  }

  /// Neighbour-LOD mask of `id`: a face bit is set when the same-LOD
  /// neighbour is missing or out of range, so coarser content borders it.
  /// Always 0 at LOD 0.
  pub fn compute_neighbours_lod(&self, id: BlockId) -> u8 {
    let Some(block) = self.blocks.get(&id) else {
      return 0;
    };
    if block.address.lod == 0 {
      return 0;
    }
    Face::ALL.iter().fold(0, |mask, &face| {
      let covered = block.neighbours[face.index()]
        .and_then(|neighbour| self.blocks.get(&neighbour))
        .is_some_and(|neighbour| neighbour.in_range);
      if covered {
        mask
      } else {
        mask | face.lod_bit()
      }
    })
  }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;
