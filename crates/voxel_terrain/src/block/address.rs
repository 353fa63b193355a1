//! BlockAddress - value type naming a block position in the LOD hierarchy.
//!
//! Positions are grid coordinates at the block's own LOD. LOD 0 is the
//! coarsest level; each finer level doubles the grid resolution.

use glam::IVec3;

/// Block position at a given LOD.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BlockAddress {
  /// Level of detail (0 = coarsest, higher = finer).
  pub lod: u32,
  /// Grid position at this block's LOD.
  pub position: IVec3,
}

impl BlockAddress {
  pub fn new(lod: u32, position: IVec3) -> Self {
    Self { lod, position }
  }

  /// Offset of `octant` inside its parent.
  ///
  /// Octant bits: bit 0 = +X, bit 1 = +Y, bit 2 = +Z.
  #[inline]
  pub fn octant_offset(octant: u8) -> IVec3 {
    debug_assert!(octant < 8, "octant out of range: {octant}");
    IVec3::new(
      (octant & 1) as i32,
      ((octant >> 1) & 1) as i32,
      ((octant >> 2) & 1) as i32,
    )
  }

  /// Child block one LOD finer.
  pub fn child(&self, octant: u8) -> Self {
    Self {
      lod: self.lod + 1,
      position: self.position * 2 + Self::octant_offset(octant),
    }
  }

  /// Parent block and this block's octant within it. `None` at LOD 0.
  pub fn parent(&self) -> Option<(Self, u8)> {
    if self.lod == 0 {
      return None;
    }
    let rem = self.position.rem_euclid(IVec3::splat(2));
    let octant = (rem.x | (rem.y << 1) | (rem.z << 2)) as u8;
    Some((
      Self {
        lod: self.lod - 1,
        position: self.position.div_euclid(IVec3::splat(2)),
      },
      octant,
    ))
  }

  /// Position of the LOD 0 ancestor.
  #[inline]
  pub fn root(&self) -> IVec3 {
    IVec3::new(
      self.position.x >> self.lod,
      self.position.y >> self.lod,
      self.position.z >> self.lod,
    )
  }

  /// Same-LOD neighbour across `face`.
  #[inline]
  pub fn neighbour(&self, face: Face) -> Self {
    Self {
      lod: self.lod,
      position: self.position + face.offset(),
    }
  }
}

/// One of the six block faces.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Face {
  NegX,
  PosX,
  NegY,
  PosY,
  NegZ,
  PosZ,
}

impl Face {
  pub const ALL: [Face; 6] = [
    Face::NegX,
    Face::PosX,
    Face::NegY,
    Face::PosY,
    Face::NegZ,
    Face::PosZ,
  ];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  #[inline]
  pub fn offset(self) -> IVec3 {
    match self {
      Face::NegX => IVec3::NEG_X,
      Face::PosX => IVec3::X,
      Face::NegY => IVec3::NEG_Y,
      Face::PosY => IVec3::Y,
      Face::NegZ => IVec3::NEG_Z,
      Face::PosZ => IVec3::Z,
    }
  }

  #[inline]
  pub fn opposite(self) -> Face {
    match self {
      Face::NegX => Face::PosX,
      Face::PosX => Face::NegX,
      Face::NegY => Face::PosY,
      Face::PosY => Face::NegY,
      Face::NegZ => Face::PosZ,
      Face::PosZ => Face::NegZ,
    }
  }

  /// Bit of this face in a neighbour-LOD mask.
  ///
  /// ```text
  /// X+ 0x20  X- 0x10  Y+ 0x08  Y- 0x04  Z+ 0x02  Z- 0x01
  /// ```
  #[inline]
  pub fn lod_bit(self) -> u8 {
    match self {
      Face::PosX => 0x20,
      Face::NegX => 0x10,
      Face::PosY => 0x08,
      Face::NegY => 0x04,
      Face::PosZ => 0x02,
      Face::NegZ => 0x01,
    }
  }

  /// Axis index (0 = X, 1 = Y, 2 = Z).
  #[inline]
  pub fn axis(self) -> usize {
    self.index() / 2
  }

  #[inline]
  pub fn is_positive(self) -> bool {
    self.index() % 2 == 1
  }
}

#[cfg(test)]
#[path = "address_test.rs"]
mod address_test;
