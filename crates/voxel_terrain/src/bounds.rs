//! World-space boxes in double precision.

use glam::DVec3;
use serde::Deserialize;

/// Inclusive axis-aligned box.
///
/// Limits root discovery and selects blocks in
/// [`TerrainManager::query`](crate::manager::TerrainManager::query).
/// Reads from TOML as `{ min = [x, y, z], max = [x, y, z] }`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(from = "Corners")]
pub struct DAabb3 {
	pub min: DVec3,
	pub max: DVec3,
}

#[derive(Deserialize)]
struct Corners {
	min: [f64; 3],
	max: [f64; 3],
}

impl From<Corners> for DAabb3 {
	fn from(corners: Corners) -> Self {
		Self {
			min: corners.min.into(),
			max: corners.max.into(),
		}
	}
}

impl DAabb3 {
	/// Debug-asserts `min <= max` per axis.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		let aabb = Self { min, max };
		debug_assert!(aabb.is_valid(), "inverted box {min} .. {max}");
		aabb
	}

	#[inline]
	pub fn is_valid(&self) -> bool {
		self.min.cmple(self.max).all()
	}

	/// Shared faces and corners count as overlap.
	#[inline]
	pub fn overlaps(&self, other: &DAabb3) -> bool {
		self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
	}

	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		self.min.cmple(point).all() && point.cmple(self.max).all()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_touching_boxes_overlap() {
		let a = DAabb3::new(DVec3::ZERO, DVec3::splat(32.0));
		let b = DAabb3::new(DVec3::new(32.0, 0.0, 0.0), DVec3::new(64.0, 32.0, 32.0));
		let c = DAabb3::new(DVec3::new(33.0, 0.0, 0.0), DVec3::new(64.0, 32.0, 32.0));
		assert!(a.overlaps(&b) && b.overlaps(&a));
		assert!(!a.overlaps(&c));
		assert!(a.contains_point(DVec3::splat(32.0)));
		assert!(!a.contains_point(DVec3::new(0.0, -0.5, 0.0)));
	}

	#[test]
	fn test_reads_corner_arrays() {
		let aabb: DAabb3 = toml::from_str("min = [0.0, -8.0, 0.0]\nmax = [64.0, 8.0, 64.0]").unwrap();
		assert_eq!(aabb.min, DVec3::new(0.0, -8.0, 0.0));
		assert!(aabb.is_valid());
	}
}
