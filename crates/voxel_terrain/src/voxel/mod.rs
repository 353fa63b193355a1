//! Voxel storage: run-length encoded poles assembled into dense grids.

pub mod grid;
pub mod line;
pub mod pole;

pub use grid::{is_solid, RayHit, VoxelGrid, DENSITY_FULL, DENSITY_SURFACE, DENSITY_VOID};
pub use line::LineSteps;
pub use pole::{Pole, Run};
