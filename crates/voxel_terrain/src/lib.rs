//! voxel_terrain - Streaming, editable voxel terrain with octree LOD
//!
//! Terrain is split into cubic blocks arranged in an octree. Every block owns
//! a run-length encoded [`VoxelGrid`] and, once meshed, a [`TerrainMesh`].
//! A [`TerrainManager`] creates, refines and evicts blocks around trigger
//! points each update, generates their content on worker threads and
//! reports visibility changes to a [`ScenePublisher`].
//!
//! # Features
//!
//! - **RLE voxel poles**: each (x, z) column stores density and material as
//!   runs, so flat terrain costs a few runs per column
//! - **Octree LOD**: LOD 0 is the coarsest level; blocks refine into eight
//!   children where a finer LOD qualifies and the block has detail
//! - **Async generation**: voxel synthesis and surface-nets meshing run on a
//!   [`TaskService`]; stale results are detected and dropped
//! - **Persistent edits**: edits are logged and replayed on every later
//!   synthesis of the blocks they touch
//!
//! # Example
//!
//! ```ignore
//! use voxel_terrain::{SceneSnapshot, TerrainConfig, TerrainManager};
//!
//! let config = TerrainConfig::default();
//! let mut terrain = TerrainManager::with_defaults(&config)?;
//! let mut scene = SceneSnapshot::new();
//!
//! loop {
//!     let stats = terrain.update(&[camera_position], &mut scene);
//!     println!("{} blocks, {} triangles", stats.block_count, scene.triangle_count());
//! }
//! ```

pub mod block;
pub mod bounds;
pub mod config;
pub mod edit;
pub mod error;
pub mod lod;
pub mod manager;
pub mod mesh;
pub mod metrics;
pub mod pipeline;
pub mod presentation;
pub mod threading;
pub mod voxel;

// Re-export commonly used items
pub use block::{BlockAddress, BlockGeometry, BlockId, BlockState, Face, TerrainBlock};
pub use bounds::DAabb3;
pub use config::TerrainConfig;
pub use edit::{EditLog, EditShape, VoxelEdit};
pub use error::{ConfigError, GenerationError, GridError, TaskFailure};
pub use lod::{LodRange, LodSelector};
pub use manager::{TerrainManager, UpdateStats};
pub use mesh::{MaterialId, MeshBounds, TerrainMesh, Vertex};
pub use metrics::{LatencyWindow, PipelineMetrics};
pub use pipeline::{
  HeightfieldSettings, HeightfieldSynthesizer, MeshBuilder, SchedulingBudget, SeamMode,
  SurfaceNetsMeshBuilder, VoxelSynthesizer,
};
pub use presentation::{NullScene, SceneSnapshot, ScenePublisher};
pub use threading::{TaskExecutor, TaskId, TaskService};
pub use voxel::{RayHit, VoxelGrid, DENSITY_FULL, DENSITY_SURFACE, DENSITY_VOID};
