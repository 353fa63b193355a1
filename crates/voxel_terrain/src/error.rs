//! Error types.
//!
//! Out-of-bounds voxel access is not represented here: it is a contract
//! violation and panics.

use std::path::PathBuf;

use glam::UVec3;
use thiserror::Error;

/// Errors from [`VoxelGrid`](crate::voxel::VoxelGrid) setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
  #[error("grid already initialized as {current}, clear it before resizing to {requested}")]
  DimensionMismatch { current: UVec3, requested: UVec3 },

  #[error("grid dimensions must be at least 2 on every axis, got {0}")]
  InvalidDimensions(UVec3),
}

/// Failure of a synthesis or mesh-build job.
///
/// Local to one block: the block falls back to `Initial` and is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
  #[error("voxel synthesis failed: {0}")]
  Synthesis(String),

  #[error("mesh build failed: {0}")]
  Meshing(String),

  #[error(transparent)]
  Grid(#[from] GridError),

  #[error("task failed: {0}")]
  Task(#[from] TaskFailure),
}

/// Failure reported by a task service instead of a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
  #[error("task panicked: {0}")]
  Panicked(String),

  #[error("task result was lost")]
  Lost,

  #[error("unknown task")]
  Unknown,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config")]
  Parse(#[from] toml::de::Error),

  #[error("invalid config: {0}")]
  Invalid(String),

  #[error("failed to build worker pool")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
