//! Error types for voxelization and classification.

use thiserror::Error;
use voxcrete_solid::SolidError;

/// Errors that can occur while building or classifying a voxel grid.
#[derive(Error, Debug)]
pub enum VoxelError {
    /// Invalid grid or sampling settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The bounding box has no volume along some axis, or is not finite.
    #[error("degenerate bounding box: {0}")]
    DegenerateBounds(String),

    /// Bucket table violates its ordering or coverage rules.
    #[error("invalid bucket table: {0}")]
    InvalidBucketTable(String),

    /// An operation needs a voxel grid that has not been built.
    #[error("no voxel grid has been built")]
    NotBuilt,

    /// Solid construction failed.
    #[error(transparent)]
    Solid(#[from] SolidError),

    /// Reading or writing a settings or bucket file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// JSON document could not be parsed or written.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for voxel operations.
pub type Result<T> = std::result::Result<T, VoxelError>;
