//! Error types for solid construction.

use thiserror::Error;

/// Errors that can occur while building a [`Solid`](crate::Solid).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolidError {
    /// The mesh carries no index buffer, so no BVH can be built over it.
    #[error("mesh `{0}` has no index buffer")]
    MissingIndexBuffer(String),

    /// Vertex buffer length is not a multiple of three.
    #[error("mesh `{mesh}` has a vertex buffer of length {len}, not a multiple of 3")]
    MalformedVertices {
        /// Mesh identifier.
        mesh: String,
        /// Offending buffer length.
        len: usize,
    },

    /// The world transform cannot be inverted.
    #[error("world transform of mesh `{0}` is singular")]
    SingularTransform(String),
}

/// Result type for solid operations.
pub type Result<T> = std::result::Result<T, SolidError>;
