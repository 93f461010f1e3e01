//! Error types for the surface-cut pipeline.

use thiserror::Error;

/// Errors raised by the geometry core.
#[derive(Error, Debug)]
pub enum SurfaceCutError {
    /// A required input (image data, landmarks, mesh, candidates) is missing.
    #[error("insufficient input: {0}")]
    InsufficientInput(String),

    /// The plane did not cross the mesh.
    #[error("plane does not intersect the mesh")]
    NoIntersection,

    /// The index-to-physical matrix cannot be inverted.
    #[error("index-to-physical transform is singular")]
    DegenerateTransform,

    /// Two voxel grids of different shape were combined.
    #[error("grid shape mismatch: expected {expected:?}, found {found:?}")]
    GeometryMismatch {
        expected: [usize; 3],
        found: [usize; 3],
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for geometry core operations.
pub type Result<T> = std::result::Result<T, SurfaceCutError>;
