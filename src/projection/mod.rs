//! Projection core - flattened 2D measurements onto a 3D surface mesh
//!
//! Data flows one way through the submodules:
//! - normalize: percentage coordinates to physical distances
//! - extract: raw rows to canonical measurement records
//! - vertex_index: deduplicated, side-partitioned mesh vertices
//! - project: nearest-vertex matching and third-coordinate recovery
//!
//! Everything here is synchronous and in-memory. File and network access
//! happen before the core runs (see `dataset`, `mesh`, `catalog`).

pub mod extract;
pub mod normalize;
pub mod project;
pub mod vertex_index;

use thiserror::Error;

pub use extract::{PercentAxis, SchemaProfile};
pub use normalize::CoordinateRange;
pub use project::{ProjectedPoint, Projector, Side, SideSettings};
pub use vertex_index::VertexIndex;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("Schema error: required field '{field}' missing after applying profile '{profile}'")]
    Schema { profile: String, field: String },
    #[error("Invalid value in row {row}, field '{field}': {reason}")]
    InvalidValue {
        row: usize,
        field: String,
        reason: String,
    },
    #[error("Mesh has no vertices")]
    EmptyMesh,
    #[error("No candidate vertex on the {side} side of the mesh")]
    NoCandidateVertex { side: Side },
    #[error("{labels} side labels given for {points} points")]
    LabelCountMismatch { points: usize, labels: usize },
    #[error("Failed to load mesh: {0}")]
    MeshLoad(String),
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
