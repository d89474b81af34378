//! Vertex index - unique rounded mesh vertices split into ventral and dorsal candidates
//!
//! Vertices are rounded before deduplication so corners shared by adjacent
//! triangles collapse to one entry despite float noise. Equality after
//! rounding is exact (bit-equal), not a tolerance merge.
//!
//! The two partitions overlap: axis-0 values in (dorsal_min, ventral_max)
//! belong to both sides. The band absorbs vertices along the rim where the
//! two faces meet.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::{ProjectionError, Result};
use crate::mesh::{Mesh, Vertex};

/// The two opposing faces of the organ surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Ventral,
    Dorsal,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Ventral => write!(f, "ventral"),
            Side::Dorsal => write!(f, "dorsal"),
        }
    }
}

/// Axis-0 thresholds that split the mesh into sides
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionBounds {
    /// Ventral candidates satisfy x < ventral_max
    pub ventral_max: f64,
    /// Dorsal candidates satisfy x > dorsal_min
    pub dorsal_min: f64,
}

impl Default for PartitionBounds {
    fn default() -> Self {
        Self {
            ventral_max: 9.0,
            dorsal_min: 8.7,
        }
    }
}

impl PartitionBounds {
    pub fn contains(&self, side: Side, vertex: &Vertex) -> bool {
        match side {
            Side::Ventral => vertex[0] < self.ventral_max,
            Side::Dorsal => vertex[0] > self.dorsal_min,
        }
    }
}

/// Deduplicated vertex set with per-side candidate lists
#[derive(Debug, Clone)]
pub struct VertexIndex {
    vertices: Vec<Vertex>,
    ventral: Vec<usize>,
    dorsal: Vec<usize>,
    bounds: PartitionBounds,
}

impl VertexIndex {
    /// Build the index from a mesh.
    ///
    /// Unique vertices are kept in lexicographic (x, y, z) order, so the
    /// candidate order, and with it nearest-match tie-breaking, does not
    /// depend on how the mesh enumerates its triangles.
    ///
    /// Fails with `InvalidMesh` on any NaN or infinite coordinate.
    pub fn build(mesh: &Mesh, decimals: i32, bounds: PartitionBounds) -> Result<Self> {
        mesh.check_finite()?;

        let mut vertices: Vec<Vertex> = mesh
            .vertices()
            .map(|v| v.map(|c| round_to(c, decimals)))
            .collect();

        if vertices.is_empty() {
            return Err(ProjectionError::EmptyMesh);
        }

        let raw_count = vertices.len();
        vertices.sort_by(lexicographic);
        vertices.dedup_by(|a, b| same_bits(a, b));

        let ventral = Self::partition(&vertices, &bounds, Side::Ventral);
        let dorsal = Self::partition(&vertices, &bounds, Side::Dorsal);

        tracing::info!(
            "Vertex index built: {} corners -> {} unique ({} ventral, {} dorsal)",
            raw_count,
            vertices.len(),
            ventral.len(),
            dorsal.len()
        );

        Ok(Self {
            vertices,
            ventral,
            dorsal,
            bounds,
        })
    }

    fn partition(vertices: &[Vertex], bounds: &PartitionBounds, side: Side) -> Vec<usize> {
        vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| bounds.contains(side, v))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices into `vertices()` eligible for the given side
    pub fn candidates(&self, side: Side) -> &[usize] {
        match side {
            Side::Ventral => &self.ventral,
            Side::Dorsal => &self.dorsal,
        }
    }

    pub fn vertex(&self, index: usize) -> &Vertex {
        &self.vertices[index]
    }

    #[cfg(test)]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn bounds(&self) -> PartitionBounds {
        self.bounds
    }

    /// Number of unique vertices; never zero
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }
}

/// Round half to even at `decimals` places, folding -0.0 into 0.0
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor + 0.0
}

fn lexicographic(a: &Vertex, b: &Vertex) -> Ordering {
    a[0].total_cmp(&b[0])
        .then(a[1].total_cmp(&b[1]))
        .then(a[2].total_cmp(&b[2]))
}

fn same_bits(a: &Vertex, b: &Vertex) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}
