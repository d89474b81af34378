//! Triangulated surface mesh - STL loading and origin alignment

use crate::projection::{ProjectionError, Result};
use std::path::Path;

/// A 3D point as [x, y, z]
pub type Vertex = [f64; 3];

/// One mesh triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }
}

/// Immutable triangulated surface
#[derive(Debug, Clone)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a mesh from triangles, rejecting an empty set or any
    /// non-finite coordinate
    pub fn new(triangles: Vec<Triangle>) -> Result<Self> {
        if triangles.is_empty() {
            return Err(ProjectionError::EmptyMesh);
        }
        let mesh = Self { triangles };
        mesh.check_finite()?;
        Ok(mesh)
    }

    /// Fails on the first corner with a NaN or infinite coordinate
    pub fn check_finite(&self) -> Result<()> {
        for (t, tri) in self.triangles.iter().enumerate() {
            if let Some(vertex) = tri.vertices.iter().find(|v| v.iter().any(|c| !c.is_finite())) {
                return Err(ProjectionError::InvalidMesh(format!(
                    "triangle {} has non-finite vertex {:?}",
                    t, vertex
                )));
            }
        }
        Ok(())
    }

    /// Load mesh from an ASCII or binary STL file
    pub fn from_stl<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading mesh from {:?}", path);

        let mut file =
            std::fs::File::open(path).map_err(|e| ProjectionError::MeshLoad(e.to_string()))?;
        let stl =
            stl_io::read_stl(&mut file).map_err(|e| ProjectionError::MeshLoad(e.to_string()))?;

        let corner = |index: usize| -> Vertex {
            let v = &stl.vertices[index];
            [v[0] as f64, v[1] as f64, v[2] as f64]
        };

        let triangles: Vec<Triangle> = stl
            .faces
            .iter()
            .map(|face| {
                Triangle::new(
                    corner(face.vertices[0]),
                    corner(face.vertices[1]),
                    corner(face.vertices[2]),
                )
            })
            .collect();

        tracing::debug!(
            "STL parsed: {} triangles, {} indexed vertices",
            triangles.len(),
            stl.vertices.len()
        );

        Self::new(triangles)
    }

    /// Per-axis minimum and maximum over all triangle corners
    pub fn bounds(&self) -> (Vertex, Vertex) {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];

        for vertex in self.vertices() {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex[axis]);
                max[axis] = max[axis].max(vertex[axis]);
            }
        }

        (min, max)
    }

    /// Translate the mesh so the minimum along every axis is zero
    pub fn align_to_origin(&mut self) {
        let (min, _) = self.bounds();
        for tri in &mut self.triangles {
            for vertex in &mut tri.vertices {
                for axis in 0..3 {
                    vertex[axis] -= min[axis];
                }
            }
        }
        tracing::debug!("Mesh shifted by {:?} to the origin", min.map(|m| -m));
    }

    /// All triangle corners in triangle order, shared corners repeated
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.triangles.iter().flat_map(|tri| tri.vertices.iter())
    }
}
