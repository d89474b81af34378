//! Scene output - projected layers handed to an external renderer
//!
//! The renderer gets plain data: the mesh as triangles, one point layer per
//! dataset with a parallel intensity array, a visibility flag per layer and
//! camera settings. Nothing here knows how the scene is drawn.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use crate::config::ViewSettings;
use crate::mesh::{Mesh, Vertex};
use crate::projection::ProjectedPoint;

/// Tint used for the translucent organ surface
pub const SURFACE_COLOR: [f64; 3] = [0.960, 0.803, 0.650];
pub const SURFACE_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Serialize)]
pub struct SurfaceLayer {
    pub color: [f64; 3],
    pub alpha: f64,
    pub triangles: Vec<[Vertex; 3]>,
}

impl SurfaceLayer {
    pub fn from_mesh(mesh: &Mesh) -> Self {
        Self {
            color: SURFACE_COLOR,
            alpha: SURFACE_ALPHA,
            triangles: mesh.triangles.iter().map(|t| t.vertices).collect(),
        }
    }
}

/// One dataset's projected points
#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub colormap: String,
    pub visible: bool,
    pub points: Vec<[f64; 3]>,
    pub intensities: Vec<f64>,
}

impl Layer {
    pub fn new(
        id: &str,
        name: &str,
        colormap: &str,
        visible: bool,
        projected: &[ProjectedPoint],
        intensities: Vec<f64>,
    ) -> Result<Self> {
        if projected.len() != intensities.len() {
            anyhow::bail!(
                "Layer '{}': {} points but {} intensities",
                id,
                projected.len(),
                intensities.len()
            );
        }
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            colormap: colormap.to_string(),
            visible,
            points: projected.iter().map(|p| p.position).collect(),
            intensities,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub generated: String,
    pub view: ViewSettings,
    pub surface: SurfaceLayer,
    pub layers: Vec<Layer>,
}

impl Scene {
    pub fn new(view: ViewSettings, surface: SurfaceLayer, layers: Vec<Layer>) -> Self {
        Self {
            generated: chrono::Local::now().to_rfc3339(),
            view,
            surface,
            layers,
        }
    }

    /// Hide the named layers, leaving the rest untouched
    pub fn hide(&mut self, ids: &[String]) {
        let hidden: HashSet<&str> = ids.iter().map(String::as_str).collect();
        for layer in &mut self.layers {
            if hidden.contains(layer.id.as_str()) {
                layer.visible = false;
            }
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        tracing::info!("Scene written to {:?} ({} layers)", path, self.layers.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Triangle;
    use crate::projection::Side;

    fn point(x: f64) -> ProjectedPoint {
        ProjectedPoint {
            position: [x, 1.0, 2.0],
            side: Side::Ventral,
            vertex: 0,
        }
    }

    #[test]
    fn test_layer_length_mismatch() {
        let result = Layer::new("igle", "IGLE", "BuGn", true, &[point(0.0)], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_hide_and_serialize() {
        let mesh = Mesh::new(vec![Triangle::new([0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])]).unwrap();
        let layers = vec![
            Layer::new("igle", "IGLE", "BuGn", true, &[point(-1.1)], vec![3.0]).unwrap(),
            Layer::new("ima", "IMA", "PuRd", true, &[point(9.2)], vec![4.0]).unwrap(),
        ];
        let mut scene = Scene::new(ViewSettings::default(), SurfaceLayer::from_mesh(&mesh), layers);
        scene.hide(&["ima".to_string()]);

        assert!(scene.layers[0].visible);
        assert!(!scene.layers[1].visible);

        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["layers"][0]["points"][0][0], -1.1);
        assert_eq!(json["surface"]["triangles"].as_array().unwrap().len(), 1);
        assert_eq!(json["view"]["azimuth"], -57.0);
    }
}
