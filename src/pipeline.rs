//! Projection pipeline - load, extract, index, project, present
//!
//! The vertex index is built once per mesh; every dataset is then projected
//! against it with the same jitter source.

use anyhow::{Context, Result};
use rand::Rng;
use std::path::Path;

use crate::config::{Config, Dataset};
use crate::dataset::load_rows;
use crate::mesh::Mesh;
use crate::projection::extract::{self, RawTable};
use crate::projection::{Projector, VertexIndex};
use crate::scene::{Layer, Scene, SurfaceLayer};

pub struct Pipeline<R: Rng> {
    config: Config,
    mesh: Mesh,
    index: VertexIndex,
    projector: Projector<R>,
}

impl<R: Rng> Pipeline<R> {
    /// Prepare the mesh (origin alignment when configured) and build its vertex index
    pub fn new(config: Config, mut mesh: Mesh, rng: R) -> Result<Self> {
        if config.mesh.align_to_origin {
            mesh.align_to_origin();
        }
        let index = VertexIndex::build(&mesh, config.mesh.decimals, config.partition)?;
        let projector = Projector::new(config.sides.clone(), rng);

        Ok(Self {
            config,
            mesh,
            index,
            projector,
        })
    }

    pub fn index(&self) -> &VertexIndex {
        &self.index
    }

    /// Project one dataset's rows into a scene layer
    pub fn project_table(&mut self, dataset: &Dataset, table: &RawTable) -> Result<Layer> {
        let profile = self
            .config
            .get_profile(&dataset.profile)
            .ok_or_else(|| anyhow::anyhow!("Unknown profile '{}'", dataset.profile))?;

        let extracted = extract::extract(
            table,
            &dataset.profile,
            profile,
            self.config.ranges.vertical,
            self.config.ranges.depth,
        )?;

        let points = extracted.planar_points();
        let faces = extracted.faces();
        let projected = self.projector.project(&points, faces.as_deref(), &self.index)?;

        tracing::info!(
            "Dataset '{}': {} points projected with profile '{}'",
            dataset.id,
            projected.len(),
            extracted.profile
        );

        Layer::new(
            &dataset.id,
            &dataset.name,
            &dataset.colormap,
            dataset.visible,
            &projected,
            extracted.intensities(),
        )
    }

    /// Load a dataset's rows file or workbook from `data_dir` and project it
    pub fn run_dataset(&mut self, dataset: &Dataset, data_dir: &Path) -> Result<Layer> {
        let path = data_dir.join(&dataset.file);
        let table = load_rows(&path)
            .with_context(|| format!("Loading rows for dataset '{}'", dataset.id))?;
        self.project_table(dataset, &table)
            .with_context(|| format!("Projecting dataset '{}'", dataset.id))
    }

    /// Project every configured dataset and assemble the scene
    pub fn run(&mut self, data_dir: &Path) -> Result<Scene> {
        let datasets = self.config.datasets.clone();
        let mut layers = Vec::with_capacity(datasets.len());
        for dataset in &datasets {
            layers.push(self.run_dataset(dataset, data_dir)?);
        }

        Ok(Scene::new(
            self.config.view,
            SurfaceLayer::from_mesh(&self.mesh),
            layers,
        ))
    }
}
