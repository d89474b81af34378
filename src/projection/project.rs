//! Nearest-surface projection
//!
//! Each 2D point (vertical, depth) is matched to the mesh vertex whose
//! (axis 1, axis 2) coordinates are closest, restricted to the vertices of
//! the point's side. The matched vertex supplies axis 0, which is then pushed
//! off the surface by a fixed per-side shift plus uniform jitter so points
//! are not hidden inside the rendered faces.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::vertex_index::VertexIndex;
use super::{ProjectionError, Result};

pub use super::vertex_index::Side;

/// Offset applied to the recovered axis for one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideOffset {
    /// Deterministic displacement
    pub shift: f64,
    /// Signed jitter amplitude; the draw is `u * jitter` with u in [0, 1)
    pub jitter: f64,
}

/// Per-side projection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSettings {
    pub ventral: SideOffset,
    pub dorsal: SideOffset,
    /// Face labels that select the ventral side; anything else is dorsal
    pub ventral_labels: Vec<String>,
    /// Side used when a dataset carries no face labels at all
    pub unlabelled: Side,
}

impl Default for SideSettings {
    fn default() -> Self {
        Self {
            ventral: SideOffset {
                shift: -1.0,
                jitter: -0.31,
            },
            dorsal: SideOffset {
                shift: 1.0,
                jitter: 0.31,
            },
            ventral_labels: vec!["V".to_string(), "Stomach - ventral".to_string()],
            unlabelled: Side::Dorsal,
        }
    }
}

impl SideSettings {
    /// Side selected by a face label
    pub fn classify(&self, label: &str) -> Side {
        if self.ventral_labels.iter().any(|l| l == label) {
            Side::Ventral
        } else {
            Side::Dorsal
        }
    }

    pub fn offset(&self, side: Side) -> SideOffset {
        match side {
            Side::Ventral => self.ventral,
            Side::Dorsal => self.dorsal,
        }
    }

    /// Same settings with jitter disabled on both sides
    pub fn without_jitter(mut self) -> Self {
        self.ventral.jitter = 0.0;
        self.dorsal.jitter = 0.0;
        self
    }
}

/// A measurement placed on the surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedPoint {
    /// (recovered axis 0, vertical, depth)
    pub position: [f64; 3],
    pub side: Side,
    /// Index of the matched vertex in the `VertexIndex`
    pub vertex: usize,
}

/// Projects 2D points onto a vertex index, drawing jitter from `rng`
pub struct Projector<R: Rng> {
    settings: SideSettings,
    rng: R,
}

impl<R: Rng> Projector<R> {
    pub fn new(settings: SideSettings, rng: R) -> Self {
        Self { settings, rng }
    }

    /// Side for every point, from its label or the unlabelled default
    pub fn sides(&self, points: usize, labels: Option<&[String]>) -> Result<Vec<Side>> {
        match labels {
            Some(labels) if labels.len() != points => Err(ProjectionError::LabelCountMismatch {
                points,
                labels: labels.len(),
            }),
            Some(labels) => Ok(labels.iter().map(|l| self.settings.classify(l)).collect()),
            None => Ok(vec![self.settings.unlabelled; points]),
        }
    }

    /// Side and matched vertex for every point. Deterministic for a given index.
    pub fn match_vertices(
        &self,
        points: &[[f64; 2]],
        labels: Option<&[String]>,
        index: &VertexIndex,
    ) -> Result<Vec<(Side, usize)>> {
        let sides = self.sides(points.len(), labels)?;
        points
            .iter()
            .zip(sides)
            .map(|(p, side)| Ok((side, nearest_vertex(p, side, index)?)))
            .collect()
    }

    /// Project every point to 3D. Output order and length match `points`.
    ///
    /// All points are matched before any jitter is drawn, so a failed match
    /// leaves the RNG untouched.
    pub fn project(
        &mut self,
        points: &[[f64; 2]],
        labels: Option<&[String]>,
        index: &VertexIndex,
    ) -> Result<Vec<ProjectedPoint>> {
        let matches = self.match_vertices(points, labels, index)?;
        let mut out = Vec::with_capacity(points.len());

        for (p, (side, vertex)) in points.iter().zip(matches) {
            let offset = self.settings.offset(side);
            let u: f64 = self.rng.random();
            let recovered = index.vertex(vertex)[0] + offset.shift + u * offset.jitter;

            out.push(ProjectedPoint {
                position: [recovered, p[0], p[1]],
                side,
                vertex,
            });
        }

        tracing::debug!("Projected {} points onto the surface", out.len());
        Ok(out)
    }
}

/// Closest candidate in the (axis 1, axis 2) plane; first occurrence wins ties
pub fn nearest_vertex(point: &[f64; 2], side: Side, index: &VertexIndex) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;

    for &i in index.candidates(side) {
        let v = index.vertex(i);
        let dv = point[0] - v[1];
        let dd = point[1] - v[2];
        let dist = dv * dv + dd * dd;
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((i, dist)),
        }
    }

    best.map(|(i, _)| i)
        .ok_or(ProjectionError::NoCandidateVertex { side })
}
