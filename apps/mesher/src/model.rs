// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON model description and its translation into builder calls.

use anyhow::{anyhow, bail, Context, Result};
use brepmesh_topology::{
    BrepArena, Diagnostics, EdgeKey, ElementOrder, EntityKey, FaceKey, MeshingConfig, PointKey,
};
use nalgebra::Point3;
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// A model file: named geometry plus meshing requests.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Model {
    /// Overrides the environment configuration when present.
    pub config: Option<MeshingConfig>,
    pub points: Vec<PointDef>,
    pub lines: Vec<LineDef>,
    pub arcs: Vec<ArcDef>,
    pub segmented_lines: Vec<SegmentedLineDef>,
    pub composites: Vec<CompositeDef>,
    pub surfaces: Vec<SurfaceDef>,
}

#[derive(Debug, Deserialize)]
pub struct PointDef {
    pub name: String,
    pub position: [f64; 3],
}

#[derive(Debug, Deserialize)]
pub struct LineDef {
    pub name: Option<String>,
    pub start: String,
    pub end: String,
    pub ndiv: Option<usize>,
    pub element_size: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ArcDef {
    pub name: Option<String>,
    pub start: String,
    pub mid: String,
    pub end: String,
    pub ndiv: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SegmentedLineDef {
    pub name: Option<String>,
    pub start: String,
    pub end: String,
    pub lengths: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CompositeDef {
    pub name: Option<String>,
    pub edges: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDef {
    Linear,
    Quadratic,
}

/// A face given either by corner points or by an ordered edge loop.
#[derive(Debug, Deserialize)]
pub struct SurfaceDef {
    pub name: Option<String>,
    #[serde(default)]
    pub points: Vec<String>,
    #[serde(default)]
    pub edges: Vec<String>,
    pub ndiv_i: Option<usize>,
    pub ndiv_j: Option<usize>,
    pub element_size: Option<[f64; 2]>,
    pub order: Option<OrderDef>,
}

impl Model {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid model description")
    }

    /// Configuration for the arena: the model's own, or the environment's.
    pub fn meshing_config(&self) -> MeshingConfig {
        self.config.clone().unwrap_or_else(MeshingConfig::from_env)
    }

    /// Creates every entity of the model in `arena` and applies the
    /// division requests. Returns the faces in model order.
    pub fn build(&self, arena: &mut BrepArena, diag: &mut Diagnostics) -> Result<Vec<FaceKey>> {
        let mut points: FxHashMap<&str, PointKey> = FxHashMap::default();
        for def in &self.points {
            let [x, y, z] = def.position;
            let key = arena.add_point(Point3::new(x, y, z));
            arena
                .set_name(key.into(), &def.name)
                .with_context(|| format!("point {}", def.name))?;
            points.insert(def.name.as_str(), key);
        }
        let point = |name: &str| -> Result<PointKey> {
            points
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("unknown point {name:?}"))
        };

        for def in &self.lines {
            let edge = arena
                .add_line(point(&def.start)?, point(&def.end)?)
                .with_context(|| format!("line {} -> {}", def.start, def.end))?;
            name_edge(arena, edge, def.name.as_deref())?;
            if let Some(n) = def.ndiv {
                arena.set_division_count(edge, n, diag);
            }
            if let Some(size) = def.element_size {
                arena.set_element_size(edge, size, diag);
            }
        }
        for def in &self.arcs {
            let edge = arena
                .add_arc(point(&def.start)?, point(&def.mid)?, point(&def.end)?)
                .with_context(|| format!("arc {} -> {} -> {}", def.start, def.mid, def.end))?;
            name_edge(arena, edge, def.name.as_deref())?;
            if let Some(n) = def.ndiv {
                arena.set_division_count(edge, n, diag);
            }
        }
        for def in &self.segmented_lines {
            let edge = arena
                .add_segmented_line(point(&def.start)?, point(&def.end)?, def.lengths.clone())
                .with_context(|| format!("segmented line {} -> {}", def.start, def.end))?;
            name_edge(arena, edge, def.name.as_deref())?;
        }
        for def in &self.composites {
            let edges = def
                .edges
                .iter()
                .map(|name| edge_named(arena, name))
                .collect::<Result<Vec<_>>>()?;
            let edge = arena
                .add_composite_edge(&edges)
                .with_context(|| format!("composite {:?}", def.edges))?;
            name_edge(arena, edge, def.name.as_deref())?;
        }

        let mut faces = Vec::with_capacity(self.surfaces.len());
        for (i, def) in self.surfaces.iter().enumerate() {
            let face = match (def.points.is_empty(), def.edges.is_empty()) {
                (false, true) => {
                    let corners = def.points.iter().map(|n| point(n)).collect::<Result<Vec<_>>>()?;
                    arena.add_quad_surface(&corners)
                }
                (true, false) => {
                    let edges = def
                        .edges
                        .iter()
                        .map(|name| edge_named(arena, name))
                        .collect::<Result<Vec<_>>>()?;
                    arena.add_face(&edges)
                }
                _ => bail!("surface #{i} needs either points or edges"),
            }
            .with_context(|| format!("surface #{i}"))?;

            if let Some(name) = &def.name {
                arena.set_name(face.into(), name)?;
            }
            if let Some(OrderDef::Quadratic) = def.order {
                arena.set_element_order(face, ElementOrder::Quadratic)?;
            }
            if let Some([si, sj]) = def.element_size {
                arena.face_set_element_size(face, si, sj, diag);
            }
            if let Some(n) = def.ndiv_i {
                arena.set_ndiv_i(face, n, diag);
            }
            if let Some(n) = def.ndiv_j {
                arena.set_ndiv_j(face, n, diag);
            }
            faces.push(face);
        }
        Ok(faces)
    }
}

fn name_edge(arena: &mut BrepArena, edge: EdgeKey, name: Option<&str>) -> Result<()> {
    if let Some(name) = name {
        arena
            .set_name(edge.into(), name)
            .with_context(|| format!("edge name {name:?}"))?;
    }
    Ok(())
}

fn edge_named(arena: &BrepArena, name: &str) -> Result<EdgeKey> {
    match arena.find_by_name(name) {
        Some(EntityKey::Edge(e)) => Ok(e),
        Some(other) => bail!("{name:?} names a {}, not an edge", other.entity_type()),
        None => bail!("unknown edge {name:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{
        "points": [
            {"name": "a", "position": [0, 0, 0]},
            {"name": "b", "position": [2, 0, 0]},
            {"name": "c", "position": [2, 1, 0]},
            {"name": "d", "position": [0, 1, 0]}
        ],
        "surfaces": [{"name": "plate", "points": ["a", "b", "c", "d"], "ndiv_i": 4, "ndiv_j": 2}]
    }"#;

    #[test]
    fn builds_named_square() {
        let model = Model::from_json(SQUARE).unwrap();
        let mut arena = BrepArena::with_config(model.meshing_config());
        let mut diag = Diagnostics::new();
        let faces = model.build(&mut arena, &mut diag).unwrap();

        assert_eq!(faces.len(), 1);
        assert_eq!(arena.find_by_name("plate"), Some(faces[0].into()));
        assert_eq!(arena.face_ndiv_i(faces[0]), Some(4));
        assert_eq!(arena.face_ndiv_j(faces[0]), Some(2));
    }

    #[test]
    fn unknown_references_are_reported() {
        let model = Model::from_json(r#"{"lines": [{"start": "x", "end": "y"}]}"#).unwrap();
        let mut arena = BrepArena::new();
        let err = model.build(&mut arena, &mut Diagnostics::new()).unwrap_err();
        assert!(err.to_string().contains("unknown point"));
    }
}
