// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serializable mesh report written after a run.

use brepmesh_topology::{
    BrepArena, Diagnostics, ElementKind, InMemoryMesh, MeshStats, ValidationIssue,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MeshReport {
    pub summary: Summary,
    pub nodes: Vec<NodeOut>,
    pub elements: Vec<ElementOut>,
    pub diagnostics: Vec<DiagnosticOut>,
    pub issues: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub points: usize,
    pub edges: usize,
    pub faces: usize,
    pub nodes_created: usize,
    pub elements_created: usize,
}

#[derive(Debug, Serialize)]
pub struct NodeOut {
    pub tag: usize,
    pub position: [f64; 3],
}

#[derive(Debug, Serialize)]
pub struct ElementOut {
    pub tag: usize,
    pub kind: &'static str,
    pub nodes: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticOut {
    pub severity: String,
    pub kind: &'static str,
    pub entity: Option<String>,
    pub message: String,
}

fn kind_name(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Line2 => "line2",
        ElementKind::Quad4 => "quad4",
        ElementKind::Quad9 => "quad9",
    }
}

impl MeshReport {
    pub fn collect(
        arena: &BrepArena,
        mesh: &InMemoryMesh,
        stats: MeshStats,
        diag: &Diagnostics,
        issues: &[ValidationIssue],
    ) -> Self {
        let nodes = mesh
            .nodes()
            .iter()
            .map(|n| NodeOut {
                tag: n.tag.0,
                position: [n.position.x, n.position.y, n.position.z],
            })
            .collect();
        let elements = mesh
            .elements()
            .iter()
            .map(|e| ElementOut {
                tag: e.tag.0,
                kind: kind_name(e.kind),
                nodes: e.nodes.iter().map(|t| t.0).collect(),
            })
            .collect();
        let diagnostics = diag
            .entries()
            .iter()
            .map(|d| DiagnosticOut {
                severity: format!("{:?}", d.severity).to_lowercase(),
                kind: d.kind.as_str(),
                entity: d.entity.and_then(|k| arena.name_of(k)).map(str::to_owned),
                message: d.message.clone(),
            })
            .collect();

        Self {
            summary: Summary {
                points: arena.point_count(),
                edges: arena.edge_count(),
                faces: arena.face_count(),
                nodes_created: stats.nodes_created,
                elements_created: stats.elements_created,
            },
            nodes,
            elements,
            diagnostics,
            issues: issues.iter().map(ToString::to_string).collect(),
        }
    }
}
