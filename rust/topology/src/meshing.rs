// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured mesh generation on points, edges and quad faces.
//!
//! Generation is bottom-up and idempotent: a point owns at most one node,
//! an edge creates its end nodes through its points before its interior
//! nodes, and a face meshes its four sides before filling the interior by
//! transfinite interpolation. Entities only keep the tags returned by the
//! [`MeshDomain`]; asking for a mesh twice is a logged no-op.

use std::ops::AddAssign;

use crate::arena::*;
use crate::arrays::{quad4_connectivity, quad9_connectivity, Array3d, ElementArray3d, NodeArray3d};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::domain::{quad_area, ElementKind, MeshDomain, NodeTag};
use crate::error::{Error, Result};
use crate::keys::*;
use crate::transfinite::coons_grid;

/// Number of mesh objects created by one generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub nodes_created: usize,
    pub elements_created: usize,
}

impl AddAssign for MeshStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_created += rhs.nodes_created;
        self.elements_created += rhs.elements_created;
    }
}

impl BrepArena {
    // --- Points ---

    /// Node of a point, created on first request.
    pub fn create_point_node<D: MeshDomain + ?Sized>(
        &mut self,
        point: PointKey,
        domain: &mut D,
    ) -> Option<(NodeTag, bool)> {
        let data = self.points.get_mut(point)?;
        if let Some(node) = data.node {
            return Some((node, false));
        }
        let node = domain.create_node(data.position);
        data.node = Some(node);
        Some((node, true))
    }

    // --- Edges ---

    /// Node tags of an edge from its first to its last vertex.
    pub fn edge_node_tags(&self, edge: EdgeKey) -> Vec<NodeTag> {
        self.edges
            .get(edge)
            .map(|e| e.nodes.tags())
            .unwrap_or_default()
    }

    /// Node tags of an edge walked along `side`.
    pub fn side_node_tags(&self, side: Side) -> Vec<NodeTag> {
        let mut tags = self.edge_node_tags(side.edge);
        if !side.forward {
            tags.reverse();
        }
        tags
    }

    /// Creates the nodes of an edge: end nodes through its points first,
    /// then one node per interior position. Does nothing if the edge already
    /// has nodes.
    pub fn create_edge_nodes<D: MeshDomain + ?Sized>(
        &mut self,
        edge: EdgeKey,
        domain: &mut D,
        diag: &mut Diagnostics,
    ) -> MeshStats {
        let mut stats = MeshStats::default();
        let Some(data) = self.edges.get(edge) else {
            diag.error(DiagnosticKind::MissingEntity, Some(edge.into()), "edge not found");
            return stats;
        };
        if data.has_nodes() {
            return stats;
        }
        if data.ndiv == 0 {
            diag.warn(
                DiagnosticKind::DegenerateGeometry,
                Some(edge.into()),
                format!("{} has zero divisions", data.name),
            );
            return stats;
        }

        if let EdgeGeometry::Composite(c) = &data.geometry {
            let sides: Vec<Side> = c.sides.iter().copied().collect();
            let mut row: Vec<Option<NodeTag>> = Vec::new();
            for side in sides {
                stats += self.create_edge_nodes(side.edge, domain, diag);
                let tags = self.side_node_tags(side);
                let skip = usize::from(!row.is_empty());
                row.extend(tags.into_iter().skip(skip).map(Some));
            }
            if let Some(data) = self.edges.get_mut(edge) {
                data.nodes = NodeArray3d::from_row(row);
            }
            return stats;
        }

        let (Some(positions), Some((start, end))) =
            (self.edge_positions(edge), self.edge_endpoints(edge))
        else {
            diag.error(
                DiagnosticKind::MissingEntity,
                Some(edge.into()),
                "edge references a missing point",
            );
            return stats;
        };

        let mut row = Vec::with_capacity(positions.len());
        for (k, pos) in positions.iter().enumerate() {
            let endpoint = if k == 0 {
                Some(start)
            } else if k + 1 == positions.len() {
                Some(end)
            } else {
                None
            };
            let tag = match endpoint {
                Some(p) => match self.create_point_node(p, domain) {
                    Some((tag, created)) => {
                        stats.nodes_created += usize::from(created);
                        tag
                    }
                    None => {
                        diag.error(
                            DiagnosticKind::MissingEntity,
                            Some(p.into()),
                            "point not found",
                        );
                        return stats;
                    }
                },
                None => {
                    stats.nodes_created += 1;
                    domain.create_node(*pos)
                }
            };
            row.push(Some(tag));
        }
        if let Some(data) = self.edges.get_mut(edge) {
            data.nodes = NodeArray3d::from_row(row);
        }
        stats
    }

    /// Creates the nodes and two-node line elements of an edge.
    pub fn generate_edge_mesh<D: MeshDomain + ?Sized>(
        &mut self,
        edge: EdgeKey,
        domain: &mut D,
        diag: &mut Diagnostics,
    ) -> MeshStats {
        let mut stats = self.create_edge_nodes(edge, domain, diag);
        let Some(data) = self.edges.get(edge) else {
            return stats;
        };
        if !data.elements.is_null() {
            diag.info(
                DiagnosticKind::AlreadyMeshed,
                Some(edge.into()),
                format!("{} already has elements", data.name),
            );
            return stats;
        }
        let tags = data.nodes.tags();
        let elements: Vec<_> = tags
            .windows(2)
            .map(|pair| Some(domain.create_element(ElementKind::Line2, pair)))
            .collect();
        stats.elements_created += elements.len();
        if let Some(data) = self.edges.get_mut(edge) {
            data.elements = ElementArray3d::from_row(elements);
        }
        stats
    }

    // --- Faces ---

    /// Sets the element order used by the next mesh generation.
    pub fn set_element_order(&mut self, face: FaceKey, order: ElementOrder) -> Result<()> {
        let data = self.faces.get_mut(face).ok_or(Error::FaceNotFound(face))?;
        if data.has_nodes() {
            return Err(Error::AlreadyMeshed(face.into()));
        }
        data.element_order = order;
        Ok(())
    }

    /// Node grid of a meshed face, `(1, ndivJ + 1, ndivI + 1)`.
    pub fn face_node_grid(&self, face: FaceKey) -> Option<&NodeArray3d> {
        self.faces.get(face).map(|f| &f.nodes).filter(|n| !n.is_null())
    }

    /// Element grid of a meshed face.
    pub fn face_element_grid(&self, face: FaceKey) -> Option<&ElementArray3d> {
        self.faces.get(face).map(|f| &f.elements).filter(|e| !e.is_null())
    }

    /// Meshes a four-sided face.
    ///
    /// The sides are meshed first and copied onto the border of a
    /// `(ndivJ + 1) x (ndivI + 1)` node grid: side 0 along the first row,
    /// side 1 up the last column, sides 2 and 3 reversed along the last row
    /// and the first column. Interior nodes come from transfinite
    /// interpolation of the border positions, and elements are read cell by
    /// cell in counter-clockwise order.
    pub fn generate_face_mesh<D: MeshDomain + ?Sized>(
        &mut self,
        face: FaceKey,
        domain: &mut D,
        diag: &mut Diagnostics,
    ) -> MeshStats {
        let mut stats = MeshStats::default();
        let Some(data) = self.faces.get(face) else {
            diag.error(DiagnosticKind::MissingEntity, Some(face.into()), "face not found");
            return stats;
        };
        let name = data.name.clone();
        if data.state == FaceState::SurfaceMeshed || data.has_nodes() {
            diag.info(
                DiagnosticKind::AlreadyMeshed,
                Some(face.into()),
                format!("{name} is already meshed"),
            );
            return stats;
        }
        if data.sides.len() != 4 {
            diag.warn(
                DiagnosticKind::UnsupportedSideCount,
                Some(face.into()),
                format!(
                    "{name} has {} sides; only four-sided faces can be meshed",
                    data.sides.len()
                ),
            );
            return stats;
        }
        if !self.check_ndivs(face) {
            diag.warn(
                DiagnosticKind::NonConforming,
                Some(face.into()),
                format!("{name}: opposite sides have different division counts"),
            );
            return stats;
        }
        let sides: Vec<Side> = data.sides.iter().copied().collect();
        let order = data.element_order;
        let ni = self.edge_ndiv(sides[0].edge);
        let nj = self.edge_ndiv(sides[1].edge);
        if order == ElementOrder::Quadratic && (ni % 2 != 0 || nj % 2 != 0) {
            diag.warn(
                DiagnosticKind::NonConforming,
                Some(face.into()),
                format!("{name}: nine-node quads need even divisions, got {ni} x {nj}"),
            );
            return stats;
        }

        if let Some(area) = self.face_area(face) {
            if area < self.config.min_face_area {
                diag.warn(
                    DiagnosticKind::LowQuality,
                    Some(face.into()),
                    format!("{name} has near-zero area {area:e}"),
                );
            }
        }

        // Boundary first
        for side in &sides {
            stats += self.create_edge_nodes(side.edge, domain, diag);
        }
        if let Some(data) = self.faces.get_mut(face) {
            data.state = FaceState::BoundaryMeshed;
        }

        let border: Vec<Vec<NodeTag>> = sides.iter().map(|&s| self.side_node_tags(s)).collect();
        let expected = [ni + 1, nj + 1, ni + 1, nj + 1];
        if border.iter().zip(expected).any(|(b, n)| b.len() != n) {
            diag.error(
                DiagnosticKind::NonConforming,
                Some(face.into()),
                format!("{name}: side node counts do not match the division counts"),
            );
            return stats;
        }

        let mut nodes = NodeArray3d::new(1, nj + 1, ni + 1, None);
        for i in 0..=ni {
            nodes[(0, 0, i)] = Some(border[0][i]);
            nodes[(0, nj, i)] = Some(border[2][ni - i]);
        }
        for j in 0..=nj {
            nodes[(0, j, ni)] = Some(border[1][j]);
            nodes[(0, j, 0)] = Some(border[3][nj - j]);
        }

        let lookup = &*domain;
        let position_of = |tags: &[NodeTag], reversed: bool| -> Option<Vec<nalgebra::Point3<f64>>> {
            let mut out: Vec<_> = tags
                .iter()
                .map(|&t| lookup.node_position(t))
                .collect::<Option<_>>()?;
            if reversed {
                out.reverse();
            }
            Some(out)
        };
        let boundaries = (
            position_of(&border[0], false),
            position_of(&border[1], false),
            position_of(&border[2], true),
            position_of(&border[3], true),
        );
        let (Some(bottom), Some(right), Some(top), Some(left)) = boundaries else {
            diag.error(
                DiagnosticKind::MissingEntity,
                Some(face.into()),
                format!("{name}: boundary node missing from the mesh domain"),
            );
            return stats;
        };
        let grid = coons_grid(&bottom, &right, &top, &left);

        for j in 1..nj {
            for i in 1..ni {
                nodes[(0, j, i)] = Some(domain.create_node(grid[j][i]));
                stats.nodes_created += 1;
            }
        }

        let min_area = self.config.min_element_area;
        let mut suspect = 0usize;
        let elements = match order {
            ElementOrder::Linear => {
                let mut elements = ElementArray3d::new(1, nj, ni, None);
                for (k, cell) in quad4_connectivity(&nodes).iter().enumerate() {
                    if corner_area(&*domain, cell) < min_area {
                        suspect += 1;
                    }
                    let element = domain.create_element(ElementKind::Quad4, cell);
                    elements[(0, k / ni, k % ni)] = Some(element);
                }
                elements
            }
            ElementOrder::Quadratic => {
                let (ri, rj) = (ni / 2, nj / 2);
                let mut elements: ElementArray3d = Array3d::new(1, rj, ri, None);
                for (k, cell) in quad9_connectivity(&nodes).iter().enumerate() {
                    if corner_area(&*domain, cell) < min_area {
                        suspect += 1;
                    }
                    let element = domain.create_element(ElementKind::Quad9, cell);
                    elements[(0, k / ri, k % ri)] = Some(element);
                }
                elements
            }
        };
        stats.elements_created += elements.element_count();

        if suspect > 0 {
            diag.warn(
                DiagnosticKind::LowQuality,
                Some(face.into()),
                format!("{name}: {suspect} element(s) below the minimal area {min_area:e}"),
            );
        }

        if let Some(data) = self.faces.get_mut(face) {
            data.nodes = nodes;
            data.elements = elements;
            data.state = FaceState::SurfaceMeshed;
        }
        tracing::debug!(
            face = %name,
            ndiv_i = ni,
            ndiv_j = nj,
            nodes = stats.nodes_created,
            elements = stats.elements_created,
            "face meshed"
        );
        stats
    }

    /// Meshes every face, then every free edge (edges no face uses).
    pub fn generate_mesh<D: MeshDomain + ?Sized>(
        &mut self,
        domain: &mut D,
        diag: &mut Diagnostics,
    ) -> MeshStats {
        let mut stats = MeshStats::default();
        let mut faces: Vec<FaceKey> = self.faces.keys().collect();
        self.sort_faces_by_tag(&mut faces);
        for face in faces {
            stats += self.generate_face_mesh(face, domain, diag);
        }
        let mut free: Vec<EdgeKey> = self
            .edges
            .keys()
            .filter(|&e| {
                self.faces_touching(e).is_empty()
                    && !self.edge_to_composites.get(&e).is_some_and(|s| !s.is_empty())
            })
            .collect();
        self.sort_edges_by_tag(&mut free);
        for edge in free {
            if self.edges.get(edge).is_some_and(|e| e.elements.is_null()) {
                stats += self.generate_edge_mesh(edge, domain, diag);
            }
        }
        stats
    }

    /// Forgets a face's nodes and elements so it can be meshed again. The
    /// mesh objects stay in the domain; boundary edges keep their nodes.
    pub fn clear_face_mesh(&mut self, face: FaceKey) -> Result<()> {
        let data = self.faces.get_mut(face).ok_or(Error::FaceNotFound(face))?;
        data.nodes = NodeArray3d::default();
        data.elements = ElementArray3d::default();
        data.state = if data.sides.is_empty() {
            FaceState::Undefined
        } else {
            FaceState::PointsSet
        };
        Ok(())
    }

    /// Forgets an edge's nodes and elements. Refused while a meshed face
    /// still uses them.
    pub fn clear_edge_mesh(&mut self, edge: EdgeKey) -> Result<()> {
        if !self.edges.contains_key(edge) {
            return Err(Error::EdgeNotFound(edge));
        }
        let used = self
            .faces_touching(edge)
            .into_iter()
            .any(|f| self.faces.get(f).is_some_and(|d| d.has_nodes()));
        if used {
            return Err(Error::InUse(edge.into()));
        }
        if let Some(data) = self.edges.get_mut(edge) {
            data.nodes = NodeArray3d::default();
            data.elements = ElementArray3d::default();
        }
        Ok(())
    }
}

/// Area spanned by the first four (corner) nodes of a quad cell.
fn corner_area<D: MeshDomain + ?Sized>(domain: &D, cell: &[NodeTag]) -> f64 {
    let p = |k: usize| domain.node_position(cell[k]);
    match (p(0), p(1), p(2), p(3)) {
        (Some(a), Some(b), Some(c), Some(d)) => quad_area(&a, &b, &c, &d),
        _ => 0.0,
    }
}
