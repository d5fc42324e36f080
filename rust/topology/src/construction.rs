// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction and removal of B-rep entities.
//!
//! Every entity is created through the arena, which checks that referenced
//! sub-entities exist, rejects degenerate input and keeps the adjacency
//! index in sync. Removal is the mirror image: an entity can only go once
//! nothing above it refers to it, and its own back-references are pruned.

use std::collections::VecDeque;

use nalgebra::Point3;

use crate::arena::*;
use crate::arrays::{ElementArray3d, NodeArray3d};
use crate::error::{Error, Result};
use crate::geometry::ArcGeometry;
use crate::keys::*;

impl BrepArena {
    /// Creates a point at `position`.
    pub fn add_point(&mut self, position: Point3<f64>) -> PointKey {
        let (tag, name) = self.allocate_identity(EntityType::Point);
        let key = self.points.insert(PointData {
            tag,
            name: name.clone(),
            position,
            node: None,
        });
        self.names.insert(name, key.into());
        key
    }

    /// Moves a point. Topology is untouched; nodes already created stay
    /// where they are.
    pub fn set_point_position(&mut self, key: PointKey, position: Point3<f64>) -> Result<()> {
        let point = self.points.get_mut(key).ok_or(Error::PointNotFound(key))?;
        point.position = position;
        Ok(())
    }

    /// Creates a straight segment between two distinct points.
    pub fn add_line(&mut self, start: PointKey, end: PointKey) -> Result<EdgeKey> {
        self.check_distinct(start, end)?;
        Ok(self.insert_edge(EdgeGeometry::Segment { start, end }))
    }

    /// Creates a circular arc from `start` to `end` through `mid`.
    ///
    /// Returns [`Error::CollinearArc`] if the three points do not define a
    /// circle.
    pub fn add_arc(&mut self, start: PointKey, mid: PointKey, end: PointKey) -> Result<EdgeKey> {
        self.check_distinct(start, end)?;
        self.check_distinct(start, mid)?;
        self.check_distinct(mid, end)?;
        let (a, m, b) = (
            self.points[start].position,
            self.points[mid].position,
            self.points[end].position,
        );
        if ArcGeometry::from_points(&a, &m, &b).is_none() {
            return Err(Error::CollinearArc);
        }
        Ok(self.insert_edge(EdgeGeometry::Arc { start, mid, end }))
    }

    /// Creates a straight edge whose mesh follows the relative segment
    /// `lengths`. The division count starts at `lengths.len()`.
    pub fn add_segmented_line(
        &mut self,
        start: PointKey,
        end: PointKey,
        lengths: Vec<f64>,
    ) -> Result<EdgeKey> {
        self.check_distinct(start, end)?;
        if lengths.is_empty() || lengths.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(Error::InvalidLengths);
        }
        let ndiv = lengths.len();
        let key = self.insert_edge(EdgeGeometry::SegmentedLine {
            start,
            end,
            lengths,
        });
        self.edges[key].ndiv = ndiv;
        Ok(key)
    }

    /// Creates a composite edge from an ordered chain of existing edges.
    ///
    /// Orientations are detected from shared end points.
    pub fn add_composite_edge(&mut self, edges: &[EdgeKey]) -> Result<EdgeKey> {
        if edges.is_empty() {
            return Err(Error::EmptyComposite);
        }
        let sides = self.orient_chain(edges)?;
        let key = self.insert_edge(EdgeGeometry::Composite(CompositeEdge { sides }));
        for &e in edges {
            self.link_edge_composite(e, key);
        }
        self.refresh_composite_ndiv(key);
        Ok(key)
    }

    /// Creates an empty face in the `Undefined` state. Its boundary is set
    /// later with [`set_face_points`](BrepArena::set_face_points).
    pub fn new_face(&mut self) -> FaceKey {
        let (tag, name) = self.allocate_identity(EntityType::Face);
        let key = self.faces.insert(FaceData {
            tag,
            name: name.clone(),
            sides: VecDeque::new(),
            state: FaceState::Undefined,
            element_order: ElementOrder::default(),
            nodes: NodeArray3d::default(),
            elements: ElementArray3d::default(),
        });
        self.names.insert(name, key.into());
        key
    }

    /// Creates a face bounded by a closed, ordered loop of existing edges.
    pub fn add_face(&mut self, edges: &[EdgeKey]) -> Result<FaceKey> {
        let sides = self.closed_loop(edges)?;
        let face = self.new_face();
        self.set_face_sides(face, sides);
        Ok(face)
    }

    /// Orients `edges` into a closed loop with no repeated corner.
    pub(crate) fn closed_loop(&self, edges: &[EdgeKey]) -> Result<VecDeque<Side>> {
        if edges.len() < 3 {
            return Err(Error::TooFewPoints {
                required: 3,
                given: edges.len(),
            });
        }
        let sides = self.orient_chain(edges)?;
        let (Some(&first), Some(&last)) = (sides.front(), sides.back()) else {
            return Err(Error::OpenBoundary);
        };
        if self.side_start(first) != self.side_end(last) {
            return Err(Error::OpenBoundary);
        }

        let mut corners = rustc_hash::FxHashSet::default();
        for &side in &sides {
            let p = self.side_start(side).ok_or(Error::EdgeNotFound(side.edge))?;
            if !corners.insert(p) {
                return Err(Error::RepeatedPoint(p));
            }
        }
        Ok(sides)
    }

    /// Replaces a face boundary and relinks the edge → face index.
    pub(crate) fn set_face_sides(&mut self, face: FaceKey, sides: VecDeque<Side>) {
        let old: Vec<EdgeKey> = self.faces[face].sides.iter().map(|s| s.edge).collect();
        for e in old {
            self.unlink_edge_face(e, face);
        }
        for side in &sides {
            self.link_edge_face(side.edge, face);
        }
        let data = &mut self.faces[face];
        data.sides = sides;
        data.state = FaceState::PointsSet;
    }

    /// Renames an entity. Names are unique across all entity types.
    pub fn set_name(&mut self, key: EntityKey, name: &str) -> Result<()> {
        if !self.contains(key) {
            return Err(Error::not_found(key));
        }
        match self.names.get(name) {
            Some(&owner) if owner == key => return Ok(()),
            Some(_) => return Err(Error::DuplicateName(name.to_string())),
            None => {}
        }

        let slot = match key {
            EntityKey::Point(k) => &mut self.points[k].name,
            EntityKey::Edge(k) => &mut self.edges[k].name,
            EntityKey::Face(k) => &mut self.faces[k].name,
        };
        let old = std::mem::replace(slot, name.to_string());
        self.names.remove(&old);
        self.names.insert(name.to_string(), key);
        Ok(())
    }

    // --- Removal ---

    /// Removes a face and unlinks it from its boundary edges.
    ///
    /// Nodes and elements it created stay in the mesh domain.
    pub fn remove_face(&mut self, face: FaceKey) -> Result<()> {
        let data = self.faces.remove(face).ok_or(Error::FaceNotFound(face))?;
        for side in &data.sides {
            self.unlink_edge_face(side.edge, face);
        }
        self.names.remove(&data.name);
        Ok(())
    }

    /// Removes an edge that no face or composite uses.
    pub fn remove_edge(&mut self, edge: EdgeKey) -> Result<()> {
        if !self.edges.contains_key(edge) {
            return Err(Error::EdgeNotFound(edge));
        }
        if self.edge_in_use(edge) {
            return Err(Error::InUse(edge.into()));
        }
        let data = self.edges.remove(edge).ok_or(Error::EdgeNotFound(edge))?;
        match &data.geometry {
            EdgeGeometry::Composite(c) => {
                for side in &c.sides {
                    self.unlink_edge_composite(side.edge, edge);
                }
            }
            other => {
                for p in other.direct_points() {
                    self.unlink_point_edge(p, edge);
                }
            }
        }
        self.edge_to_faces.remove(&edge);
        self.edge_to_composites.remove(&edge);
        self.names.remove(&data.name);
        Ok(())
    }

    /// Removes a point that no edge uses.
    pub fn remove_point(&mut self, point: PointKey) -> Result<()> {
        if !self.points.contains_key(point) {
            return Err(Error::PointNotFound(point));
        }
        if self.point_to_edges.get(&point).is_some_and(|s| !s.is_empty()) {
            return Err(Error::InUse(point.into()));
        }
        let data = self.points.remove(point).ok_or(Error::PointNotFound(point))?;
        self.point_to_edges.remove(&point);
        self.names.remove(&data.name);
        Ok(())
    }

    // --- Internal helpers ---

    /// Both points exist, differ, and do not coincide in space.
    fn check_distinct(&self, a: PointKey, b: PointKey) -> Result<()> {
        let pa = self.points.get(a).ok_or(Error::PointNotFound(a))?;
        let pb = self.points.get(b).ok_or(Error::PointNotFound(b))?;
        if a == b || (pa.position - pb.position).norm() <= self.config.coincidence_tolerance {
            return Err(Error::DegenerateEdge(a, b));
        }
        Ok(())
    }

    /// Stores an edge and links it to the points it references directly.
    fn insert_edge(&mut self, geometry: EdgeGeometry) -> EdgeKey {
        let (tag, name) = self.allocate_identity(EntityType::Edge);
        let points = geometry.direct_points();
        let key = self.edges.insert(EdgeData {
            tag,
            name: name.clone(),
            geometry,
            ndiv: self.config.default_ndiv.max(1),
            ndiv_set: false,
            nodes: NodeArray3d::default(),
            elements: ElementArray3d::default(),
        });
        for p in points {
            self.link_point_edge(p, key);
        }
        self.names.insert(name, key.into());
        key
    }
}
