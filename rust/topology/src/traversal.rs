// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Traversal methods for navigating the B-rep graph.
//!
//! Downward traversal follows the stored geometry (face → sides → edges →
//! points); upward traversal reads the adjacency maps maintained by the
//! arena (point → edges → faces, sub-edge → composites). Results that come
//! from hash sets are sorted by tag so callers see a stable order.

use rustc_hash::FxHashSet;

use crate::arena::*;
use crate::keys::*;

// =============================================================================
// Downward traversal
// =============================================================================

impl BrepArena {
    /// First and last vertex of an edge. For composites these are the start
    /// of the first side and the end of the last side.
    pub fn edge_endpoints(&self, edge: EdgeKey) -> Option<(PointKey, PointKey)> {
        match &self.edges.get(edge)?.geometry {
            EdgeGeometry::Segment { start, end }
            | EdgeGeometry::Arc { start, end, .. }
            | EdgeGeometry::SegmentedLine { start, end, .. } => Some((*start, *end)),
            EdgeGeometry::Composite(c) => {
                let first = *c.sides.front()?;
                let last = *c.sides.back()?;
                Some((self.side_start(first)?, self.side_end(last)?))
            }
        }
    }

    /// Vertex where the chain enters `side`.
    pub fn side_start(&self, side: Side) -> Option<PointKey> {
        let (a, b) = self.edge_endpoints(side.edge)?;
        Some(if side.forward { a } else { b })
    }

    /// Vertex where the chain leaves `side`.
    pub fn side_end(&self, side: Side) -> Option<PointKey> {
        let (a, b) = self.edge_endpoints(side.edge)?;
        Some(if side.forward { b } else { a })
    }

    /// Ordered vertex list of an edge. Arcs include their interior point;
    /// composites list the vertex at every joint.
    pub fn edge_vertices(&self, edge: EdgeKey) -> Option<Vec<PointKey>> {
        let data = self.edges.get(edge)?;
        match &data.geometry {
            EdgeGeometry::Composite(c) => {
                let mut out = Vec::with_capacity(c.sides.len() + 1);
                for &side in &c.sides {
                    out.push(self.side_start(side)?);
                }
                out.push(self.side_end(*c.sides.back()?)?);
                Some(out)
            }
            other => Some(other.direct_points().to_vec()),
        }
    }

    /// Sides of a face in boundary order.
    pub fn face_sides(&self, face: FaceKey) -> Option<Vec<Side>> {
        self.faces.get(face).map(|f| f.sides.iter().copied().collect())
    }

    /// Edges of a face in boundary order.
    pub fn face_edges(&self, face: FaceKey) -> Option<Vec<EdgeKey>> {
        self.faces
            .get(face)
            .map(|f| f.sides.iter().map(|s| s.edge).collect())
    }

    /// Corner vertices of a face in boundary order (one per side).
    pub fn face_vertices(&self, face: FaceKey) -> Option<Vec<PointKey>> {
        let data = self.faces.get(face)?;
        data.sides.iter().map(|&s| self.side_start(s)).collect()
    }

    /// Simple edges (not composites) below `edge`, itself included when it
    /// is simple.
    pub fn leaf_edges(&self, edge: EdgeKey) -> Vec<EdgeKey> {
        let mut out = Vec::new();
        self.collect_leaf_edges(edge, &mut out);
        out
    }

    fn collect_leaf_edges(&self, edge: EdgeKey, out: &mut Vec<EdgeKey>) {
        match self.edges.get(edge).map(|e| &e.geometry) {
            Some(EdgeGeometry::Composite(c)) => {
                for side in &c.sides {
                    self.collect_leaf_edges(side.edge, out);
                }
            }
            Some(_) => out.push(edge),
            None => {}
        }
    }
}

// =============================================================================
// Upward traversal
// =============================================================================

impl BrepArena {
    /// Edges that have `point` among their vertices.
    pub fn incident_edges(&self, point: PointKey) -> Vec<EdgeKey> {
        let mut out: Vec<EdgeKey> = self
            .point_to_edges
            .get(&point)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        self.sort_edges_by_tag(&mut out);
        out
    }

    /// Faces that use `edge` directly as a side.
    pub fn faces_using_edge(&self, edge: EdgeKey) -> Vec<FaceKey> {
        let mut out: Vec<FaceKey> = self
            .edge_to_faces
            .get(&edge)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        self.sort_faces_by_tag(&mut out);
        out
    }

    /// Composite edges that contain `edge` directly.
    pub fn composites_using(&self, edge: EdgeKey) -> Vec<EdgeKey> {
        let mut out: Vec<EdgeKey> = self
            .edge_to_composites
            .get(&edge)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        self.sort_edges_by_tag(&mut out);
        out
    }

    /// Faces bounded by `edge`, either directly or through any chain of
    /// composites containing it.
    pub fn faces_touching(&self, edge: EdgeKey) -> Vec<FaceKey> {
        let mut faces = FxHashSet::default();
        let mut seen = FxHashSet::default();
        let mut stack = vec![edge];
        while let Some(e) = stack.pop() {
            if !seen.insert(e) {
                continue;
            }
            if let Some(fs) = self.edge_to_faces.get(&e) {
                faces.extend(fs.iter().copied());
            }
            if let Some(cs) = self.edge_to_composites.get(&e) {
                stack.extend(cs.iter().copied());
            }
        }
        let mut out: Vec<FaceKey> = faces.into_iter().collect();
        self.sort_faces_by_tag(&mut out);
        out
    }

    /// Faces sharing at least one simple edge with `face`.
    pub fn neighbor_faces(&self, face: FaceKey) -> Vec<FaceKey> {
        let Some(data) = self.faces.get(face) else {
            return Vec::new();
        };
        let mut found = FxHashSet::default();
        for side in &data.sides {
            for leaf in self.leaf_edges(side.edge) {
                found.extend(self.faces_touching(leaf));
            }
        }
        found.remove(&face);
        let mut out: Vec<FaceKey> = found.into_iter().collect();
        self.sort_faces_by_tag(&mut out);
        out
    }

    /// Faces with `point` as one of their corners or boundary vertices.
    pub fn faces_at_point(&self, point: PointKey) -> Vec<FaceKey> {
        let mut found = FxHashSet::default();
        for edge in self.incident_edges(point) {
            found.extend(self.faces_touching(edge));
        }
        let mut out: Vec<FaceKey> = found.into_iter().collect();
        self.sort_faces_by_tag(&mut out);
        out
    }

    /// Simple edges joining `a` and `b` in either direction.
    pub fn edges_between(&self, a: PointKey, b: PointKey) -> Vec<EdgeKey> {
        self.incident_edges(a)
            .into_iter()
            .filter(|&e| {
                self.edge_endpoints(e)
                    .is_some_and(|(s, t)| (s == a && t == b) || (s == b && t == a))
            })
            .collect()
    }

    /// True if `edge` is used by any face or composite.
    pub fn edge_in_use(&self, edge: EdgeKey) -> bool {
        self.edge_to_faces.get(&edge).is_some_and(|s| !s.is_empty())
            || self.edge_to_composites.get(&edge).is_some_and(|s| !s.is_empty())
    }

    pub(crate) fn sort_edges_by_tag(&self, edges: &mut [EdgeKey]) {
        edges.sort_by_key(|&e| self.edges.get(e).map_or(usize::MAX, |d| d.tag));
    }

    pub(crate) fn sort_faces_by_tag(&self, faces: &mut [FaceKey]) {
        faces.sort_by_key(|&f| self.faces.get(f).map_or(usize::MAX, |d| d.tag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn square(arena: &mut BrepArena, x0: f64) -> (Vec<PointKey>, FaceKey) {
        let pts: Vec<PointKey> = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
            .iter()
            .map(|c| arena.add_point(Point3::new(c[0] + x0, c[1], 0.0)))
            .collect();
        let face = arena.add_quad_surface(&pts).unwrap();
        (pts, face)
    }

    #[test]
    fn face_vertices_follow_boundary_order() {
        let mut arena = BrepArena::new();
        let (pts, face) = square(&mut arena, 0.0);
        assert_eq!(arena.face_vertices(face).unwrap(), pts);
        assert_eq!(arena.face_edges(face).unwrap().len(), 4);
    }

    #[test]
    fn incident_edges_are_back_references() {
        let mut arena = BrepArena::new();
        let (pts, face) = square(&mut arena, 0.0);
        let incident = arena.incident_edges(pts[0]);
        assert_eq!(incident.len(), 2);
        for e in incident {
            assert_eq!(arena.faces_using_edge(e), vec![face]);
        }
    }

    #[test]
    fn neighbors_share_an_edge() {
        let mut arena = BrepArena::new();
        let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_point(Point3::new(1.0, 0.0, 0.0));
        let c = arena.add_point(Point3::new(1.0, 1.0, 0.0));
        let d = arena.add_point(Point3::new(0.0, 1.0, 0.0));
        let e = arena.add_point(Point3::new(2.0, 0.0, 0.0));
        let f = arena.add_point(Point3::new(2.0, 1.0, 0.0));
        let left = arena.add_quad_surface(&[a, b, c, d]).unwrap();
        let right = arena.add_quad_surface(&[b, e, f, c]).unwrap();

        assert_eq!(arena.neighbor_faces(left), vec![right]);
        let shared = arena.edges_between(b, c);
        assert_eq!(shared.len(), 1);
        assert_eq!(arena.faces_using_edge(shared[0]), vec![left, right]);
        assert_eq!(arena.faces_at_point(b), vec![left, right]);
    }

    #[test]
    fn composite_endpoints_and_vertices() {
        let mut arena = BrepArena::new();
        let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_point(Point3::new(1.0, 0.0, 0.0));
        let c = arena.add_point(Point3::new(2.0, 0.0, 0.0));
        let ab = arena.add_line(a, b).unwrap();
        let cb = arena.add_line(c, b).unwrap();
        let chain = arena.add_composite_edge(&[ab, cb]).unwrap();

        assert_eq!(arena.edge_endpoints(chain), Some((a, c)));
        assert_eq!(arena.edge_vertices(chain).unwrap(), vec![a, b, c]);
        assert_eq!(arena.leaf_edges(chain), vec![ab, cb]);
        assert_eq!(arena.composites_using(ab), vec![chain]);
        assert!(arena.edge_in_use(cb));
    }
}
