// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Oriented edge chains: composite edges, face boundaries and reversal.

use std::collections::VecDeque;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

impl BrepArena {
    /// Orients an ordered list of edges into a contiguous chain.
    ///
    /// The first edge's direction is chosen so that its end meets the second
    /// edge; every following edge is flipped as needed to start where the
    /// previous one ended.
    pub(crate) fn orient_chain(&self, edges: &[EdgeKey]) -> Result<VecDeque<Side>> {
        for &e in edges {
            if !self.edges.contains_key(e) {
                return Err(Error::EdgeNotFound(e));
            }
        }
        let mut sides = VecDeque::with_capacity(edges.len());
        let Some(&first) = edges.first() else {
            return Ok(sides);
        };

        let (fa, fb) = self.edge_endpoints(first).ok_or(Error::EdgeNotFound(first))?;
        let forward = match edges.get(1) {
            None => true,
            Some(&second) => {
                let (sa, sb) = self.edge_endpoints(second).ok_or(Error::EdgeNotFound(second))?;
                if fb == sa || fb == sb {
                    true
                } else if fa == sa || fa == sb {
                    false
                } else {
                    return Err(Error::NonContiguous(second));
                }
            }
        };
        sides.push_back(Side::new(first, forward));

        for &e in &edges[1..] {
            let prev_end = sides
                .back()
                .and_then(|&s| self.side_end(s))
                .ok_or(Error::EdgeNotFound(e))?;
            let (a, b) = self.edge_endpoints(e).ok_or(Error::EdgeNotFound(e))?;
            if a == prev_end {
                sides.push_back(Side::new(e, true));
            } else if b == prev_end {
                sides.push_back(Side::new(e, false));
            } else {
                return Err(Error::NonContiguous(e));
            }
        }
        Ok(sides)
    }

    /// True if `container` is `target` or contains it through any depth of
    /// composites.
    pub(crate) fn contains_edge(&self, container: EdgeKey, target: EdgeKey) -> bool {
        if container == target {
            return true;
        }
        match self.edges.get(container).map(|e| &e.geometry) {
            Some(EdgeGeometry::Composite(c)) => {
                c.sides.iter().any(|s| self.contains_edge(s.edge, target))
            }
            _ => false,
        }
    }

    /// Sides of a composite edge.
    pub fn composite_sides(&self, composite: EdgeKey) -> Option<Vec<Side>> {
        match &self.edges.get(composite)?.geometry {
            EdgeGeometry::Composite(c) => Some(c.sides.iter().copied().collect()),
            _ => None,
        }
    }

    /// Adds `edge` to a composite chain.
    ///
    /// The edge is appended if it touches the chain's end and prepended if it
    /// touches the chain's start; its orientation is flipped as needed.
    /// Composites used by a face cannot change shape.
    pub fn composite_insert(&mut self, composite: EdgeKey, edge: EdgeKey) -> Result<()> {
        let data = self.edges.get(composite).ok_or(Error::EdgeNotFound(composite))?;
        if !data.geometry.is_composite() {
            return Err(Error::EdgeNotFound(composite));
        }
        if data.has_nodes() {
            return Err(Error::AlreadyMeshed(composite.into()));
        }
        if self.edge_to_faces.get(&composite).is_some_and(|s| !s.is_empty()) {
            return Err(Error::InUse(composite.into()));
        }
        if !self.edges.contains_key(edge) {
            return Err(Error::EdgeNotFound(edge));
        }
        if self.contains_edge(edge, composite) {
            return Err(Error::RecursiveComposite(composite));
        }

        let (a, b) = self.edge_endpoints(edge).ok_or(Error::EdgeNotFound(edge))?;
        let ends = self.edge_endpoints(composite);
        let side = match ends {
            None => Placement::Back(Side::new(edge, true)),
            Some((head, tail)) => {
                if a == tail {
                    Placement::Back(Side::new(edge, true))
                } else if b == tail {
                    Placement::Back(Side::new(edge, false))
                } else if b == head {
                    Placement::Front(Side::new(edge, true))
                } else if a == head {
                    Placement::Front(Side::new(edge, false))
                } else {
                    return Err(Error::NonContiguous(edge));
                }
            }
        };

        if let Some(EdgeData {
            geometry: EdgeGeometry::Composite(c),
            ..
        }) = self.edges.get_mut(composite)
        {
            match side {
                Placement::Back(s) => c.sides.push_back(s),
                Placement::Front(s) => c.sides.push_front(s),
            }
        }
        self.link_edge_composite(edge, composite);
        self.refresh_composite_ndiv(composite);
        Ok(())
    }

    // --- Reversal ---

    /// Reverses the direction of an unmeshed edge.
    ///
    /// Faces and composites that use the edge keep walking it the same way
    /// in space, so their side flags are flipped along with it.
    pub fn reverse_edge(&mut self, edge: EdgeKey) -> Result<()> {
        let data = self.edges.get_mut(edge).ok_or(Error::EdgeNotFound(edge))?;
        if data.has_nodes() {
            return Err(Error::AlreadyMeshed(edge.into()));
        }
        match &mut data.geometry {
            EdgeGeometry::Segment { start, end } | EdgeGeometry::Arc { start, end, .. } => {
                std::mem::swap(start, end);
            }
            EdgeGeometry::SegmentedLine {
                start,
                end,
                lengths,
            } => {
                std::mem::swap(start, end);
                lengths.reverse();
            }
            EdgeGeometry::Composite(c) => reverse_chain(&mut c.sides),
        }

        let faces: Vec<FaceKey> = self
            .edge_to_faces
            .get(&edge)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for f in faces {
            if let Some(face) = self.faces.get_mut(f) {
                flip_sides_of(&mut face.sides, edge);
            }
        }
        let composites: Vec<EdgeKey> = self
            .edge_to_composites
            .get(&edge)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for c in composites {
            if let Some(EdgeData {
                geometry: EdgeGeometry::Composite(chain),
                ..
            }) = self.edges.get_mut(c)
            {
                flip_sides_of(&mut chain.sides, edge);
            }
        }
        Ok(())
    }

    /// Reverses the orientation of an unmeshed face.
    ///
    /// A boundary `I → J → K → L` becomes `L → K → J → I`; applying it twice
    /// restores the original side sequence.
    pub fn reverse_face(&mut self, face: FaceKey) -> Result<()> {
        let data = self.faces.get_mut(face).ok_or(Error::FaceNotFound(face))?;
        if data.has_nodes() {
            return Err(Error::AlreadyMeshed(face.into()));
        }
        reverse_chain(&mut data.sides);
        if !data.sides.is_empty() {
            data.sides.rotate_left(1);
        }
        Ok(())
    }
}

enum Placement {
    Front(Side),
    Back(Side),
}

/// Walks a chain backwards: order reversed, each side flipped.
fn reverse_chain(sides: &mut VecDeque<Side>) {
    let reversed: VecDeque<Side> = sides.iter().rev().map(|s| s.flipped()).collect();
    *sides = reversed;
}

fn flip_sides_of(sides: &mut VecDeque<Side>, edge: EdgeKey) {
    for s in sides.iter_mut().filter(|s| s.edge == edge) {
        s.forward = !s.forward;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn line_points(arena: &mut BrepArena, n: usize) -> Vec<PointKey> {
        (0..n)
            .map(|i| arena.add_point(Point3::new(i as f64, 0.0, 0.0)))
            .collect()
    }

    #[test]
    fn orient_chain_flips_backward_edges() {
        let mut arena = BrepArena::new();
        let p = line_points(&mut arena, 3);
        let e0 = arena.add_line(p[1], p[0]).unwrap();
        let e1 = arena.add_line(p[1], p[2]).unwrap();
        let sides = arena.orient_chain(&[e0, e1]).unwrap();
        assert_eq!(sides[0], Side::new(e0, false));
        assert_eq!(sides[1], Side::new(e1, true));
    }

    #[test]
    fn orient_chain_rejects_gaps() {
        let mut arena = BrepArena::new();
        let p = line_points(&mut arena, 4);
        let e0 = arena.add_line(p[0], p[1]).unwrap();
        let e1 = arena.add_line(p[2], p[3]).unwrap();
        assert!(matches!(arena.orient_chain(&[e0, e1]), Err(Error::NonContiguous(e)) if e == e1));
    }

    #[test]
    fn insert_appends_and_prepends() {
        let mut arena = BrepArena::new();
        let p = line_points(&mut arena, 4);
        let e01 = arena.add_line(p[0], p[1]).unwrap();
        let e21 = arena.add_line(p[2], p[1]).unwrap();
        let e32 = arena.add_line(p[3], p[2]).unwrap();
        let chain = arena.add_composite_edge(&[e21]).unwrap();

        arena.composite_insert(chain, e32).unwrap();
        arena.composite_insert(chain, e01).unwrap();

        assert_eq!(arena.edge_vertices(chain).unwrap(), vec![p[3], p[2], p[1], p[0]]);
        assert_eq!(arena.composite_sides(chain).unwrap().len(), 3);
        assert!(arena.composites_using(e01).contains(&chain));
    }

    #[test]
    fn insert_rejects_detached_and_recursive_edges() {
        let mut arena = BrepArena::new();
        let p = line_points(&mut arena, 4);
        let e01 = arena.add_line(p[0], p[1]).unwrap();
        let e23 = arena.add_line(p[2], p[3]).unwrap();
        let chain = arena.add_composite_edge(&[e01]).unwrap();

        assert!(matches!(arena.composite_insert(chain, e23), Err(Error::NonContiguous(_))));
        assert!(matches!(arena.composite_insert(chain, chain), Err(Error::RecursiveComposite(_))));
    }

    #[test]
    fn reverse_edge_keeps_face_boundary_contiguous() {
        let mut arena = BrepArena::new();
        let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_point(Point3::new(1.0, 0.0, 0.0));
        let c = arena.add_point(Point3::new(1.0, 1.0, 0.0));
        let d = arena.add_point(Point3::new(0.0, 1.0, 0.0));
        let face = arena.add_quad_surface(&[a, b, c, d]).unwrap();
        let before = arena.face_vertices(face).unwrap();

        let ab = arena.edges_between(a, b)[0];
        arena.reverse_edge(ab).unwrap();
        assert_eq!(arena.edge_endpoints(ab), Some((b, a)));
        assert_eq!(arena.face_vertices(face).unwrap(), before);
        assert!(arena.validate().is_empty());
    }

    #[test]
    fn reverse_face_gives_lkji_and_round_trips() {
        let mut arena = BrepArena::new();
        let pts: Vec<PointKey> = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
            .iter()
            .map(|c| arena.add_point(Point3::new(c[0], c[1], 0.0)))
            .collect();
        let face = arena.add_quad_surface(&pts).unwrap();
        let original = arena.face_sides(face).unwrap();

        arena.reverse_face(face).unwrap();
        assert_eq!(arena.face_vertices(face).unwrap(), vec![pts[3], pts[2], pts[1], pts[0]]);

        arena.reverse_face(face).unwrap();
        assert_eq!(arena.face_sides(face).unwrap(), original);
    }

    #[test]
    fn reverse_composite_twice_restores_vertices() {
        let mut arena = BrepArena::new();
        let p = line_points(&mut arena, 3);
        let e0 = arena.add_line(p[0], p[1]).unwrap();
        let e1 = arena.add_segmented_line(p[1], p[2], vec![1.0, 2.0]).unwrap();
        let chain = arena.add_composite_edge(&[e0, e1]).unwrap();
        let original = arena.edge_vertices(chain).unwrap();

        arena.reverse_edge(chain).unwrap();
        assert_eq!(arena.edge_vertices(chain).unwrap(), vec![p[2], p[1], p[0]]);
        arena.reverse_edge(chain).unwrap();
        assert_eq!(arena.edge_vertices(chain).unwrap(), original);
    }
}
