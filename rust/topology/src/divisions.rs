// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Division counts and their reconciliation between adjacent entities.
//!
//! Requests never fail. A request that would break an existing mesh or
//! shrink a shared edge is clamped, and the outcome is recorded in the
//! caller's [`Diagnostics`]. Rules, in order:
//!
//! 1. an edge that already has nodes keeps its count;
//! 2. a composite spreads the request over its sides by length;
//! 3. an edge bounding two or more faces only grows once set explicitly;
//! 4. opposite sides of a face are driven to the same count, and an already
//!    meshed side wins.

use crate::arena::*;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::keys::*;

/// Division count that gives pieces no longer than `size`.
pub fn divisions_for_size(length: f64, size: f64) -> usize {
    let ratio = length / size;
    let n = (ratio - 1e-9 * ratio.max(1.0)).ceil();
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}

/// Splits `n` divisions over parts of the given lengths, at least one each,
/// using largest remainders.
pub fn distribute_divisions(n: usize, lengths: &[f64]) -> Vec<usize> {
    let parts = lengths.len();
    if parts == 0 {
        return Vec::new();
    }
    let total: f64 = lengths.iter().sum();
    let weights: Vec<f64> = if total > 0.0 && total.is_finite() {
        lengths.iter().map(|l| l / total).collect()
    } else {
        vec![1.0 / parts as f64; parts]
    };

    let raw: Vec<f64> = weights.iter().map(|w| w * n as f64).collect();
    let mut counts: Vec<usize> = raw.iter().map(|r| (r.floor() as usize).max(1)).collect();
    let assigned: usize = counts.iter().sum();
    if assigned < n {
        let mut order: Vec<usize> = (0..parts).collect();
        order.sort_by(|&a, &b| {
            let fa = raw[a] - raw[a].floor();
            let fb = raw[b] - raw[b].floor();
            fb.total_cmp(&fa).then(a.cmp(&b))
        });
        for &i in order.iter().cycle().take(n - assigned) {
            counts[i] += 1;
        }
    }
    counts
}

impl BrepArena {
    /// Division count of an edge; composites report the sum of their sides.
    pub fn edge_ndiv(&self, edge: EdgeKey) -> usize {
        self.edges.get(edge).map_or(0, |e| e.ndiv)
    }

    /// True if the edge, or any edge it is built from, has nodes.
    pub fn edge_is_meshed(&self, edge: EdgeKey) -> bool {
        match self.edges.get(edge) {
            None => false,
            Some(data) if data.has_nodes() => true,
            Some(data) => match &data.geometry {
                EdgeGeometry::Composite(c) => c.sides.iter().any(|s| self.edge_is_meshed(s.edge)),
                _ => false,
            },
        }
    }

    /// Requests `n` divisions on `edge` and returns the count actually in
    /// effect afterwards.
    pub fn set_division_count(&mut self, edge: EdgeKey, n: usize, diag: &mut Diagnostics) -> usize {
        let Some(data) = self.edges.get(edge) else {
            diag.error(DiagnosticKind::MissingEntity, Some(edge.into()), "edge not found");
            return 0;
        };
        let current = data.ndiv;
        if n == 0 {
            diag.warn(
                DiagnosticKind::DegenerateGeometry,
                Some(edge.into()),
                format!("{}: zero divisions requested, keeping {}", data.name, current),
            );
            return current;
        }

        if self.edge_is_meshed(edge) {
            if n != current {
                diag.warn(
                    DiagnosticKind::Reconciliation,
                    Some(edge.into()),
                    format!(
                        "{} is already meshed with {} divisions; request for {} ignored",
                        data.name, current, n
                    ),
                );
            }
            return current;
        }

        if let EdgeGeometry::Composite(c) = &data.geometry {
            let sides: Vec<EdgeKey> = c.sides.iter().map(|s| s.edge).collect();
            let lengths: Vec<f64> = sides
                .iter()
                .map(|&e| self.edge_length(e).unwrap_or(0.0))
                .collect();
            if n < sides.len() {
                diag.warn(
                    DiagnosticKind::Reconciliation,
                    Some(edge.into()),
                    format!(
                        "{} has {} sides; {} divisions cannot be split, using one per side",
                        data.name,
                        sides.len(),
                        n
                    ),
                );
            }
            for (sub, count) in sides.into_iter().zip(distribute_divisions(n, &lengths)) {
                self.set_division_count(sub, count, diag);
            }
            self.refresh_composite_ndiv(edge);
            return self.edge_ndiv(edge);
        }

        let shared = self.faces_touching(edge).len() >= 2;
        if shared && data.ndiv_set && n < current {
            diag.warn(
                DiagnosticKind::Reconciliation,
                Some(edge.into()),
                format!(
                    "{} is shared by several faces; keeping {} divisions instead of {}",
                    data.name, current, n
                ),
            );
            return current;
        }

        if let Some(data) = self.edges.get_mut(edge) {
            data.ndiv = n;
            data.ndiv_set = true;
        }
        self.refresh_parent_composites(edge);
        n
    }

    /// Sets the division count from a target element length.
    pub fn set_element_size(&mut self, edge: EdgeKey, size: f64, diag: &mut Diagnostics) -> usize {
        if !(size.is_finite() && size > 0.0) {
            diag.warn(
                DiagnosticKind::DegenerateGeometry,
                Some(edge.into()),
                format!("invalid element size {size}"),
            );
            return self.edge_ndiv(edge);
        }
        let Some(length) = self.edge_length(edge) else {
            diag.error(DiagnosticKind::MissingEntity, Some(edge.into()), "edge not found");
            return 0;
        };
        self.set_division_count(edge, divisions_for_size(length, size), diag)
    }

    /// Recomputes a composite's count from its sides, then its parents'.
    pub(crate) fn refresh_composite_ndiv(&mut self, composite: EdgeKey) {
        let Some(EdgeGeometry::Composite(c)) = self.edges.get(composite).map(|e| &e.geometry) else {
            return;
        };
        let total: usize = c.sides.iter().map(|s| self.edge_ndiv(s.edge)).sum();
        let explicit = c
            .sides
            .iter()
            .any(|s| self.edges.get(s.edge).is_some_and(|e| e.ndiv_set));
        if let Some(data) = self.edges.get_mut(composite) {
            data.ndiv = total;
            data.ndiv_set = explicit;
        }
        self.refresh_parent_composites(composite);
    }

    fn refresh_parent_composites(&mut self, edge: EdgeKey) {
        let parents: Vec<EdgeKey> = self
            .edge_to_composites
            .get(&edge)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for parent in parents {
            self.refresh_composite_ndiv(parent);
        }
    }

    // --- Faces ---

    /// Division count along I (side 0 and its opposite).
    pub fn face_ndiv_i(&self, face: FaceKey) -> Option<usize> {
        let side = *self.faces.get(face)?.sides.front()?;
        Some(self.edge_ndiv(side.edge))
    }

    /// Division count along J (side 1 and its opposite).
    pub fn face_ndiv_j(&self, face: FaceKey) -> Option<usize> {
        let side = *self.faces.get(face)?.sides.get(1)?;
        Some(self.edge_ndiv(side.edge))
    }

    /// Index of the side opposite side `i`: `(i + n/2) mod n`. Only defined
    /// for an even number of sides.
    pub fn opposite_side_index(&self, face: FaceKey, i: usize) -> Option<usize> {
        let n = self.faces.get(face)?.sides.len();
        (n > 0 && n % 2 == 0 && i < n).then(|| (i + n / 2) % n)
    }

    /// Pairs of opposite edges, side `k` with side `k + n/2`.
    pub fn opposite_edges(&self, face: FaceKey) -> Vec<(EdgeKey, EdgeKey)> {
        let Some(data) = self.faces.get(face) else {
            return Vec::new();
        };
        let n = data.sides.len();
        if n % 2 != 0 {
            return Vec::new();
        }
        (0..n / 2)
            .map(|k| (data.sides[k].edge, data.sides[k + n / 2].edge))
            .collect()
    }

    /// True if every pair of opposite sides has the same division count.
    pub fn check_ndivs(&self, face: FaceKey) -> bool {
        let Some(data) = self.faces.get(face) else {
            return false;
        };
        let n = data.sides.len();
        if n == 0 || n % 2 != 0 {
            return false;
        }
        self.opposite_edges(face)
            .iter()
            .all(|&(a, b)| self.edge_ndiv(a) == self.edge_ndiv(b))
    }

    /// Requests `n` divisions along I.
    pub fn set_ndiv_i(&mut self, face: FaceKey, n: usize, diag: &mut Diagnostics) {
        self.set_axis_ndiv(face, 0, n, diag);
    }

    /// Requests `n` divisions along J.
    pub fn set_ndiv_j(&mut self, face: FaceKey, n: usize, diag: &mut Diagnostics) {
        self.set_axis_ndiv(face, 1, n, diag);
    }

    /// Drives every pair `k ≡ parity (mod 2)` to `n`. Odd faces fall back to
    /// setting all sides.
    fn set_axis_ndiv(&mut self, face: FaceKey, parity: usize, n: usize, diag: &mut Diagnostics) {
        let Some(data) = self.faces.get(face) else {
            diag.error(DiagnosticKind::MissingEntity, Some(face.into()), "face not found");
            return;
        };
        let sides = data.sides.len();
        if sides % 2 != 0 {
            diag.warn(
                DiagnosticKind::OddSideCount,
                Some(face.into()),
                format!(
                    "{} has {} sides; I/J control needs an even count, setting every side",
                    data.name, sides
                ),
            );
            let edges: Vec<EdgeKey> = data.sides.iter().map(|s| s.edge).collect();
            for e in edges {
                self.set_division_count(e, n, diag);
            }
            return;
        }
        for k in (parity..sides / 2).step_by(2) {
            self.set_pair_ndiv(face, k, n, diag);
        }
    }

    /// Gives side `k` and its opposite the same count, preferring `n` unless
    /// one of them is already meshed.
    fn set_pair_ndiv(&mut self, face: FaceKey, k: usize, n: usize, diag: &mut Diagnostics) {
        let Some(opp) = self.opposite_side_index(face, k) else {
            return;
        };
        let (e1, e2) = {
            let data = &self.faces[face];
            (data.sides[k].edge, data.sides[opp].edge)
        };

        let target = match (self.edge_is_meshed(e1), self.edge_is_meshed(e2)) {
            (true, true) => {
                if self.edge_ndiv(e1) != self.edge_ndiv(e2) {
                    diag.warn(
                        DiagnosticKind::NonConforming,
                        Some(face.into()),
                        format!(
                            "opposite sides {} and {} are both meshed with different counts",
                            k, opp
                        ),
                    );
                } else if self.edge_ndiv(e1) != n {
                    diag.warn(
                        DiagnosticKind::Reconciliation,
                        Some(face.into()),
                        format!("sides {} and {} are meshed; request for {} ignored", k, opp, n),
                    );
                }
                return;
            }
            (true, false) | (false, true) => {
                let meshed = if self.edge_is_meshed(e1) { e1 } else { e2 };
                let existing = self.edge_ndiv(meshed);
                if existing != n {
                    diag.warn(
                        DiagnosticKind::Reconciliation,
                        Some(face.into()),
                        format!(
                            "side {k} or {opp} is already meshed with {existing} divisions; \
                             using it instead of {n}"
                        ),
                    );
                }
                existing
            }
            (false, false) => n,
        };

        let r1 = self.set_division_count(e1, target, diag);
        let r2 = self.set_division_count(e2, target, diag);
        if r1 != r2 {
            let grown = r1.max(r2);
            self.set_division_count(e1, grown, diag);
            self.set_division_count(e2, grown, diag);
        }
        if self.edge_ndiv(e1) != self.edge_ndiv(e2) {
            diag.warn(
                DiagnosticKind::NonConforming,
                Some(face.into()),
                format!(
                    "sides {} and {} end with {} and {} divisions",
                    k,
                    opp,
                    self.edge_ndiv(e1),
                    self.edge_ndiv(e2)
                ),
            );
        }
    }

    /// Derives I/J counts from target element lengths, using the longer
    /// side of each opposite pair.
    pub fn face_set_element_size(
        &mut self,
        face: FaceKey,
        size_i: f64,
        size_j: f64,
        diag: &mut Diagnostics,
    ) {
        let Some(data) = self.faces.get(face) else {
            diag.error(DiagnosticKind::MissingEntity, Some(face.into()), "face not found");
            return;
        };
        let sides = data.sides.len();
        if sides % 2 != 0 {
            diag.warn(
                DiagnosticKind::OddSideCount,
                Some(face.into()),
                format!("{} has {} sides; sizing every side with {}", data.name, sides, size_i),
            );
            let edges: Vec<EdgeKey> = data.sides.iter().map(|s| s.edge).collect();
            for e in edges {
                self.set_element_size(e, size_i, diag);
            }
            return;
        }
        for (k, (a, b)) in self.opposite_edges(face).into_iter().enumerate() {
            let size = if k % 2 == 0 { size_i } else { size_j };
            if !(size.is_finite() && size > 0.0) {
                diag.warn(
                    DiagnosticKind::DegenerateGeometry,
                    Some(face.into()),
                    format!("invalid element size {size}"),
                );
                continue;
            }
            let length = self
                .edge_length(a)
                .unwrap_or(0.0)
                .max(self.edge_length(b).unwrap_or(0.0));
            self.set_pair_ndiv(face, k, divisions_for_size(length, size), diag);
        }
    }

    /// Equalises every opposite pair to the larger of its two counts.
    pub fn conform_ndivs(&mut self, face: FaceKey, diag: &mut Diagnostics) {
        for (k, (a, b)) in self.opposite_edges(face).into_iter().enumerate() {
            let (na, nb) = (self.edge_ndiv(a), self.edge_ndiv(b));
            if na != nb {
                self.set_pair_ndiv(face, k, na.max(nb), diag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn unit_square(arena: &mut BrepArena) -> FaceKey {
        let pts: Vec<PointKey> = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
            .iter()
            .map(|c| arena.add_point(Point3::new(c[0], c[1], 0.0)))
            .collect();
        arena.add_quad_surface(&pts).unwrap()
    }

    #[test]
    fn size_to_divisions() {
        assert_eq!(divisions_for_size(10.0, 2.5), 4);
        assert_eq!(divisions_for_size(10.0, 3.0), 4);
        assert_eq!(divisions_for_size(1.0, 5.0), 1);
    }

    #[test]
    fn distribution_is_proportional_and_exact() {
        assert_eq!(distribute_divisions(6, &[1.0, 2.0]), vec![2, 4]);
        assert_eq!(distribute_divisions(5, &[1.0, 1.0]).iter().sum::<usize>(), 5);
        assert_eq!(distribute_divisions(1, &[1.0, 1.0, 1.0]), vec![1, 1, 1]);
    }

    #[test]
    fn element_size_on_segment() {
        let mut arena = BrepArena::new();
        let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_point(Point3::new(10.0, 0.0, 0.0));
        let e = arena.add_line(a, b).unwrap();
        let mut diag = Diagnostics::new();
        assert_eq!(arena.set_element_size(e, 2.5, &mut diag), 4);
        assert!(diag.is_empty());
    }

    #[test]
    fn ij_requests_keep_opposite_sides_equal() {
        let mut arena = BrepArena::new();
        let face = unit_square(&mut arena);
        let mut diag = Diagnostics::new();
        arena.set_ndiv_i(face, 3, &mut diag);
        arena.set_ndiv_j(face, 5, &mut diag);

        assert!(arena.check_ndivs(face));
        assert_eq!(arena.face_ndiv_i(face), Some(3));
        assert_eq!(arena.face_ndiv_j(face), Some(5));
        assert_eq!(arena.opposite_side_index(face, 3), Some(1));
        assert!(diag.is_empty());
    }

    #[test]
    fn shared_edge_only_grows() {
        let mut arena = BrepArena::new();
        let faces = arena
            .add_quad_grid(
                Point3::origin(),
                nalgebra::Vector3::x() * 2.0,
                nalgebra::Vector3::y(),
                2,
                1,
            )
            .unwrap();
        let mut diag = Diagnostics::new();
        arena.set_ndiv_j(faces[0], 6, &mut diag);
        arena.set_ndiv_j(faces[1], 2, &mut diag);

        assert_eq!(arena.face_ndiv_j(faces[0]), Some(6));
        assert_eq!(arena.face_ndiv_j(faces[1]), Some(6));
        assert!(arena.check_ndivs(faces[1]));
        assert!(diag.has(DiagnosticKind::Reconciliation));
    }

    #[test]
    fn composite_spreads_divisions_by_length() {
        let mut arena = BrepArena::new();
        let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_point(Point3::new(1.0, 0.0, 0.0));
        let c = arena.add_point(Point3::new(3.0, 0.0, 0.0));
        let ab = arena.add_line(a, b).unwrap();
        let bc = arena.add_line(b, c).unwrap();
        let chain = arena.add_composite_edge(&[ab, bc]).unwrap();
        let mut diag = Diagnostics::new();

        assert_eq!(arena.set_division_count(chain, 6, &mut diag), 6);
        assert_eq!(arena.edge_ndiv(ab), 2);
        assert_eq!(arena.edge_ndiv(bc), 4);
        assert_eq!(arena.edge_positions(chain).unwrap().len(), 7);
    }

    #[test]
    fn odd_faces_fall_back_to_all_sides() {
        let mut arena = BrepArena::new();
        let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_point(Point3::new(1.0, 0.0, 0.0));
        let c = arena.add_point(Point3::new(0.0, 1.0, 0.0));
        let ab = arena.add_line(a, b).unwrap();
        let bc = arena.add_line(b, c).unwrap();
        let ca = arena.add_line(c, a).unwrap();
        let tri = arena.add_face(&[ab, bc, ca]).unwrap();
        let mut diag = Diagnostics::new();

        arena.set_ndiv_i(tri, 3, &mut diag);
        assert!(diag.has(DiagnosticKind::OddSideCount));
        assert_eq!(arena.edge_ndiv(ca), 3);
        assert_eq!(arena.opposite_side_index(tri, 0), None);
        assert!(!arena.check_ndivs(tri));
    }

    #[test]
    fn zero_divisions_are_ignored() {
        let mut arena = BrepArena::new();
        let face = unit_square(&mut arena);
        let e = arena.face_edges(face).unwrap()[0];
        let mut diag = Diagnostics::new();
        assert_eq!(arena.set_division_count(e, 0, &mut diag), 4);
        assert!(diag.has(DiagnosticKind::DegenerateGeometry));
    }
}
