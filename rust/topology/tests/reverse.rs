// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reversal round trips on generated polygons and chains.

use brepmesh_topology::{BrepArena, EdgeKey, FaceKey, PointKey};
use nalgebra::Point3;
use proptest::prelude::*;

/// Convex polygon with `n` corners on a circle, radii jittered.
fn polygon(arena: &mut BrepArena, radii: &[f64]) -> (Vec<PointKey>, FaceKey) {
    let n = radii.len();
    let pts: Vec<PointKey> = radii
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            arena.add_point(Point3::new(r * a.cos(), r * a.sin(), 0.0))
        })
        .collect();
    let face = arena.add_quad_surface(&pts).unwrap();
    (pts, face)
}

/// Open chain of `n` segments along x, every other one built backwards.
fn chain(arena: &mut BrepArena, n: usize) -> (Vec<PointKey>, EdgeKey) {
    let pts: Vec<PointKey> = (0..=n)
        .map(|i| arena.add_point(Point3::new(i as f64, (i % 2) as f64 * 0.1, 0.0)))
        .collect();
    let edges: Vec<EdgeKey> = (0..n)
        .map(|i| {
            if i % 2 == 0 {
                arena.add_line(pts[i], pts[i + 1]).unwrap()
            } else {
                arena.add_line(pts[i + 1], pts[i]).unwrap()
            }
        })
        .collect();
    let composite = arena.add_composite_edge(&edges).unwrap();
    (pts, composite)
}

proptest! {
    #[test]
    fn face_reverse_twice_restores_vertices(radii in prop::collection::vec(0.5f64..2.0, 4..12)) {
        let mut arena = BrepArena::new();
        let (pts, face) = polygon(&mut arena, &radii);
        let before = arena.face_vertices(face).unwrap();
        prop_assert_eq!(&before, &pts);

        arena.reverse_face(face).unwrap();
        // I, J, K, L becomes L, K, J, I
        let once = arena.face_vertices(face).unwrap();
        let backwards: Vec<PointKey> = pts.iter().rev().copied().collect();
        prop_assert_eq!(&once, &backwards);

        arena.reverse_face(face).unwrap();
        prop_assert_eq!(arena.face_vertices(face).unwrap(), before);
        prop_assert!(arena.validate().is_empty());
    }

    #[test]
    fn composite_reverse_twice_restores_vertices(n in 1usize..10) {
        let mut arena = BrepArena::new();
        let (pts, composite) = chain(&mut arena, n);
        let before = arena.edge_vertices(composite).unwrap();
        prop_assert_eq!(&before, &pts);

        arena.reverse_edge(composite).unwrap();
        let mut backwards = pts.clone();
        backwards.reverse();
        prop_assert_eq!(arena.edge_vertices(composite).unwrap(), backwards);

        arena.reverse_edge(composite).unwrap();
        prop_assert_eq!(arena.edge_vertices(composite).unwrap(), before);
        prop_assert!(arena.validate().is_empty());
    }

    #[test]
    fn reversing_a_boundary_edge_keeps_the_face_closed(
        radii in prop::collection::vec(0.5f64..2.0, 4..8),
        pick in 0usize..8,
    ) {
        let mut arena = BrepArena::new();
        let (_, face) = polygon(&mut arena, &radii);
        let edges = arena.face_edges(face).unwrap();
        let edge = edges[pick % edges.len()];
        let before = arena.face_vertices(face).unwrap();

        arena.reverse_edge(edge).unwrap();
        prop_assert_eq!(arena.face_vertices(face).unwrap(), before);
        prop_assert!(arena.validate().is_empty());
    }
}
