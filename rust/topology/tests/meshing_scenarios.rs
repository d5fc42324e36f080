// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end meshing scenarios through the public API.

use approx::assert_relative_eq;
use brepmesh_topology::{
    BrepArena, DiagnosticKind, Diagnostics, EdgeKey, FaceKey, FaceState, InMemoryMesh, MeshDomain,
    PointKey,
};
use nalgebra::Point3;

fn points(arena: &mut BrepArena, coords: &[[f64; 2]]) -> Vec<PointKey> {
    coords
        .iter()
        .map(|c| arena.add_point(Point3::new(c[0], c[1], 0.0)))
        .collect()
}

fn assert_positions_follow(arena: &BrepArena, edge: EdgeKey) {
    let positions = arena.edge_positions(edge).unwrap();
    let (a, b) = arena.edge_endpoints(edge).unwrap();
    assert_eq!(positions.len(), arena.edge_ndiv(edge) + 1);
    assert_relative_eq!(positions[0], arena.point_position(a).unwrap(), epsilon = 1e-12);
    assert_relative_eq!(
        *positions.last().unwrap(),
        arena.point_position(b).unwrap(),
        epsilon = 1e-12
    );
}

#[test]
fn unit_square_with_two_by_two_divisions() {
    let mut arena = BrepArena::new();
    let mut mesh = InMemoryMesh::new();
    let mut diag = Diagnostics::new();
    let pts = points(&mut arena, &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    let face = arena.add_quad_surface(&pts).unwrap();

    arena.set_ndiv_i(face, 2, &mut diag);
    arena.set_ndiv_j(face, 2, &mut diag);
    assert!(arena.check_ndivs(face));

    arena.generate_face_mesh(face, &mut mesh, &mut diag);
    assert_eq!(mesh.node_count(), 9);
    assert_eq!(mesh.element_count(), 4);
    for element in mesh.elements() {
        assert_relative_eq!(mesh.element_measure(element.tag).unwrap(), 0.25, epsilon = 1e-12);
    }

    let grid = arena.face_node_grid(face).unwrap();
    let corners = [grid[(0, 0, 0)], grid[(0, 0, 2)], grid[(0, 2, 2)], grid[(0, 2, 0)]];
    for (corner, point) in corners.iter().zip(&pts) {
        let node = mesh.node_position(corner.unwrap()).unwrap();
        assert_relative_eq!(node, arena.point_position(*point).unwrap(), epsilon = 1e-12);
    }
    let centre = mesh.node_position(grid[(0, 1, 1)].unwrap()).unwrap();
    assert_relative_eq!(centre, Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
}

#[test]
fn element_size_on_a_ten_unit_segment() {
    let mut arena = BrepArena::new();
    let mut diag = Diagnostics::new();
    let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
    let b = arena.add_point(Point3::new(10.0, 0.0, 0.0));
    let line = arena.add_line(a, b).unwrap();

    assert_eq!(arena.set_element_size(line, 2.5, &mut diag), 4);
    let positions = arena.edge_positions(line).unwrap();
    assert_eq!(positions.len(), 5);
    for pair in positions.windows(2) {
        assert_relative_eq!((pair[1] - pair[0]).norm(), 2.5, epsilon = 1e-12);
    }
}

#[test]
fn positions_of_every_edge_kind_span_their_ends() {
    let mut arena = BrepArena::new();
    let mut diag = Diagnostics::new();
    let p = points(&mut arena, &[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
    let mid = arena.add_point(Point3::new(1.5, 0.5, 0.0));

    let segment = arena.add_line(p[0], p[1]).unwrap();
    let arc = arena.add_arc(p[1], mid, p[2]).unwrap();
    let graded = arena.add_segmented_line(p[3], p[2], vec![1.0, 2.0, 3.0]).unwrap();
    let chain = arena.add_composite_edge(&[segment, arc, graded]).unwrap();

    arena.set_division_count(arc, 5, &mut diag);
    for edge in [segment, arc, graded, chain] {
        assert_positions_follow(&arena, edge);
    }
    assert_eq!(arena.edge_ndiv(chain), 4 + 5 + 3);

    // graded spacing follows the length ratios 1 : 2 : 3
    let graded_positions = arena.edge_positions(graded).unwrap();
    assert_relative_eq!(graded_positions[1].x, 3.0 - 1.0 / 6.0, epsilon = 1e-12);
    assert_relative_eq!(graded_positions[2].x, 3.0 - 0.5, epsilon = 1e-12);

    // arc positions stay on the circle
    let circle = arena.arc_geometry(arc).unwrap();
    for q in arena.edge_positions(arc).unwrap() {
        assert_relative_eq!((q - circle.center).norm(), circle.radius, epsilon = 1e-12);
    }
}

fn two_squares(arena: &mut BrepArena) -> (Vec<PointKey>, FaceKey, FaceKey) {
    let p = points(
        arena,
        &[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0]],
    );
    let left = arena.add_quad_surface(&[p[0], p[1], p[4], p[3]]).unwrap();
    let right = arena.add_quad_surface(&[p[1], p[2], p[5], p[4]]).unwrap();
    (p, left, right)
}

#[test]
fn adjacent_faces_share_boundary_nodes() {
    let mut arena = BrepArena::new();
    let mut mesh = InMemoryMesh::new();
    let mut diag = Diagnostics::new();
    let (p, left, right) = two_squares(&mut arena);

    arena.set_ndiv_i(left, 2, &mut diag);
    arena.set_ndiv_j(left, 3, &mut diag);
    arena.set_ndiv_i(right, 2, &mut diag);
    arena.set_ndiv_j(right, 3, &mut diag);
    assert_eq!(arena.face_ndiv_j(right), Some(3));

    arena.generate_face_mesh(left, &mut mesh, &mut diag);
    arena.generate_face_mesh(right, &mut mesh, &mut diag);
    assert_eq!(mesh.node_count(), 5 * 4);
    assert_eq!(mesh.element_count(), 2 * 6);

    let shared = arena.edges_between(p[1], p[4])[0];
    let tags = arena.edge_node_tags(shared);
    assert_eq!(tags.len(), 4);
    let left_grid = arena.face_node_grid(left).unwrap();
    let right_grid = arena.face_node_grid(right).unwrap();
    for j in 0..4 {
        assert_eq!(left_grid[(0, j, 2)], right_grid[(0, j, 0)]);
    }
    assert!(diag.warnings().next().is_none());
}

#[test]
fn meshed_shared_edge_keeps_its_divisions() {
    let mut arena = BrepArena::new();
    let mut mesh = InMemoryMesh::new();
    let mut diag = Diagnostics::new();
    let (p, left, right) = two_squares(&mut arena);
    let shared = arena.edges_between(p[1], p[4])[0];
    assert_eq!(arena.faces_using_edge(shared).len(), 2);

    arena.generate_face_mesh(left, &mut mesh, &mut diag);
    assert_eq!(arena.edge_ndiv(shared), 4);

    assert_eq!(arena.set_division_count(shared, 6, &mut diag), 4);
    assert_eq!(arena.edge_ndiv(shared), 4);
    assert!(diag.has(DiagnosticKind::Reconciliation));

    // the neighbour now follows the meshed side
    diag.clear();
    arena.set_ndiv_j(right, 6, &mut diag);
    assert_eq!(arena.face_ndiv_j(right), Some(4));
    assert!(diag.has(DiagnosticKind::Reconciliation));
    arena.generate_face_mesh(right, &mut mesh, &mut diag);
    assert_eq!(arena.face(right).unwrap().state, FaceState::SurfaceMeshed);
}

#[test]
fn shared_edge_only_grows_once_set() {
    let mut arena = BrepArena::new();
    let mut diag = Diagnostics::new();
    let (p, _, _) = two_squares(&mut arena);
    let shared = arena.edges_between(p[1], p[4])[0];

    assert_eq!(arena.set_division_count(shared, 5, &mut diag), 5);
    assert_eq!(arena.set_division_count(shared, 3, &mut diag), 5);
    assert_eq!(arena.set_division_count(shared, 7, &mut diag), 7);
    assert_eq!(diag.count(DiagnosticKind::Reconciliation), 1);
}

#[test]
fn face_with_an_arc_side() {
    let mut arena = BrepArena::new();
    let mut mesh = InMemoryMesh::new();
    let mut diag = Diagnostics::new();
    let p = points(&mut arena, &[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
    let bulge = arena.add_point(Point3::new(1.0 + 2.0_f64.sqrt(), 1.0, 0.0));

    let bottom = arena.add_line(p[0], p[1]).unwrap();
    let arc = arena.add_arc(p[1], bulge, p[2]).unwrap();
    let top = arena.add_line(p[2], p[3]).unwrap();
    let left = arena.add_line(p[3], p[0]).unwrap();
    let face = arena.add_face(&[bottom, arc, top, left]).unwrap();

    arena.set_ndiv_i(face, 4, &mut diag);
    arena.set_ndiv_j(face, 6, &mut diag);
    let stats = arena.generate_face_mesh(face, &mut mesh, &mut diag);
    assert_eq!(stats.nodes_created, 5 * 7);
    assert_eq!(stats.elements_created, 4 * 6);

    let circle = arena.arc_geometry(arc).unwrap();
    for tag in arena.edge_node_tags(arc) {
        let q = mesh.node_position(tag).unwrap();
        assert_relative_eq!((q - circle.center).norm(), circle.radius, epsilon = 1e-12);
    }
    // the bulge enlarges the face beyond the 2 x 2 square
    let meshed_area: f64 = mesh
        .elements()
        .iter()
        .map(|e| mesh.element_measure(e.tag).unwrap())
        .sum();
    assert!(meshed_area > 4.0);
    assert!(!diag.has(DiagnosticKind::LowQuality));
}

#[test]
fn composite_side_spreads_divisions_over_its_edges() {
    let mut arena = BrepArena::new();
    let mut mesh = InMemoryMesh::new();
    let mut diag = Diagnostics::new();
    let p = points(&mut arena, &[[0.0, 0.0], [1.0, 0.0], [3.0, 0.0], [3.0, 1.0], [0.0, 1.0]]);

    let short = arena.add_line(p[0], p[1]).unwrap();
    let long = arena.add_line(p[1], p[2]).unwrap();
    let bottom = arena.add_composite_edge(&[short, long]).unwrap();
    let right = arena.add_line(p[2], p[3]).unwrap();
    let top = arena.add_line(p[3], p[4]).unwrap();
    let left = arena.add_line(p[4], p[0]).unwrap();
    let face = arena.add_face(&[bottom, right, top, left]).unwrap();

    arena.set_ndiv_i(face, 6, &mut diag);
    assert_eq!(arena.edge_ndiv(short), 2);
    assert_eq!(arena.edge_ndiv(long), 4);
    assert_eq!(arena.edge_ndiv(top), 6);

    arena.set_ndiv_j(face, 1, &mut diag);
    let stats = arena.generate_face_mesh(face, &mut mesh, &mut diag);
    assert_eq!(stats.elements_created, 6);
    assert_eq!(mesh.node_count(), 7 * 2);
    // the joint of the composite is a node of the grid
    let joint = arena.point_node(p[1]).unwrap();
    assert_eq!(arena.face_node_grid(face).unwrap()[(0, 0, 2)], Some(joint));
}

#[test]
fn odd_sided_faces_are_not_meshed() {
    let mut arena = BrepArena::new();
    let mut mesh = InMemoryMesh::new();
    let mut diag = Diagnostics::new();
    let p = points(&mut arena, &[[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]]);
    let ab = arena.add_line(p[0], p[1]).unwrap();
    let bc = arena.add_line(p[1], p[2]).unwrap();
    let ca = arena.add_line(p[2], p[0]).unwrap();
    let face = arena.add_face(&[ab, bc, ca]).unwrap();

    arena.set_ndiv_i(face, 3, &mut diag);
    assert!(diag.has(DiagnosticKind::OddSideCount));
    assert!([ab, bc, ca].iter().all(|&e| arena.edge_ndiv(e) == 3));

    arena.generate_face_mesh(face, &mut mesh, &mut diag);
    assert!(diag.has(DiagnosticKind::UnsupportedSideCount));
    assert_eq!(mesh.node_count(), 0);
    assert_eq!(arena.face(face).unwrap().state, FaceState::PointsSet);
}

#[test]
fn whole_model_generation_meshes_free_edges() {
    let mut arena = BrepArena::new();
    let mut mesh = InMemoryMesh::new();
    let mut diag = Diagnostics::new();
    let (p, _, _) = two_squares(&mut arena);
    let top = arena.add_point(Point3::new(1.0, 1.0, 3.0));
    let column = arena.add_line(p[4], top).unwrap();
    arena.set_division_count(column, 3, &mut diag);

    let stats = arena.generate_mesh(&mut mesh, &mut diag);
    assert_eq!(stats.elements_created, 2 * 16 + 3);
    assert_eq!(arena.edge_node_tags(column).first().copied(), arena.point_node(p[4]));
    assert!(arena.validate().is_empty());
}
