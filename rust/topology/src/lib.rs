// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # B-rep Mesh Topology
//!
//! Boundary-representation topology and structured mesh generation for
//! finite-element models.
//!
//! Points, edges (segments, arcs, segmented lines and composite chains) and
//! quadrilateral faces live in slot maps inside a [`BrepArena`], with
//! upward adjacency maps (point → edges, edge → faces, edge → composites)
//! maintained by every mutation. Meshing is structured: each edge is split
//! into `ndiv` pieces, opposite sides of a face are reconciled to the same
//! count, and face interiors are filled by transfinite interpolation of the
//! boundary nodes. Nodes and elements belong to an external [`MeshDomain`];
//! entities only keep their tags.
//!
//! ```
//! use brepmesh_topology::{BrepArena, Diagnostics, InMemoryMesh};
//! use nalgebra::Point3;
//!
//! let mut arena = BrepArena::new();
//! let pts: Vec<_> = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
//!     .iter()
//!     .map(|c| arena.add_point(Point3::new(c[0], c[1], 0.0)))
//!     .collect();
//! let face = arena.add_quad_surface(&pts).unwrap();
//!
//! let mut diag = Diagnostics::new();
//! arena.set_ndiv_i(face, 2, &mut diag);
//! arena.set_ndiv_j(face, 2, &mut diag);
//!
//! let mut mesh = InMemoryMesh::new();
//! arena.generate_face_mesh(face, &mut mesh, &mut diag);
//! assert_eq!(mesh.node_count(), 9);
//! assert_eq!(mesh.element_count(), 4);
//! ```

pub mod arena;
pub mod arrays;
pub mod builders;
pub mod composite;
pub mod config;
pub mod construction;
pub mod containers;
pub mod diagnostics;
pub mod divisions;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod kdtree;
pub mod keys;
pub mod meshing;
pub mod query;
pub mod shadows;
pub mod transfinite;
pub mod transform;
pub mod traversal;
pub mod validate;

pub use arena::{
    BrepArena, CompositeEdge, EdgeData, EdgeGeometry, ElementOrder, FaceData, FaceState, PointData,
    Side,
};
pub use arrays::{quad4_connectivity, quad9_connectivity, Array3d, ElementArray3d, NodeArray3d};
pub use config::MeshingConfig;
pub use containers::{EdgeSet, EntitySet, FaceSet, PointSet, SetMember};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use divisions::{distribute_divisions, divisions_for_size};
pub use domain::{ElementKind, ElementTag, InMemoryMesh, MeshDomain, NodeTag};
pub use error::{Error, Result};
pub use geometry::{ArcGeometry, BoundingBox};
pub use kdtree::{KdIndex, KdItem};
pub use keys::{EdgeKey, EntityKey, EntityType, FaceKey, PointKey};
pub use meshing::MeshStats;
pub use shadows::{AxisShadow, EntityShadows};
pub use validate::{IssueKind, ValidationIssue};
