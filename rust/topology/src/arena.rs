// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for B-rep entities and their mesh bookkeeping.
//!
//! The [`BrepArena`] is the single owner of every point, edge and face. All
//! entities live in slot maps with stable, generational keys, and the
//! upward relations (point → edges, edge → faces, edge → composite edges)
//! are kept in adjacency maps next to them. Those maps are only written by
//! the arena's own construction and removal methods, so a back-reference can
//! never outlive the entity it points at.
//!
//! Mesh objects are not stored here: entities keep the node and element tags
//! handed out by a [`MeshDomain`](crate::domain::MeshDomain), which is enough
//! to answer "is this already meshed?" and to stitch neighbours together.

use std::collections::VecDeque;

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::arrays::{ElementArray3d, NodeArray3d};
use crate::config::MeshingConfig;
use crate::domain::NodeTag;
use crate::keys::*;

/// Data stored for a point: a position plus the node created on it.
#[derive(Debug, Clone)]
pub struct PointData {
    pub tag: usize,
    pub name: String,
    pub position: Point3<f64>,
    /// Node created by meshing, if any.
    pub node: Option<NodeTag>,
}

/// One entry of an oriented edge chain.
///
/// `forward` means the chain walks the edge from its first to its last
/// vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Side {
    pub edge: EdgeKey,
    pub forward: bool,
}

impl Side {
    pub fn new(edge: EdgeKey, forward: bool) -> Self {
        Self { edge, forward }
    }

    /// The same edge walked the other way.
    pub fn flipped(self) -> Self {
        Self {
            edge: self.edge,
            forward: !self.forward,
        }
    }
}

/// A chain of edges treated as one boundary curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeEdge {
    pub sides: VecDeque<Side>,
}

/// Edge variants.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeGeometry {
    /// Straight segment between two points.
    Segment { start: PointKey, end: PointKey },
    /// Circular arc from `start` to `end` passing through `mid`.
    Arc {
        start: PointKey,
        mid: PointKey,
        end: PointKey,
    },
    /// Straight segment split into explicitly sized pieces.
    SegmentedLine {
        start: PointKey,
        end: PointKey,
        lengths: Vec<f64>,
    },
    /// Ordered chain of sub-edges.
    Composite(CompositeEdge),
}

impl EdgeGeometry {
    /// Points stored directly by this edge, in vertex order. Empty for
    /// composites, whose vertices come from their sub-edges.
    pub fn direct_points(&self) -> SmallVec<[PointKey; 3]> {
        match self {
            EdgeGeometry::Segment { start, end } => SmallVec::from_slice(&[*start, *end]),
            EdgeGeometry::Arc { start, mid, end } => SmallVec::from_slice(&[*start, *mid, *end]),
            EdgeGeometry::SegmentedLine { start, end, .. } => SmallVec::from_slice(&[*start, *end]),
            EdgeGeometry::Composite(_) => SmallVec::new(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, EdgeGeometry::Composite(_))
    }

    /// Short variant name used in logs and exports.
    pub fn kind_str(&self) -> &'static str {
        match self {
            EdgeGeometry::Segment { .. } => "segment",
            EdgeGeometry::Arc { .. } => "arc",
            EdgeGeometry::SegmentedLine { .. } => "segmented_line",
            EdgeGeometry::Composite(_) => "composite",
        }
    }
}

/// Data stored for an edge.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub tag: usize,
    pub name: String,
    pub geometry: EdgeGeometry,
    /// Number of mesh segments along the edge.
    pub ndiv: usize,
    /// `true` once a division count was requested explicitly.
    pub ndiv_set: bool,
    pub nodes: NodeArray3d,
    pub elements: ElementArray3d,
}

impl EdgeData {
    pub fn has_nodes(&self) -> bool {
        self.nodes.has_nodes()
    }
}

/// Meshing progress of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FaceState {
    Undefined,
    PointsSet,
    BoundaryMeshed,
    SurfaceMeshed,
}

/// Interpolation order of the quadrilaterals generated on a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementOrder {
    /// Four-node quads.
    #[default]
    Linear,
    /// Nine-node quads; needs even division counts.
    Quadratic,
}

/// Data stored for a face: a closed loop of oriented sides.
#[derive(Debug, Clone)]
pub struct FaceData {
    pub tag: usize,
    pub name: String,
    pub sides: VecDeque<Side>,
    pub state: FaceState,
    pub element_order: ElementOrder,
    pub nodes: NodeArray3d,
    pub elements: ElementArray3d,
}

impl FaceData {
    pub fn side_count(&self) -> usize {
        self.sides.len()
    }

    pub fn has_nodes(&self) -> bool {
        self.nodes.has_nodes()
    }
}

/// The arena that owns all B-rep entities and their adjacency indices.
///
/// # Example
///
/// ```
/// use brepmesh_topology::BrepArena;
/// use nalgebra::Point3;
///
/// let mut arena = BrepArena::new();
/// let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
/// let b = arena.add_point(Point3::new(1.0, 0.0, 0.0));
/// let line = arena.add_line(a, b).unwrap();
///
/// assert_eq!(arena.edge_count(), 1);
/// assert!(arena.incident_edges(a).contains(&line));
/// ```
#[derive(Debug)]
pub struct BrepArena {
    // Entity storage
    pub(crate) points: SlotMap<PointKey, PointData>,
    pub(crate) edges: SlotMap<EdgeKey, EdgeData>,
    pub(crate) faces: SlotMap<FaceKey, FaceData>,

    // Upward adjacency: child → parents
    pub(crate) point_to_edges: FxHashMap<PointKey, FxHashSet<EdgeKey>>,
    pub(crate) edge_to_faces: FxHashMap<EdgeKey, FxHashSet<FaceKey>>,
    pub(crate) edge_to_composites: FxHashMap<EdgeKey, FxHashSet<EdgeKey>>,

    // Identity
    pub(crate) names: FxHashMap<String, EntityKey>,
    next_point_tag: usize,
    next_edge_tag: usize,
    next_face_tag: usize,

    pub(crate) config: MeshingConfig,
}

impl BrepArena {
    /// Creates an empty arena with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MeshingConfig::default())
    }

    /// Creates an empty arena with the given configuration.
    pub fn with_config(config: MeshingConfig) -> Self {
        Self {
            points: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            faces: SlotMap::with_key(),

            point_to_edges: FxHashMap::default(),
            edge_to_faces: FxHashMap::default(),
            edge_to_composites: FxHashMap::default(),

            names: FxHashMap::default(),
            next_point_tag: 1,
            next_edge_tag: 1,
            next_face_tag: 1,

            config,
        }
    }

    pub fn config(&self) -> &MeshingConfig {
        &self.config
    }

    // --- Counts ---

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    // --- Entity access ---

    pub fn point(&self, key: PointKey) -> Option<&PointData> {
        self.points.get(key)
    }

    pub fn edge(&self, key: EdgeKey) -> Option<&EdgeData> {
        self.edges.get(key)
    }

    pub fn face(&self, key: FaceKey) -> Option<&FaceData> {
        self.faces.get(key)
    }

    /// Iterates over all points.
    pub fn points(&self) -> impl Iterator<Item = (PointKey, &PointData)> {
        self.points.iter()
    }

    /// Iterates over all edges.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &EdgeData)> {
        self.edges.iter()
    }

    /// Iterates over all faces.
    pub fn faces(&self) -> impl Iterator<Item = (FaceKey, &FaceData)> {
        self.faces.iter()
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        match key {
            EntityKey::Point(k) => self.points.contains_key(k),
            EntityKey::Edge(k) => self.edges.contains_key(k),
            EntityKey::Face(k) => self.faces.contains_key(k),
        }
    }

    pub fn point_position(&self, key: PointKey) -> Option<Point3<f64>> {
        self.points.get(key).map(|p| p.position)
    }

    /// Squared distance from a point to `position`.
    pub fn distance_squared_to(&self, key: PointKey, position: &Point3<f64>) -> Option<f64> {
        self.points
            .get(key)
            .map(|p| (p.position - position).norm_squared())
    }

    /// Tag of any entity.
    pub fn tag_of(&self, key: EntityKey) -> Option<usize> {
        match key {
            EntityKey::Point(k) => self.points.get(k).map(|d| d.tag),
            EntityKey::Edge(k) => self.edges.get(k).map(|d| d.tag),
            EntityKey::Face(k) => self.faces.get(k).map(|d| d.tag),
        }
    }

    /// Name of any entity.
    pub fn name_of(&self, key: EntityKey) -> Option<&str> {
        match key {
            EntityKey::Point(k) => self.points.get(k).map(|d| d.name.as_str()),
            EntityKey::Edge(k) => self.edges.get(k).map(|d| d.name.as_str()),
            EntityKey::Face(k) => self.faces.get(k).map(|d| d.name.as_str()),
        }
    }

    /// Node created on a point, if it has been meshed.
    pub fn point_node(&self, key: PointKey) -> Option<NodeTag> {
        self.points.get(key).and_then(|p| p.node)
    }

    // --- Tag and name allocation ---

    /// Next tag for `ty` and its default name. Skips names taken by renames.
    pub(crate) fn allocate_identity(&mut self, ty: EntityType) -> (usize, String) {
        loop {
            let counter = match ty {
                EntityType::Point => &mut self.next_point_tag,
                EntityType::Edge => &mut self.next_edge_tag,
                EntityType::Face => &mut self.next_face_tag,
            };
            let tag = *counter;
            *counter += 1;
            let name = format!("{}{}", ty.name_prefix(), tag);
            if !self.names.contains_key(&name) {
                return (tag, name);
            }
        }
    }

    // --- Internal adjacency helpers ---

    pub(crate) fn link_point_edge(&mut self, p: PointKey, e: EdgeKey) {
        self.point_to_edges.entry(p).or_default().insert(e);
    }

    pub(crate) fn unlink_point_edge(&mut self, p: PointKey, e: EdgeKey) {
        if let Some(set) = self.point_to_edges.get_mut(&p) {
            set.remove(&e);
        }
    }

    pub(crate) fn link_edge_face(&mut self, e: EdgeKey, f: FaceKey) {
        self.edge_to_faces.entry(e).or_default().insert(f);
    }

    pub(crate) fn unlink_edge_face(&mut self, e: EdgeKey, f: FaceKey) {
        if let Some(set) = self.edge_to_faces.get_mut(&e) {
            set.remove(&f);
        }
    }

    pub(crate) fn link_edge_composite(&mut self, sub: EdgeKey, composite: EdgeKey) {
        self.edge_to_composites.entry(sub).or_default().insert(composite);
    }

    pub(crate) fn unlink_edge_composite(&mut self, sub: EdgeKey, composite: EdgeKey) {
        if let Some(set) = self.edge_to_composites.get_mut(&sub) {
            set.remove(&composite);
        }
    }
}

impl Default for BrepArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_arena_is_empty() {
        let arena = BrepArena::new();
        assert_eq!(arena.point_count(), 0);
        assert_eq!(arena.edge_count(), 0);
        assert_eq!(arena.face_count(), 0);
        assert_eq!(arena.config().default_ndiv, 4);
    }

    #[test]
    fn identities_are_sequential_per_type() {
        let mut arena = BrepArena::new();
        assert_eq!(arena.allocate_identity(EntityType::Point), (1, "p1".to_string()));
        assert_eq!(arena.allocate_identity(EntityType::Point), (2, "p2".to_string()));
        assert_eq!(arena.allocate_identity(EntityType::Edge), (1, "l1".to_string()));
        assert_eq!(arena.allocate_identity(EntityType::Face), (1, "s1".to_string()));
    }

    #[test]
    fn side_flip_round_trips() {
        let mut edges: SlotMap<EdgeKey, ()> = SlotMap::with_key();
        let e = edges.insert(());
        let side = Side::new(e, true);
        assert!(!side.flipped().forward);
        assert_eq!(side.flipped().flipped(), side);
    }

    #[test]
    fn direct_points_by_variant() {
        let mut points: SlotMap<PointKey, ()> = SlotMap::with_key();
        let (a, b, c) = (points.insert(()), points.insert(()), points.insert(()));
        let arc = EdgeGeometry::Arc {
            start: a,
            mid: b,
            end: c,
        };
        assert_eq!(arc.direct_points().as_slice(), &[a, b, c]);
        assert!(EdgeGeometry::Composite(CompositeEdge::default())
            .direct_points()
            .is_empty());
        assert_eq!(arc.kind_str(), "arc");
    }
}
