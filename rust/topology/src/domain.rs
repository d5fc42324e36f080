// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The mesh domain: owner of the nodes and elements produced by meshing.
//!
//! Geometric entities never own mesh objects. They call into a
//! [`MeshDomain`] to create nodes and elements and keep only the returned
//! tags, which is enough to know whether they are already meshed and to
//! rebuild connectivity for their neighbours.

use nalgebra::Point3;
use smallvec::SmallVec;

use crate::kdtree::KdIndex;

/// Tag of a node created by a mesh domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeTag(pub usize);

/// Tag of an element created by a mesh domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementTag(pub usize);

impl std::fmt::Display for NodeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl std::fmt::Display for ElementTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Element shapes produced by the mesher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Two-node line element along an edge.
    Line2,
    /// Four-node quadrilateral, corners in CCW order.
    Quad4,
    /// Nine-node quadrilateral: 4 corners, 4 mid-sides, 1 centre.
    Quad9,
}

impl ElementKind {
    /// Number of nodes an element of this kind references.
    pub fn node_count(&self) -> usize {
        match self {
            ElementKind::Line2 => 2,
            ElementKind::Quad4 => 4,
            ElementKind::Quad9 => 9,
        }
    }
}

/// Collaborator that owns nodes and elements and allocates their tags.
pub trait MeshDomain {
    /// Creates a node at `position` and returns its tag.
    fn create_node(&mut self, position: Point3<f64>) -> NodeTag;

    /// Creates an element over `nodes` (ordered as `kind` expects).
    fn create_element(&mut self, kind: ElementKind, nodes: &[NodeTag]) -> ElementTag;

    /// Position of an existing node.
    fn node_position(&self, tag: NodeTag) -> Option<Point3<f64>>;
}

/// A node stored by [`InMemoryMesh`].
#[derive(Debug, Clone)]
pub struct Node {
    pub tag: NodeTag,
    pub position: Point3<f64>,
}

/// An element stored by [`InMemoryMesh`].
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: ElementTag,
    pub kind: ElementKind,
    pub nodes: SmallVec<[NodeTag; 9]>,
}

/// Simple vector-backed mesh domain.
///
/// Tags are dense indices starting at 0, so lookups are O(1).
#[derive(Debug, Default, Clone)]
pub struct InMemoryMesh {
    nodes: Vec<Node>,
    elements: Vec<Element>,
}

impl InMemoryMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, tag: NodeTag) -> Option<&Node> {
        self.nodes.get(tag.0)
    }

    pub fn element(&self, tag: ElementTag) -> Option<&Element> {
        self.elements.get(tag.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Average of the element's node positions.
    pub fn element_centroid(&self, tag: ElementTag) -> Option<Point3<f64>> {
        let element = self.element(tag)?;
        if element.nodes.is_empty() {
            return None;
        }
        let mut sum = nalgebra::Vector3::zeros();
        for &n in &element.nodes {
            sum += self.node(n)?.position.coords;
        }
        Some(Point3::from(sum / element.nodes.len() as f64))
    }

    /// Area of a quadrilateral element (half the cross product of its
    /// diagonals), or length of a line element.
    pub fn element_measure(&self, tag: ElementTag) -> Option<f64> {
        let element = self.element(tag)?;
        let p = |i: usize| self.node(element.nodes[i]).map(|n| n.position);
        match element.kind {
            ElementKind::Line2 => Some((p(1)? - p(0)?).norm()),
            ElementKind::Quad4 | ElementKind::Quad9 => {
                Some(quad_area(&p(0)?, &p(1)?, &p(2)?, &p(3)?))
            }
        }
    }

    /// KD index over every node position.
    pub fn node_index(&self, rebalance_threshold: usize) -> KdIndex<NodeTag> {
        let mut index = KdIndex::new(rebalance_threshold);
        for node in &self.nodes {
            index.insert(node.tag, node.position);
        }
        index
    }

    /// KD index over element centroids.
    pub fn element_index(&self, rebalance_threshold: usize) -> KdIndex<ElementTag> {
        let mut index = KdIndex::new(rebalance_threshold);
        for element in &self.elements {
            if let Some(c) = self.element_centroid(element.tag) {
                index.insert(element.tag, c);
            }
        }
        index
    }
}

impl MeshDomain for InMemoryMesh {
    fn create_node(&mut self, position: Point3<f64>) -> NodeTag {
        let tag = NodeTag(self.nodes.len());
        self.nodes.push(Node { tag, position });
        tag
    }

    fn create_element(&mut self, kind: ElementKind, nodes: &[NodeTag]) -> ElementTag {
        debug_assert_eq!(nodes.len(), kind.node_count());
        let tag = ElementTag(self.elements.len());
        self.elements.push(Element {
            tag,
            kind,
            nodes: SmallVec::from_slice(nodes),
        });
        tag
    }

    fn node_position(&self, tag: NodeTag) -> Option<Point3<f64>> {
        self.node(tag).map(|n| n.position)
    }
}

/// Area of a (possibly warped) quadrilateral given in CCW order.
pub fn quad_area(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> f64 {
    let d1 = p2 - p0;
    let d2 = p3 - p1;
    d1.cross(&d2).norm() / 2.0
}
