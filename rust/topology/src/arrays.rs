// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured 3-D arrays of mesh tags indexed by `(layer, row, col)`.
//!
//! Mesh generation allocates one array per entity: a single row for an edge,
//! a `(ndivJ + 1) x (ndivI + 1)` grid for a face. Arrays are never resized;
//! an empty (null) array means "not meshed yet".

use std::ops::{Index, IndexMut};

use nalgebra::Point3;

use crate::domain::{ElementTag, MeshDomain, NodeTag};

/// Dense row-major 3-D array.
#[derive(Debug, Clone, PartialEq)]
pub struct Array3d<T> {
    layers: usize,
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// Node tags produced for one entity.
pub type NodeArray3d = Array3d<Option<NodeTag>>;

/// Element tags produced for one entity.
pub type ElementArray3d = Array3d<Option<ElementTag>>;

impl<T> Default for Array3d<T> {
    fn default() -> Self {
        Self {
            layers: 0,
            rows: 0,
            cols: 0,
            data: Vec::new(),
        }
    }
}

impl<T: Clone> Array3d<T> {
    /// Allocates a `layers x rows x cols` array filled with `fill`.
    pub fn new(layers: usize, rows: usize, cols: usize, fill: T) -> Self {
        Self {
            layers,
            rows,
            cols,
            data: vec![fill; layers * rows * cols],
        }
    }
}

impl<T> Array3d<T> {
    /// Single-layer, single-row array holding `values`.
    pub fn from_row(values: Vec<T>) -> Self {
        Self {
            layers: 1,
            rows: 1,
            cols: values.len(),
            data: values,
        }
    }

    /// `(layers, rows, cols)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.layers, self.rows, self.cols)
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for the unallocated array.
    pub fn is_null(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, layer: usize, row: usize, col: usize) -> Option<usize> {
        (layer < self.layers && row < self.rows && col < self.cols)
            .then(|| (layer * self.rows + row) * self.cols + col)
    }

    pub fn get(&self, layer: usize, row: usize, col: usize) -> Option<&T> {
        self.offset(layer, row, col).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, layer: usize, row: usize, col: usize) -> Option<&mut T> {
        self.offset(layer, row, col).map(move |i| &mut self.data[i])
    }

    /// Contiguous view of one row.
    pub fn row(&self, layer: usize, row: usize) -> &[T] {
        assert!(layer < self.layers && row < self.rows, "row index out of range");
        let start = (layer * self.rows + row) * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Iterator down one column.
    pub fn column(&self, layer: usize, col: usize) -> impl Iterator<Item = &T> + '_ {
        assert!(layer < self.layers && col < self.cols, "column index out of range");
        (0..self.rows).map(move |r| &self[(layer, r, col)])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Iterator yielding `((layer, row, col), value)`.
    pub fn iter_indexed(&self) -> impl Iterator<Item = ((usize, usize, usize), &T)> {
        let (rows, cols) = (self.rows, self.cols);
        self.data.iter().enumerate().map(move |(i, v)| {
            let col = i % cols;
            let row = (i / cols) % rows;
            let layer = i / (cols * rows);
            ((layer, row, col), v)
        })
    }

    /// Applies `f` to every value, keeping the shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Array3d<U> {
        Array3d {
            layers: self.layers,
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T> Index<(usize, usize, usize)> for Array3d<T> {
    type Output = T;

    fn index(&self, (layer, row, col): (usize, usize, usize)) -> &T {
        let i = self
            .offset(layer, row, col)
            .unwrap_or_else(|| panic!("index ({layer}, {row}, {col}) out of range"));
        &self.data[i]
    }
}

impl<T> IndexMut<(usize, usize, usize)> for Array3d<T> {
    fn index_mut(&mut self, (layer, row, col): (usize, usize, usize)) -> &mut T {
        let i = self
            .offset(layer, row, col)
            .unwrap_or_else(|| panic!("index ({layer}, {row}, {col}) out of range"));
        &mut self.data[i]
    }
}

impl NodeArray3d {
    /// True when at least one node has been assigned.
    pub fn has_nodes(&self) -> bool {
        self.data.iter().any(Option::is_some)
    }

    /// Number of assigned nodes.
    pub fn node_count(&self) -> usize {
        self.data.iter().filter(|n| n.is_some()).count()
    }

    /// Assigned node tags in storage order.
    pub fn tags(&self) -> Vec<NodeTag> {
        self.data.iter().flatten().copied().collect()
    }

    /// Node of this array closest to `position`.
    pub fn nearest_node(
        &self,
        domain: &impl MeshDomain,
        position: &Point3<f64>,
    ) -> Option<NodeTag> {
        self.data
            .iter()
            .flatten()
            .filter_map(|&n| {
                domain
                    .node_position(n)
                    .map(|p| (n, (p - position).norm_squared()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(n, _)| n)
    }
}

impl ElementArray3d {
    /// Assigned element tags in storage order.
    pub fn tags(&self) -> Vec<ElementTag> {
        self.data.iter().flatten().copied().collect()
    }

    /// Number of assigned elements.
    pub fn element_count(&self) -> usize {
        self.data.iter().filter(|e| e.is_some()).count()
    }
}

/// Four-node cells of every layer, corners in CCW order
/// `(r, c) (r, c+1) (r+1, c+1) (r+1, c)`. Cells touching a missing node are
/// skipped.
pub fn quad4_connectivity(nodes: &NodeArray3d) -> Vec<[NodeTag; 4]> {
    let (layers, rows, cols) = nodes.dims();
    let mut cells = Vec::new();
    for l in 0..layers {
        for r in 0..rows.saturating_sub(1) {
            for c in 0..cols.saturating_sub(1) {
                let quad = [
                    nodes[(l, r, c)],
                    nodes[(l, r, c + 1)],
                    nodes[(l, r + 1, c + 1)],
                    nodes[(l, r + 1, c)],
                ];
                if let [Some(a), Some(b), Some(cc), Some(d)] = quad {
                    cells.push([a, b, cc, d]);
                }
            }
        }
    }
    cells
}

/// Nine-node cells over 2x2 blocks of the grid: 4 corners (CCW), 4 mid-side
/// nodes (CCW, starting on the bottom side) and the centre. Rows and columns
/// must give an even number of divisions; trailing odd strips are ignored.
pub fn quad9_connectivity(nodes: &NodeArray3d) -> Vec<[NodeTag; 9]> {
    let (layers, rows, cols) = nodes.dims();
    let mut cells = Vec::new();
    for l in 0..layers {
        for r in (0..rows.saturating_sub(2)).step_by(2) {
            for c in (0..cols.saturating_sub(2)).step_by(2) {
                let at = |dr: usize, dc: usize| nodes[(l, r + dr, c + dc)];
                let cell = [
                    at(0, 0),
                    at(0, 2),
                    at(2, 2),
                    at(2, 0),
                    at(0, 1),
                    at(1, 2),
                    at(2, 1),
                    at(1, 0),
                    at(1, 1),
                ];
                if cell.iter().all(Option::is_some) {
                    cells.push(cell.map(|n| n.unwrap_or(NodeTag(usize::MAX))));
                }
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize) -> NodeArray3d {
        let mut a = NodeArray3d::new(1, rows, cols, None);
        let mut next = 0;
        for r in 0..rows {
            for c in 0..cols {
                a[(0, r, c)] = Some(NodeTag(next));
                next += 1;
            }
        }
        a
    }

    #[test]
    fn default_is_null() {
        let a: NodeArray3d = Array3d::default();
        assert!(a.is_null());
        assert!(!a.has_nodes());
        assert_eq!(a.dims(), (0, 0, 0));
    }

    #[test]
    fn indexing_is_row_major() {
        let a = grid(2, 3);
        assert_eq!(a[(0, 1, 0)], Some(NodeTag(3)));
        assert_eq!(a.row(0, 1), &[Some(NodeTag(3)), Some(NodeTag(4)), Some(NodeTag(5))]);
        let col: Vec<_> = a.column(0, 2).copied().collect();
        assert_eq!(col, vec![Some(NodeTag(2)), Some(NodeTag(5))]);
        assert!(a.get(0, 2, 0).is_none());
    }

    #[test]
    #[should_panic]
    fn out_of_range_index_panics() {
        let a = grid(2, 2);
        let _ = a[(0, 5, 0)];
    }

    #[test]
    fn iter_indexed_reports_coordinates() {
        let a = grid(2, 2);
        let last = a.iter_indexed().last().unwrap();
        assert_eq!(last.0, (0, 1, 1));
        assert_eq!(*last.1, Some(NodeTag(3)));
    }

    #[test]
    fn quad4_cells_are_ccw() {
        let a = grid(3, 3);
        let cells = quad4_connectivity(&a);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], [NodeTag(0), NodeTag(1), NodeTag(4), NodeTag(3)]);
    }

    #[test]
    fn quad9_cells_cover_two_by_two_blocks() {
        let a = grid(5, 3);
        let cells = quad9_connectivity(&a);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0][0], NodeTag(0));
        assert_eq!(cells[0][2], NodeTag(8));
        assert_eq!(cells[0][8], NodeTag(4));
    }

    #[test]
    fn missing_nodes_skip_cells() {
        let mut a = grid(2, 3);
        a[(0, 0, 0)] = None;
        assert_eq!(quad4_connectivity(&a).len(), 1);
        assert_eq!(a.node_count(), 5);
    }
}
