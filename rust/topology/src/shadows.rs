// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-interval ("shadow") index over bounding boxes.
//!
//! Each entity casts its box onto the x, y and z axes. Every axis keeps an
//! interval map: the axis is cut at the ends of all stored intervals and
//! each piece records the entities whose shadow covers it. A box query
//! collects the covering entities per axis and intersects the three sets,
//! which is exact for boxes and needs no tree.
//!
//! Stored boxes are dilated by a small margin, so a zero-width shadow (a
//! point, or an axis-aligned edge) still covers one piece of the axis.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::ops::Bound;

use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::geometry::BoundingBox;

type Coord = OrderedFloat<f64>;

/// Interval map along one axis.
///
/// A key `s` maps to the entities covering `[s, next key)`. The last piece
/// is always empty.
#[derive(Debug, Clone)]
pub struct AxisShadow<T> {
    pieces: BTreeMap<Coord, FxHashSet<T>>,
}

impl<T> Default for AxisShadow<T> {
    fn default() -> Self {
        Self {
            pieces: BTreeMap::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> AxisShadow<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pieces the axis is cut into.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Records `item` over `[lo, hi)`.
    pub fn add(&mut self, item: T, lo: f64, hi: f64) {
        let (lo, hi) = (OrderedFloat(lo), OrderedFloat(hi));
        if lo >= hi {
            return;
        }
        self.split_at(lo);
        self.split_at(hi);
        for (_, set) in self.pieces.range_mut(lo..hi) {
            set.insert(item);
        }
    }

    /// Clears `item` from `[lo, hi)` and merges pieces that became equal.
    pub fn remove(&mut self, item: T, lo: f64, hi: f64) {
        let (lo, hi) = (OrderedFloat(lo), OrderedFloat(hi));
        if lo >= hi {
            return;
        }
        for (_, set) in self.pieces.range_mut(lo..hi) {
            set.remove(&item);
        }
        self.merge_range(lo, hi);
    }

    /// Entities whose shadow meets the closed interval `[lo, hi]`.
    pub fn covering(&self, lo: f64, hi: f64) -> FxHashSet<T> {
        let (lo, hi) = (OrderedFloat(lo), OrderedFloat(hi));
        let mut out = FxHashSet::default();
        if lo > hi {
            return out;
        }
        if let Some((_, set)) = self.pieces.range(..=lo).next_back() {
            out.extend(set.iter().copied());
        }
        for (_, set) in self.pieces.range((Bound::Excluded(lo), Bound::Included(hi))) {
            out.extend(set.iter().copied());
        }
        out
    }

    /// Cuts the piece containing `at` in two.
    fn split_at(&mut self, at: Coord) {
        if self.pieces.contains_key(&at) {
            return;
        }
        let inherited = self
            .pieces
            .range(..at)
            .next_back()
            .map(|(_, set)| set.clone())
            .unwrap_or_default();
        self.pieces.insert(at, inherited);
    }

    /// Drops cut points in `[lo, hi]` that no longer separate different sets.
    fn merge_range(&mut self, lo: Coord, hi: Coord) {
        let cuts: Vec<Coord> = self.pieces.range(lo..=hi).map(|(k, _)| *k).collect();
        for cut in cuts {
            let redundant = {
                let here = &self.pieces[&cut];
                match self.pieces.range(..cut).next_back() {
                    Some((_, before)) => before == here,
                    None => here.is_empty(),
                }
            };
            if redundant {
                self.pieces.remove(&cut);
            }
        }
    }
}

/// Shadows of a set of entities on the three axes.
#[derive(Debug, Clone)]
pub struct EntityShadows<T> {
    axes: [AxisShadow<T>; 3],
    boxes: FxHashMap<T, BoundingBox>,
    margin: f64,
}

impl<T: Copy + Eq + Hash> EntityShadows<T> {
    /// Empty index dilating every stored box by `margin`.
    pub fn new(margin: f64) -> Self {
        Self {
            axes: [AxisShadow::new(), AxisShadow::new(), AxisShadow::new()],
            boxes: FxHashMap::default(),
            margin: margin.abs().max(f64::EPSILON),
        }
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn contains(&self, item: T) -> bool {
        self.boxes.contains_key(&item)
    }

    /// Dilated box stored for `item`.
    pub fn bounding_box(&self, item: T) -> Option<&BoundingBox> {
        self.boxes.get(&item)
    }

    /// Adds `item` with its box, replacing any previous box.
    pub fn add(&mut self, item: T, bbox: &BoundingBox) {
        self.remove(item);
        let stored = bbox.dilated(self.margin);
        for (axis, shadow) in self.axes.iter_mut().enumerate() {
            let (lo, hi) = stored.interval(axis);
            shadow.add(item, lo, hi);
        }
        self.boxes.insert(item, stored);
    }

    /// Removes `item`; returns false if it was not indexed.
    pub fn remove(&mut self, item: T) -> bool {
        let Some(stored) = self.boxes.remove(&item) else {
            return false;
        };
        for (axis, shadow) in self.axes.iter_mut().enumerate() {
            let (lo, hi) = stored.interval(axis);
            shadow.remove(item, lo, hi);
        }
        true
    }

    /// Entities whose stored box overlaps `bbox`.
    pub fn neighbors(&self, bbox: &BoundingBox) -> FxHashSet<T> {
        let mut per_axis: Vec<FxHashSet<T>> = (0..3)
            .map(|axis| {
                let (lo, hi) = bbox.interval(axis);
                self.axes[axis].covering(lo, hi)
            })
            .collect();
        per_axis.sort_by_key(|s| s.len());
        let mut sets = per_axis.into_iter();
        let Some(mut result) = sets.next() else {
            return FxHashSet::default();
        };
        for other in sets {
            result.retain(|item| other.contains(item));
        }
        result
    }

    pub fn clear(&mut self) {
        for shadow in &mut self.axes {
            *shadow = AxisShadow::new();
        }
        self.boxes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn bbox(min: [f64; 3], max: [f64; 3]) -> BoundingBox {
        BoundingBox::new(Point3::from(min), Point3::from(max))
    }

    #[test]
    fn axis_pieces_split_and_merge() {
        let mut axis = AxisShadow::new();
        axis.add(1u32, 0.0, 2.0);
        axis.add(2u32, 1.0, 3.0);
        assert_eq!(axis.piece_count(), 4);
        assert_eq!(axis.covering(0.5, 0.5).len(), 1);
        assert_eq!(axis.covering(1.5, 1.5).len(), 2);
        assert!(axis.covering(3.5, 4.0).is_empty());

        axis.remove(2, 1.0, 3.0);
        assert_eq!(axis.piece_count(), 2);
        assert!(axis.covering(2.5, 2.5).is_empty());
        axis.remove(1, 0.0, 2.0);
        assert!(axis.is_empty());
    }

    #[test]
    fn neighbors_intersect_all_axes() {
        let mut shadows = EntityShadows::new(1e-6);
        shadows.add('a', &bbox([0.0, 0.0, 0.0], [1.0, 1.0, 0.0]));
        shadows.add('b', &bbox([2.0, 0.0, 0.0], [3.0, 1.0, 0.0]));
        // overlaps 'a' on x and 'b' on y only
        shadows.add('c', &bbox([0.0, 5.0, 0.0], [1.0, 6.0, 0.0]));

        let found = shadows.neighbors(&bbox([0.5, 0.5, -1.0], [2.5, 0.6, 1.0]));
        assert!(found.contains(&'a') && found.contains(&'b'));
        assert!(!found.contains(&'c'));
    }

    #[test]
    fn zero_width_boxes_are_found_and_removed() {
        let mut shadows = EntityShadows::new(1e-6);
        let point = BoundingBox::from_point(Point3::new(1.0, 2.0, 3.0));
        shadows.add(7u8, &point);
        assert!(shadows.neighbors(&point).contains(&7));

        assert!(shadows.remove(7));
        assert!(!shadows.remove(7));
        assert!(shadows.neighbors(&point).is_empty());
        assert!(shadows.axes.iter().all(|a| a.is_empty()));
    }

    #[test]
    fn margin_is_applied_when_adding() {
        let mut shadows = EntityShadows::new(0.1);
        shadows.add(3u8, &bbox([0.0; 3], [1.0; 3]));
        let stored = shadows.bounding_box(3).unwrap();
        assert_eq!(stored.min, Point3::new(-0.1, -0.1, -0.1));
        assert_eq!(stored.max, Point3::new(1.1, 1.1, 1.1));

        // a gap smaller than the margin still counts as neighbouring
        assert!(shadows.neighbors(&bbox([1.05, 0.5, 0.5], [2.0, 0.6, 0.6])).contains(&3));
        assert!(shadows.neighbors(&bbox([1.2, 0.5, 0.5], [2.0, 0.6, 0.6])).is_empty());
    }

    #[test]
    fn re_adding_replaces_the_box() {
        let mut shadows = EntityShadows::new(1e-6);
        shadows.add(1u8, &bbox([0.0; 3], [1.0; 3]));
        shadows.add(1u8, &bbox([10.0; 3], [11.0; 3]));
        assert_eq!(shadows.len(), 1);
        assert!(shadows.neighbors(&bbox([0.0; 3], [1.0; 3])).is_empty());
        assert!(shadows.neighbors(&bbox([10.5; 3], [10.5; 3])).contains(&1));
    }
}
