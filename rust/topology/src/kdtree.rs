// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! KD-tree index for nearest-entity queries over points, nodes and elements.
//!
//! Erasures are lazy: the tree drops the entry immediately but its node
//! layout degrades with churn. After `rebalance_threshold` erasures the tree
//! is rebuilt from the live entries, which bounds the amortized query cost.
//!
//! A kiddo bucket cannot split when more than its capacity of entries share
//! one coordinate on the split axis, which planar meshes hit at once. The
//! tree therefore stores positions in a fixed rotated frame where
//! axis-aligned planes and lattices no longer share split values, and items
//! at the exact same position share a single tree entry. Distances are
//! rotation invariant; results are settled on the unrotated coordinates.

use std::hash::Hash;

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Point3, Rotation3, Vector3};
use rustc_hash::FxHashMap;
use slotmap::{Key, KeyData};
use smallvec::SmallVec;

use crate::arena::BrepArena;
use crate::domain::{ElementTag, NodeTag};
use crate::keys::PointKey;

/// Euler angles of the storage frame. Any generic triple works.
const FRAME_ANGLES: (f64, f64, f64) = (0.5236, 0.7193, 1.1371);

/// Items that can be stored in a [`KdIndex`].
///
/// The tree stores plain `u64` payloads; implementors convert to and from it.
pub trait KdItem: Copy + Eq + Hash {
    fn to_id(self) -> u64;
    fn from_id(id: u64) -> Self;
}

impl KdItem for PointKey {
    fn to_id(self) -> u64 {
        self.data().as_ffi()
    }

    fn from_id(id: u64) -> Self {
        KeyData::from_ffi(id).into()
    }
}

impl KdItem for NodeTag {
    fn to_id(self) -> u64 {
        self.0 as u64
    }

    fn from_id(id: u64) -> Self {
        NodeTag(id as usize)
    }
}

impl KdItem for ElementTag {
    fn to_id(self) -> u64 {
        self.0 as u64
    }

    fn from_id(id: u64) -> Self {
        ElementTag(id as usize)
    }
}

/// Items sharing one exact position. The first item is the tree payload.
#[derive(Debug)]
struct Site<T> {
    coords: [f64; 3],
    items: SmallVec<[T; 1]>,
}

/// Bit pattern of a position, with `-0.0` folded into `0.0`.
fn site_key(coords: &[f64; 3]) -> [u64; 3] {
    coords.map(|c| (c + 0.0).to_bits())
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

/// Nearest-neighbour index with lazy rebalancing.
#[derive(Debug)]
pub struct KdIndex<T: KdItem> {
    tree: KdTree<f64, 3>,
    frame: Rotation3<f64>,
    sites: FxHashMap<[u64; 3], Site<T>>,
    positions: FxHashMap<T, [f64; 3]>,
    pending_erasures: usize,
    rebalance_threshold: usize,
}

impl<T: KdItem> KdIndex<T> {
    /// Creates an empty index that rebuilds itself every
    /// `rebalance_threshold` erasures (a threshold of 0 is treated as 1).
    pub fn new(rebalance_threshold: usize) -> Self {
        let (roll, pitch, yaw) = FRAME_ANGLES;
        Self {
            tree: KdTree::new(),
            frame: Rotation3::from_euler_angles(roll, pitch, yaw),
            sites: FxHashMap::default(),
            positions: FxHashMap::default(),
            pending_erasures: 0,
            rebalance_threshold: rebalance_threshold.max(1),
        }
    }

    fn rotated(&self, coords: &[f64; 3]) -> [f64; 3] {
        let v = self.frame * Vector3::from(*coords);
        [v.x, v.y, v.z]
    }

    /// Bound on the rounding the rotation adds to distances near `query`.
    fn slack(query: &[f64; 3], radius: f64) -> f64 {
        let scale = query.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        64.0 * f64::EPSILON * (scale + radius.abs() + 1.0)
    }

    /// Inserts `item` at `position`. Re-inserting an item moves it.
    pub fn insert(&mut self, item: T, position: Point3<f64>) {
        self.detach(item);
        let coords = [position.x, position.y, position.z];
        let rotated = self.rotated(&coords);
        self.positions.insert(item, coords);
        let site = self.sites.entry(site_key(&coords)).or_insert_with(|| Site {
            coords,
            items: SmallVec::new(),
        });
        if site.items.is_empty() {
            self.tree.add(&rotated, item.to_id());
        }
        site.items.push(item);
    }

    /// Unlinks `item` from its site and the tree, keeping the site's tree
    /// entry pointed at a live item.
    fn detach(&mut self, item: T) -> Option<[f64; 3]> {
        let coords = self.positions.remove(&item)?;
        let key = site_key(&coords);
        let rotated = self.rotated(&coords);
        if let Some(site) = self.sites.get_mut(&key) {
            let was_anchor = site.items.first() == Some(&item);
            site.items.retain(|i| *i != item);
            match site.items.first() {
                None => {
                    self.sites.remove(&key);
                    self.tree.remove(&rotated, item.to_id());
                }
                Some(&next) if was_anchor => {
                    self.tree.remove(&rotated, item.to_id());
                    self.tree.add(&rotated, next.to_id());
                }
                Some(_) => {}
            }
        }
        Some(coords)
    }

    /// Removes `item`. Returns `false` if it was not indexed.
    pub fn erase(&mut self, item: T) -> bool {
        if self.detach(item).is_none() {
            return false;
        }
        self.pending_erasures += 1;
        if self.pending_erasures >= self.rebalance_threshold {
            self.optimise();
        }
        true
    }

    /// Rebuilds the tree from the live entries.
    pub fn optimise(&mut self) {
        let mut tree: KdTree<f64, 3> = KdTree::new();
        for site in self.sites.values() {
            if let Some(anchor) = site.items.first() {
                tree.add(&self.rotated(&site.coords), anchor.to_id());
            }
        }
        self.tree = tree;
        self.pending_erasures = 0;
        tracing::debug!(
            entries = self.positions.len(),
            sites = self.sites.len(),
            "rebalanced kd index"
        );
    }

    /// Nearest item and its distance, or `None` when the index is empty.
    pub fn nearest(&self, position: &Point3<f64>) -> Option<(T, f64)> {
        if self.sites.is_empty() {
            return None;
        }
        let query = [position.x, position.y, position.z];
        let hit = self
            .tree
            .nearest_one::<SquaredEuclidean>(&self.rotated(&query));
        let coords = self.positions.get(&T::from_id(hit.item))?;
        // the rotation can reorder near-ties; settle them on true distances
        self.within(position, distance(coords, &query)).into_iter().next()
    }

    /// Nearest item no farther than `radius`.
    pub fn nearest_within(&self, position: &Point3<f64>, radius: f64) -> Option<(T, f64)> {
        self.nearest(position).filter(|&(_, d)| d <= radius)
    }

    /// All items within `radius`, closest first. Items at the same position
    /// keep their insertion order.
    pub fn within(&self, position: &Point3<f64>, radius: f64) -> Vec<(T, f64)> {
        if self.sites.is_empty() {
            return Vec::new();
        }
        let query = [position.x, position.y, position.z];
        let reach = radius + Self::slack(&query, radius);
        let mut found = Vec::new();
        for hit in self
            .tree
            .within::<SquaredEuclidean>(&self.rotated(&query), reach * reach)
        {
            let Some(coords) = self.positions.get(&T::from_id(hit.item)) else {
                continue;
            };
            let d = distance(coords, &query);
            if d > radius {
                continue;
            }
            if let Some(site) = self.sites.get(&site_key(coords)) {
                found.extend(site.items.iter().map(|&item| (item, d)));
            }
        }
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }

    pub fn contains(&self, item: T) -> bool {
        self.positions.contains_key(&item)
    }

    /// Indexed position of `item`.
    pub fn position(&self, item: T) -> Option<Point3<f64>> {
        self.positions
            .get(&item)
            .map(|c| Point3::new(c[0], c[1], c[2]))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Erasures since the last rebuild.
    pub fn pending_erasures(&self) -> usize {
        self.pending_erasures
    }

    pub fn rebalance_threshold(&self) -> usize {
        self.rebalance_threshold
    }
}

impl BrepArena {
    /// Builds a KD index over every point, using the arena's rebalance
    /// threshold.
    pub fn point_index(&self) -> KdIndex<PointKey> {
        let mut index = KdIndex::new(self.config.rebalance_threshold);
        for (key, data) in self.points.iter() {
            index.insert(key, data.position);
        }
        index
    }

    /// Returns an existing point within `tolerance` of `position`, or creates
    /// a new one and registers it in `index`.
    pub fn find_or_add_point(
        &mut self,
        index: &mut KdIndex<PointKey>,
        position: Point3<f64>,
        tolerance: f64,
    ) -> PointKey {
        // stale entries of removed points are dropped until a live hit or none
        while let Some((existing, _)) = index.nearest_within(&position, tolerance) {
            if self.points.contains_key(existing) {
                return existing;
            }
            index.erase(existing);
        }

        let key = self.add_point(position);
        index.insert(key, position);
        key
    }

    /// Nearest point to `position` by linear scan.
    pub fn nearest_point(&self, position: &Point3<f64>) -> Option<PointKey> {
        self.points
            .iter()
            .map(|(k, p)| (k, (p.position - position).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k)
    }
}
