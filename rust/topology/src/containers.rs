// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ordered entity collections with set algebra and spatial selection.
//!
//! An [`EntitySet`] keeps insertion order and rejects duplicates. Spatial
//! queries scan the members unless [`EntitySet::index_shadows`] has built
//! an axis-interval index. The index follows removals; members inserted
//! later without an arena are scanned alongside it until they are indexed.

use std::hash::Hash;
use std::ops::{BitAnd, BitOr, Sub};

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::arena::BrepArena;
use crate::diagnostics::Diagnostics;
use crate::domain::MeshDomain;
use crate::geometry::BoundingBox;
use crate::keys::*;
use crate::meshing::MeshStats;
use crate::shadows::EntityShadows;

/// Key types that can be collected in an [`EntitySet`].
pub trait SetMember: Copy + Eq + Hash + Into<EntityKey> {
    /// Distance from `position` to the entity's geometry.
    fn distance_to(self, arena: &BrepArena, position: &Point3<f64>) -> Option<f64>;
}

impl SetMember for PointKey {
    fn distance_to(self, arena: &BrepArena, position: &Point3<f64>) -> Option<f64> {
        arena.distance_squared_to(self, position).map(f64::sqrt)
    }
}

impl SetMember for EdgeKey {
    fn distance_to(self, arena: &BrepArena, position: &Point3<f64>) -> Option<f64> {
        arena.distance_to_edge(self, position)
    }
}

impl SetMember for FaceKey {
    fn distance_to(self, arena: &BrepArena, position: &Point3<f64>) -> Option<f64> {
        arena.distance_to_face(self, position)
    }
}

/// Insertion-ordered, duplicate-free collection of entity keys.
#[derive(Debug, Clone)]
pub struct EntitySet<K: SetMember> {
    items: Vec<K>,
    members: FxHashSet<K>,
    shadows: Option<EntityShadows<K>>,
}

pub type PointSet = EntitySet<PointKey>;
pub type EdgeSet = EntitySet<EdgeKey>;
pub type FaceSet = EntitySet<FaceKey>;

impl<K: SetMember> Default for EntitySet<K> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            members: FxHashSet::default(),
            shadows: None,
        }
    }
}

impl<K: SetMember> PartialEq for EntitySet<K> {
    /// Same members, regardless of order.
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<K: SetMember> Eq for EntitySet<K> {}

impl<K: SetMember> FromIterator<K> for EntitySet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<K: SetMember> Extend<K> for EntitySet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a, K: SetMember> IntoIterator for &'a EntitySet<K> {
    type Item = &'a K;
    type IntoIter = std::slice::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<K: SetMember> EntitySet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Membership ---

    /// Appends `key`; returns false if it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        if !self.members.insert(key) {
            return false;
        }
        self.items.push(key);
        true
    }

    /// Like [`insert`](Self::insert), but also enters the key's box into the
    /// shadow index when one has been built.
    pub fn insert_indexed(&mut self, key: K, arena: &BrepArena) -> bool {
        if !self.insert(key) {
            return false;
        }
        if let (Some(shadows), Some(bbox)) = (&mut self.shadows, arena.bounding_box(key.into())) {
            shadows.add(key, &bbox);
        }
        true
    }

    /// Removes `key`, keeping the order of the others.
    pub fn remove(&mut self, key: K) -> bool {
        if !self.members.remove(&key) {
            return false;
        }
        self.items.retain(|&k| k != key);
        if let Some(shadows) = &mut self.shadows {
            shadows.remove(key);
        }
        true
    }

    pub fn contains(&self, key: K) -> bool {
        self.members.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.members.clear();
        self.shadows = None;
    }

    /// Drops keys whose entity no longer exists in `arena`.
    pub fn retain_existing(&mut self, arena: &BrepArena) {
        let stale: Vec<K> = self.iter().filter(|&k| !arena.contains(k.into())).collect();
        for key in stale {
            self.remove(key);
        }
    }

    // --- Set algebra ---

    /// Members of either set, `self` first.
    pub fn union(&self, other: &Self) -> Self {
        self.iter().chain(other.iter()).collect()
    }

    /// Members of both sets, in `self` order.
    pub fn intersection(&self, other: &Self) -> Self {
        self.iter().filter(|&k| other.contains(k)).collect()
    }

    /// Members of `self` not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.iter().filter(|&k| !other.contains(k)).collect()
    }

    // --- Spatial ---

    /// Box enclosing every member.
    pub fn bounding_box(&self, arena: &BrepArena) -> Option<BoundingBox> {
        self.iter()
            .filter_map(|k| arena.bounding_box(k.into()))
            .reduce(|a, b| a.union(&b))
    }

    /// Builds the shadow index over the current members using the arena's
    /// margin.
    pub fn index_shadows(&mut self, arena: &BrepArena) {
        let mut shadows = EntityShadows::new(arena.config().shadow_margin);
        for key in self.iter() {
            if let Some(bbox) = arena.bounding_box(key.into()) {
                shadows.add(key, &bbox);
            }
        }
        self.shadows = Some(shadows);
    }

    pub fn has_shadows(&self) -> bool {
        self.shadows.is_some()
    }

    /// Members whose bounding box overlaps `bbox`, in set order.
    pub fn neighbors(&self, arena: &BrepArena, bbox: &BoundingBox) -> Vec<K> {
        let overlaps = |k: K| {
            arena
                .bounding_box(k.into())
                .is_some_and(|b| b.dilated(arena.config().shadow_margin).overlaps(bbox))
        };
        match &self.shadows {
            Some(shadows) => {
                let hits = shadows.neighbors(bbox);
                self.iter()
                    .filter(|&k| hits.contains(&k) || (!shadows.contains(k) && overlaps(k)))
                    .collect()
            }
            None => self.iter().filter(|&k| overlaps(k)).collect(),
        }
    }

    /// Member closest to `position` and its distance.
    pub fn nearest(&self, arena: &BrepArena, position: &Point3<f64>) -> Option<(K, f64)> {
        self.iter()
            .filter_map(|k| k.distance_to(arena, position).map(|d| (k, d)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Members whose bounding box lies inside `bbox`.
    pub fn pick_in_box(&self, arena: &BrepArena, bbox: &BoundingBox) -> Self {
        self.iter()
            .filter(|&k| arena.bounding_box(k.into()).is_some_and(|b| bbox.contains_box(&b)))
            .collect()
    }

    // --- Lookup ---

    pub fn find_tag(&self, arena: &BrepArena, tag: usize) -> Option<K> {
        self.iter().find(|&k| arena.tag_of(k.into()) == Some(tag))
    }

    pub fn find_name(&self, arena: &BrepArena, name: &str) -> Option<K> {
        self.iter().find(|&k| arena.name_of(k.into()) == Some(name))
    }

    /// Tags of the members, in set order.
    pub fn tags(&self, arena: &BrepArena) -> Vec<usize> {
        self.iter().filter_map(|k| arena.tag_of(k.into())).collect()
    }
}

impl<K: SetMember> BitOr for &EntitySet<K> {
    type Output = EntitySet<K>;

    fn bitor(self, rhs: Self) -> EntitySet<K> {
        self.union(rhs)
    }
}

impl<K: SetMember> BitAnd for &EntitySet<K> {
    type Output = EntitySet<K>;

    fn bitand(self, rhs: Self) -> EntitySet<K> {
        self.intersection(rhs)
    }
}

impl<K: SetMember> Sub for &EntitySet<K> {
    type Output = EntitySet<K>;

    fn sub(self, rhs: Self) -> EntitySet<K> {
        self.difference(rhs)
    }
}

// ============================================================================
// Typed sets
// ============================================================================

impl PointSet {
    /// Creates the node of every point.
    pub fn create_nodes<D: MeshDomain + ?Sized>(
        &self,
        arena: &mut BrepArena,
        domain: &mut D,
    ) -> MeshStats {
        let mut stats = MeshStats::default();
        for p in self.iter() {
            if let Some((_, true)) = arena.create_point_node(p, domain) {
                stats.nodes_created += 1;
            }
        }
        stats
    }
}

impl EdgeSet {
    pub fn total_length(&self, arena: &BrepArena) -> f64 {
        self.iter().filter_map(|e| arena.edge_length(e)).sum()
    }

    /// Requests `n` divisions on every edge.
    pub fn set_division_count_all(&self, arena: &mut BrepArena, n: usize, diag: &mut Diagnostics) {
        for e in self.iter() {
            arena.set_division_count(e, n, diag);
        }
    }

    /// Requests divisions of at most `size` on every edge.
    pub fn set_element_size_all(&self, arena: &mut BrepArena, size: f64, diag: &mut Diagnostics) {
        for e in self.iter() {
            arena.set_element_size(e, size, diag);
        }
    }

    /// Line mesh on every edge.
    pub fn mesh_all<D: MeshDomain + ?Sized>(
        &self,
        arena: &mut BrepArena,
        domain: &mut D,
        diag: &mut Diagnostics,
    ) -> MeshStats {
        let mut stats = MeshStats::default();
        for e in self.iter() {
            stats += arena.generate_edge_mesh(e, domain, diag);
        }
        stats
    }
}

impl FaceSet {
    pub fn total_area(&self, arena: &BrepArena) -> f64 {
        self.iter().filter_map(|f| arena.face_area(f)).sum()
    }

    /// Number of member faces using each edge.
    fn edge_use_counts(&self, arena: &BrepArena) -> (Vec<EdgeKey>, FxHashMap<EdgeKey, usize>) {
        let mut order = Vec::new();
        let mut counts: FxHashMap<EdgeKey, usize> = FxHashMap::default();
        for f in self.iter() {
            for e in arena.face_edges(f).unwrap_or_default() {
                let count = counts.entry(e).or_insert(0);
                if *count == 0 {
                    order.push(e);
                }
                *count += 1;
            }
        }
        (order, counts)
    }

    /// Edges used by exactly one face of the set.
    pub fn boundary_edges(&self, arena: &BrepArena) -> EdgeSet {
        let (order, counts) = self.edge_use_counts(arena);
        order.into_iter().filter(|e| counts[e] == 1).collect()
    }

    /// Edges used by two or more faces of the set.
    pub fn shared_edges(&self, arena: &BrepArena) -> EdgeSet {
        let (order, counts) = self.edge_use_counts(arena);
        order.into_iter().filter(|e| counts[e] > 1).collect()
    }

    /// Requests `ni` x `nj` divisions on every face.
    pub fn set_ndivs_all(
        &self,
        arena: &mut BrepArena,
        ni: usize,
        nj: usize,
        diag: &mut Diagnostics,
    ) {
        for f in self.iter() {
            arena.set_ndiv_i(f, ni, diag);
            arena.set_ndiv_j(f, nj, diag);
        }
    }

    /// Reconciles opposite sides across the whole set, then meshes every
    /// face in set order.
    ///
    /// Equalising one face can unbalance a neighbour through a shared edge,
    /// so reconciliation repeats until every face conforms; counts only
    /// grow, which bounds the number of passes.
    pub fn mesh_all<D: MeshDomain + ?Sized>(
        &self,
        arena: &mut BrepArena,
        domain: &mut D,
        diag: &mut Diagnostics,
    ) -> MeshStats {
        for _ in 0..=self.len() {
            if self.iter().all(|f| arena.check_ndivs(f)) {
                break;
            }
            for f in self.iter() {
                arena.conform_ndivs(f, diag);
            }
        }
        let mut stats = MeshStats::default();
        for f in self.iter() {
            stats += arena.generate_face_mesh(f, domain, diag);
        }
        stats
    }
}

impl BrepArena {
    pub fn all_points(&self) -> PointSet {
        let mut keys: Vec<PointKey> = self.points.keys().collect();
        keys.sort_by_key(|&k| self.points[k].tag);
        keys.into_iter().collect()
    }

    pub fn all_edges(&self) -> EdgeSet {
        let mut keys: Vec<EdgeKey> = self.edges.keys().collect();
        self.sort_edges_by_tag(&mut keys);
        keys.into_iter().collect()
    }

    pub fn all_faces(&self) -> FaceSet {
        let mut keys: Vec<FaceKey> = self.faces.keys().collect();
        self.sort_faces_by_tag(&mut keys);
        keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InMemoryMesh;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn strip(arena: &mut BrepArena) -> Vec<FaceKey> {
        arena
            .add_quad_grid(Point3::origin(), Vector3::x() * 3.0, Vector3::y(), 3, 1)
            .unwrap()
    }

    #[test]
    fn set_algebra_keeps_order() {
        let mut arena = BrepArena::new();
        let f = strip(&mut arena);
        let a: FaceSet = [f[0], f[1]].into_iter().collect();
        let b: FaceSet = [f[2], f[1]].into_iter().collect();

        assert_eq!((&a | &b).as_slice(), &[f[0], f[1], f[2]]);
        assert_eq!((&a & &b).as_slice(), &[f[1]]);
        assert_eq!((&a - &b).as_slice(), &[f[0]]);

        let mut c = a.clone();
        assert!(!c.insert(f[0]));
        assert!(c.remove(f[0]));
        assert_eq!(c.as_slice(), &[f[1]]);
    }

    #[test]
    fn boundary_and_shared_edges() {
        let mut arena = BrepArena::new();
        let faces: FaceSet = strip(&mut arena).into_iter().collect();
        assert_eq!(faces.shared_edges(&arena).len(), 2);
        assert_eq!(faces.boundary_edges(&arena).len(), 8);
        assert_relative_eq!(faces.total_area(&arena), 3.0, epsilon = 1e-12);
        assert_relative_eq!(
            faces.boundary_edges(&arena).total_length(&arena),
            8.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn shadow_neighbors_match_the_linear_scan() {
        let mut arena = BrepArena::new();
        let f = strip(&mut arena);
        let mut faces: FaceSet = f.iter().copied().collect();
        let query_box = BoundingBox::new(Point3::new(1.5, 0.2, -1.0), Point3::new(2.5, 0.4, 1.0));

        let scanned = faces.neighbors(&arena, &query_box);
        faces.index_shadows(&arena);
        assert!(faces.has_shadows());
        assert_eq!(faces.neighbors(&arena, &query_box), scanned);
        assert_eq!(scanned, vec![f[1], f[2]]);

        faces.remove(f[1]);
        assert_eq!(faces.neighbors(&arena, &query_box), vec![f[2]]);
    }

    #[test]
    fn shadows_survive_later_insertions() {
        let mut arena = BrepArena::new();
        let f = strip(&mut arena);
        let query_box = BoundingBox::new(Point3::new(1.2, 0.2, -1.0), Point3::new(2.8, 0.4, 1.0));

        let mut faces: FaceSet = [f[0]].into_iter().collect();
        faces.index_shadows(&arena);
        assert!(faces.insert_indexed(f[1], &arena));
        assert!(faces.has_shadows());
        assert_eq!(faces.neighbors(&arena, &query_box), vec![f[1]]);

        // a plain insert is not in the index yet but still found
        assert!(faces.insert(f[2]));
        assert!(faces.has_shadows());
        assert_eq!(faces.neighbors(&arena, &query_box), vec![f[1], f[2]]);

        faces.index_shadows(&arena);
        assert!(!faces.insert_indexed(f[2], &arena));
        assert_eq!(faces.neighbors(&arena, &query_box), vec![f[1], f[2]]);
    }

    #[test]
    fn nearest_lookup_and_picking() {
        let mut arena = BrepArena::new();
        let f = strip(&mut arena);
        let faces = arena.all_faces();
        assert_eq!(faces.as_slice(), f.as_slice());

        let (near, d) = faces.nearest(&arena, &Point3::new(2.5, 0.5, 2.0)).unwrap();
        assert_eq!(near, f[2]);
        assert_relative_eq!(d, 2.0, epsilon = 1e-9);

        let name = arena.name_of(f[1].into()).unwrap().to_string();
        assert_eq!(faces.find_name(&arena, &name), Some(f[1]));
        let tag = arena.tag_of(f[2].into()).unwrap();
        assert_eq!(faces.find_tag(&arena, tag), Some(f[2]));

        let window = BoundingBox::new(Point3::new(-0.1, -0.1, -0.1), Point3::new(2.1, 1.1, 0.1));
        assert_eq!(faces.pick_in_box(&arena, &window).as_slice(), &[f[0], f[1]]);
    }

    #[test]
    fn mesh_all_reconciles_across_shared_edges() {
        let mut arena = BrepArena::new();
        let mut mesh = InMemoryMesh::new();
        let mut diag = Diagnostics::new();
        let f = strip(&mut arena);
        let faces = arena.all_faces();
        faces.set_ndivs_all(&mut arena, 2, 2, &mut diag);
        // raise one vertical edge; the change must propagate along the strip
        let shared = faces.shared_edges(&arena).as_slice()[0];
        arena.set_division_count(shared, 3, &mut diag);

        let stats = faces.mesh_all(&mut arena, &mut mesh, &mut diag);
        assert!(f.iter().all(|&face| arena.check_ndivs(face)));
        assert_eq!(stats.elements_created, 3 * 2 * 3);
        assert_eq!(mesh.node_count(), 7 * 4);
    }
}
