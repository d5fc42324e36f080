// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based storage of B-rep entities.
//!
//! Keys are created by `slotmap::SlotMap` and stay valid after other entities
//! are removed (generational indices), so a stale key is detected instead of
//! silently aliasing a newer entity.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a point (0-D entity holding a position).
    pub struct PointKey;

    /// Key for an edge (segment, arc, segmented line or composite chain).
    pub struct EdgeKey;

    /// Key for a face (closed loop of edges meshed as a quad surface).
    pub struct FaceKey;
}

/// A key that can reference any B-rep entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Point(PointKey),
    Edge(EdgeKey),
    Face(FaceKey),
}

impl EntityKey {
    /// Returns the entity type of this key.
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKey::Point(_) => EntityType::Point,
            EntityKey::Edge(_) => EntityType::Edge,
            EntityKey::Face(_) => EntityType::Face,
        }
    }
}

/// Discriminant for entity types, ordered by topological dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Point = 0,
    Edge = 1,
    Face = 2,
}

impl EntityType {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Point => "Point",
            EntityType::Edge => "Edge",
            EntityType::Face => "Face",
        }
    }

    /// Prefix used for default entity names (`p1`, `l3`, `s2`).
    pub fn name_prefix(&self) -> &'static str {
        match self {
            EntityType::Point => "p",
            EntityType::Edge => "l",
            EntityType::Face => "s",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PointKey> for EntityKey {
    fn from(k: PointKey) -> Self {
        EntityKey::Point(k)
    }
}

impl From<EdgeKey> for EntityKey {
    fn from(k: EdgeKey) -> Self {
        EntityKey::Edge(k)
    }
}

impl From<FaceKey> for EntityKey {
    fn from(k: FaceKey) -> Self {
        EntityKey::Face(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn entity_type_names() {
        assert_eq!(EntityType::Point.as_str(), "Point");
        assert_eq!(EntityType::Edge.as_str(), "Edge");
        assert_eq!(EntityType::Face.to_string(), "Face");
    }

    #[test]
    fn entity_type_ordering_follows_dimension() {
        assert!(EntityType::Point < EntityType::Edge);
        assert!(EntityType::Edge < EntityType::Face);
    }

    #[test]
    fn key_conversion_keeps_type() {
        let mut points: SlotMap<PointKey, ()> = SlotMap::with_key();
        let pk = points.insert(());
        let key: EntityKey = pk.into();
        assert_eq!(key.entity_type(), EntityType::Point);
        assert_eq!(key, EntityKey::Point(pk));
    }
}
