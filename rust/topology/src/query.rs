// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lookup and nearest-entity queries used by model-building front ends:
//! by name, by tag, nearest edge or face to a point, and box selection.

use nalgebra::Point3;

use crate::arena::BrepArena;
use crate::geometry::BoundingBox;
use crate::keys::*;

impl BrepArena {
    /// Entity with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityKey> {
        self.names.get(name).copied()
    }

    /// Entity of type `ty` with the given tag.
    pub fn find_by_tag(&self, ty: EntityType, tag: usize) -> Option<EntityKey> {
        match ty {
            EntityType::Point => self
                .points
                .iter()
                .find(|(_, d)| d.tag == tag)
                .map(|(k, _)| EntityKey::Point(k)),
            EntityType::Edge => self
                .edges
                .iter()
                .find(|(_, d)| d.tag == tag)
                .map(|(k, _)| EntityKey::Edge(k)),
            EntityType::Face => self
                .faces
                .iter()
                .find(|(_, d)| d.tag == tag)
                .map(|(k, _)| EntityKey::Face(k)),
        }
    }

    /// Edge closest to `position` and its distance. Ties go to the lower tag.
    pub fn nearest_edge(&self, position: &Point3<f64>) -> Option<(EdgeKey, f64)> {
        let mut edges: Vec<EdgeKey> = self.edges.keys().collect();
        self.sort_edges_by_tag(&mut edges);
        edges
            .into_iter()
            .filter_map(|e| self.distance_to_edge(e, position).map(|d| (e, d)))
            .fold(None, |best, (e, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((e, d)),
            })
    }

    /// Face closest to `position` and its distance. Ties go to the lower tag.
    pub fn nearest_face(&self, position: &Point3<f64>) -> Option<(FaceKey, f64)> {
        let mut faces: Vec<FaceKey> = self.faces.keys().collect();
        self.sort_faces_by_tag(&mut faces);
        faces
            .into_iter()
            .filter_map(|f| self.distance_to_face(f, position).map(|d| (f, d)))
            .fold(None, |best, (f, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((f, d)),
            })
    }

    /// Every entity whose bounding box lies inside `bbox`: points, then
    /// edges, then faces, each by tag.
    pub fn entities_in_box(&self, bbox: &BoundingBox) -> Vec<EntityKey> {
        let inside = |key: EntityKey| self.bounding_box(key).is_some_and(|b| bbox.contains_box(&b));
        let mut out = Vec::new();

        let mut points: Vec<PointKey> = self.points.keys().collect();
        points.sort_by_key(|&p| self.points[p].tag);
        out.extend(points.into_iter().map(EntityKey::Point).filter(|&k| inside(k)));

        let mut edges: Vec<EdgeKey> = self.edges.keys().collect();
        self.sort_edges_by_tag(&mut edges);
        out.extend(edges.into_iter().map(EntityKey::Edge).filter(|&k| inside(k)));

        let mut faces: Vec<FaceKey> = self.faces.keys().collect();
        self.sort_faces_by_tag(&mut faces);
        out.extend(faces.into_iter().map(EntityKey::Face).filter(|&k| inside(k)));
        out
    }

    /// Box around every point of the model.
    pub fn model_bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points.values().map(|p| &p.position))
    }
}
