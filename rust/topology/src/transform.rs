// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Affine transformations on model entities.
//!
//! Transforms move point positions in place. Edges and faces reference
//! points through keys, so moving the points moves everything built on
//! them. A point shared with an entity outside the selection moves too.
//! Nodes that were already created keep their positions.

use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};
use rustc_hash::FxHashSet;

use crate::arena::BrepArena;
use crate::error::{Error, Result};
use crate::keys::*;

impl BrepArena {
    /// Translates every point of an entity by `offset`.
    pub fn translate(&mut self, key: EntityKey, offset: &Vector3<f64>) -> Result<()> {
        self.map_points(key, |p| p + offset)
    }

    /// Rotates every point of an entity by `angle` radians about the line
    /// through `origin` along `axis`. A zero axis leaves the points alone.
    pub fn rotate(
        &mut self,
        key: EntityKey,
        origin: &Point3<f64>,
        axis: &Vector3<f64>,
        angle: f64,
    ) -> Result<()> {
        let Some(unit_axis) = Unit::try_new(*axis, 1e-15) else {
            return if self.contains(key) {
                Ok(())
            } else {
                Err(Error::not_found(key))
            };
        };
        let rotation = Rotation3::from_axis_angle(&unit_axis, angle);
        self.map_points(key, |p| origin + rotation * (p - origin))
    }

    /// Scales every point of an entity about `origin`, per axis.
    pub fn scale(
        &mut self,
        key: EntityKey,
        origin: &Point3<f64>,
        factors: &Vector3<f64>,
    ) -> Result<()> {
        self.map_points(key, |p| origin + (p - origin).component_mul(factors))
    }

    /// Applies a homogeneous 4x4 matrix to every point of an entity.
    pub fn transform(&mut self, key: EntityKey, matrix: &Matrix4<f64>) -> Result<()> {
        self.map_points(key, |p| matrix.transform_point(&p))
    }

    /// Points that define an entity's geometry, arc mid points included.
    pub fn defining_points(&self, key: EntityKey) -> Vec<PointKey> {
        let edges = match key {
            EntityKey::Point(p) => {
                return if self.points.contains_key(p) { vec![p] } else { Vec::new() };
            }
            EntityKey::Edge(e) => vec![e],
            EntityKey::Face(f) => self.face_edges(f).unwrap_or_default(),
        };
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for edge in edges {
            for leaf in self.leaf_edges(edge) {
                let Some(data) = self.edges.get(leaf) else {
                    continue;
                };
                for p in data.geometry.direct_points() {
                    if seen.insert(p) {
                        out.push(p);
                    }
                }
            }
        }
        out
    }

    fn map_points(&mut self, key: EntityKey, f: impl Fn(Point3<f64>) -> Point3<f64>) -> Result<()> {
        if !self.contains(key) {
            return Err(Error::not_found(key));
        }
        for p in self.defining_points(key) {
            if let Some(data) = self.points.get_mut(p) {
                data.position = f(data.position);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn translate_point() {
        let mut arena = BrepArena::new();
        let p = arena.add_point(Point3::new(1.0, 2.0, 3.0));
        arena.translate(p.into(), &Vector3::new(10.0, 20.0, 30.0)).unwrap();
        assert_relative_eq!(arena.point_position(p).unwrap(), Point3::new(11.0, 22.0, 33.0));
    }

    #[test]
    fn translate_face_moves_each_corner_once() {
        let mut arena = BrepArena::new();
        let pts: Vec<PointKey> = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
            .iter()
            .map(|c| arena.add_point(Point3::new(c[0], c[1], 0.0)))
            .collect();
        let face = arena.add_quad_surface(&pts).unwrap();
        let before = arena.face_area(face).unwrap();

        arena.translate(face.into(), &Vector3::z()).unwrap();
        assert_eq!(arena.defining_points(face.into()).len(), 4);
        for &p in &pts {
            assert_relative_eq!(arena.point_position(p).unwrap().z, 1.0);
        }
        assert_relative_eq!(arena.face_area(face).unwrap(), before, epsilon = 1e-12);
    }

    #[test]
    fn rotate_arc_about_offset_origin() {
        let mut arena = BrepArena::new();
        let a = arena.add_point(Point3::new(2.0, 0.0, 0.0));
        let m = arena.add_point(Point3::new(1.0 + 0.5_f64.sqrt(), 0.5_f64.sqrt(), 0.0));
        let b = arena.add_point(Point3::new(1.0, 1.0, 0.0));
        let arc = arena.add_arc(a, m, b).unwrap();
        let length = arena.edge_length(arc).unwrap();

        arena
            .rotate(arc.into(), &Point3::new(1.0, 0.0, 0.0), &Vector3::z(), FRAC_PI_2)
            .unwrap();
        let moved = arena.point_position(a).unwrap();
        assert_relative_eq!(moved.x, 1.0, epsilon = 1e-10);
        assert_relative_eq!(moved.y, 1.0, epsilon = 1e-10);
        assert_relative_eq!(arena.edge_length(arc).unwrap(), length, epsilon = 1e-10);
    }

    #[test]
    fn scale_and_matrix() {
        let mut arena = BrepArena::new();
        let a = arena.add_point(Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_point(Point3::new(2.0, 0.0, 0.0));
        let line = arena.add_line(a, b).unwrap();

        arena
            .scale(line.into(), &Point3::origin(), &Vector3::new(3.0, 1.0, 1.0))
            .unwrap();
        assert_relative_eq!(arena.edge_length(line).unwrap(), 6.0);

        let shift = Matrix4::new_translation(&Vector3::new(0.0, 5.0, 0.0));
        arena.transform(line.into(), &shift).unwrap();
        assert_relative_eq!(arena.point_position(b).unwrap().y, 5.0);
    }

    #[test]
    fn missing_entity_is_an_error() {
        let mut arena = BrepArena::new();
        let p = arena.add_point(Point3::origin());
        arena.remove_point(p).unwrap();
        assert!(arena.translate(p.into(), &Vector3::x()).is_err());
    }
}
