// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level builders for quad surfaces with shared boundary edges.
//!
//! Consecutive corner points are joined by reusing any existing edge between
//! them, so neighbouring surfaces built from the same points share their
//! common side and end up with conforming meshes.

use nalgebra::{Point3, Vector3};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

impl BrepArena {
    /// Sets the boundary of `face` from its ordered corner points.
    ///
    /// Needs at least 4 distinct points. Each pair of consecutive points
    /// (and the last with the first) is joined by an existing edge between
    /// them or a new segment. Moves the face to `PointsSet`.
    pub fn set_face_points(&mut self, face: FaceKey, points: &[PointKey]) -> Result<()> {
        let data = self.faces.get(face).ok_or(Error::FaceNotFound(face))?;
        if data.has_nodes() {
            return Err(Error::AlreadyMeshed(face.into()));
        }
        if points.len() < 4 {
            return Err(Error::TooFewPoints {
                required: 4,
                given: points.len(),
            });
        }

        // Validate everything before creating any edge
        let mut seen = rustc_hash::FxHashSet::default();
        for &p in points {
            if !self.points.contains_key(p) {
                return Err(Error::PointNotFound(p));
            }
            if !seen.insert(p) {
                return Err(Error::RepeatedPoint(p));
            }
        }
        let n = points.len();
        for i in 0..n {
            let (a, b) = (points[i], points[(i + 1) % n]);
            let d = (self.points[a].position - self.points[b].position).norm();
            if d <= self.config.coincidence_tolerance {
                return Err(Error::DegenerateEdge(a, b));
            }
        }

        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            edges.push(self.line_between(points[i], points[(i + 1) % n])?);
        }
        let sides = self.closed_loop(&edges)?;
        self.set_face_sides(face, sides);
        Ok(())
    }

    /// Creates a face and sets its corner points in one call.
    pub fn add_quad_surface(&mut self, points: &[PointKey]) -> Result<FaceKey> {
        let face = self.new_face();
        if let Err(e) = self.set_face_points(face, points) {
            let _ = self.remove_face(face);
            return Err(e);
        }
        Ok(face)
    }

    /// Existing simple edge joining `a` and `b`, or a new segment.
    pub fn line_between(&mut self, a: PointKey, b: PointKey) -> Result<EdgeKey> {
        match self.edges_between(a, b).first() {
            Some(&existing) => Ok(existing),
            None => self.add_line(a, b),
        }
    }

    /// Builds quad surfaces from corner coordinates, merging corners closer
    /// than `tolerance` so that adjacent surfaces share points and edges.
    pub fn sew_quad_surfaces(
        &mut self,
        surfaces: &[Vec<[f64; 3]>],
        tolerance: f64,
    ) -> Result<Vec<FaceKey>> {
        let mut index = self.point_index();
        let mut faces = Vec::with_capacity(surfaces.len());
        for coords in surfaces {
            let points: Vec<PointKey> = coords
                .iter()
                .map(|c| {
                    self.find_or_add_point(&mut index, Point3::new(c[0], c[1], c[2]), tolerance)
                })
                .collect();
            faces.push(self.add_quad_surface(&points)?);
        }
        Ok(faces)
    }

    /// Structured patch of `nu x nv` quad surfaces spanning the
    /// parallelogram `origin + s·u + t·v`, `s, t ∈ [0, 1]`.
    ///
    /// Returns the faces row by row (`v` outer, `u` inner).
    pub fn add_quad_grid(
        &mut self,
        origin: Point3<f64>,
        u: Vector3<f64>,
        v: Vector3<f64>,
        nu: usize,
        nv: usize,
    ) -> Result<Vec<FaceKey>> {
        if nu == 0 || nv == 0 {
            return Err(Error::TooFewPoints {
                required: 1,
                given: 0,
            });
        }
        let mut grid = Vec::with_capacity((nu + 1) * (nv + 1));
        for j in 0..=nv {
            for i in 0..=nu {
                let s = i as f64 / nu as f64;
                let t = j as f64 / nv as f64;
                grid.push(self.add_point(origin + u * s + v * t));
            }
        }
        let at = |i: usize, j: usize| grid[j * (nu + 1) + i];

        let mut faces = Vec::with_capacity(nu * nv);
        for j in 0..nv {
            for i in 0..nu {
                let corners = [at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)];
                faces.push(self.add_quad_surface(&corners)?);
            }
        }
        Ok(faces)
    }
}
