// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric evaluation of edges and faces.
//!
//! Every edge variant is sampled through one entry point,
//! [`BrepArena::edge_positions`], which yields `ndiv + 1` positions with the
//! first and last snapped onto the edge's end points. Face measures (area,
//! normal, centroid) are computed on the closed polyline of the boundary.

use std::f64::consts::TAU;

use nalgebra::{Point3, Vector3};

use crate::arena::*;
use crate::keys::*;

/// Sampling used for arcs in geometric queries, independent of `ndiv`.
const ARC_QUERY_SAMPLES: usize = 32;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Zero-volume box around one position.
    pub fn from_point(p: Point3<f64>) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box enclosing `points`, or `None` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::from_point(*first);
        for p in iter {
            bbox.expand_to(p);
        }
        Some(bbox)
    }

    pub fn expand_to(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Inclusive overlap test: touching boxes overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Box grown by `margin` on every side.
    pub fn dilated(&self, margin: f64) -> BoundingBox {
        let m = Vector3::repeat(margin);
        BoundingBox {
            min: self.min - m,
            max: self.max + m,
        }
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Extent along one axis (0 = x, 1 = y, 2 = z).
    pub fn interval(&self, axis: usize) -> (f64, f64) {
        (self.min[axis], self.max[axis])
    }
}

/// Circle through an arc's three defining points.
///
/// Angles are measured from `x_axis` towards `y_axis`; the normal is chosen
/// so that `start → mid → end` is counter-clockwise and the arc spans
/// `[0, sweep]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcGeometry {
    pub center: Point3<f64>,
    pub radius: f64,
    pub normal: Vector3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
    pub sweep: f64,
}

impl ArcGeometry {
    /// Circle through `start`, `mid` and `end`. `None` if the points are
    /// collinear or coincident.
    pub fn from_points(start: &Point3<f64>, mid: &Point3<f64>, end: &Point3<f64>) -> Option<Self> {
        let a = mid - start;
        let b = end - start;
        let axb = a.cross(&b);
        let denom = 2.0 * axb.norm_squared();
        if denom <= 1e-20 * (a.norm_squared() * b.norm_squared()).max(f64::MIN_POSITIVE) {
            return None;
        }

        // Circumcentre relative to `start`
        let offset = (b.cross(&axb) * a.norm_squared() + axb.cross(&a) * b.norm_squared()) / denom;
        let center = start + offset;
        let radius = offset.norm();
        let normal = axb.normalize();
        let x_axis = (start - center) / radius;
        let y_axis = normal.cross(&x_axis);

        let mut arc = Self {
            center,
            radius,
            normal,
            x_axis,
            y_axis,
            sweep: 0.0,
        };
        arc.sweep = arc.angle_of(end);
        if arc.sweep <= 0.0 {
            return None;
        }
        Some(arc)
    }

    /// Angle of `p` around the centre, in `[0, 2π)`.
    pub fn angle_of(&self, p: &Point3<f64>) -> f64 {
        let v = p - self.center;
        let theta = v.dot(&self.y_axis).atan2(v.dot(&self.x_axis));
        if theta < 0.0 {
            theta + TAU
        } else {
            theta
        }
    }

    pub fn point_at_angle(&self, theta: f64) -> Point3<f64> {
        self.center + (self.x_axis * theta.cos() + self.y_axis * theta.sin()) * self.radius
    }

    /// Unit tangent at `theta`, pointing along increasing angle.
    pub fn tangent_at_angle(&self, theta: f64) -> Vector3<f64> {
        self.y_axis * theta.cos() - self.x_axis * theta.sin()
    }

    pub fn length(&self) -> f64 {
        self.radius * self.sweep
    }
}

/// Closest point to `p` on the segment `a`–`b`.
pub fn closest_point_on_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f64::EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point to `p` on the triangle `v0 v1 v2` (Voronoi-region walk).
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
) -> Point3<f64> {
    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = p - v0;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *v0;
    }

    let bp = p - v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *v1;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return v0 + ab * (d1 / (d1 - d3));
    }

    let cp = p - v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *v2;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return v0 + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return v1 + (v2 - v1) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    v0 + ab * (vb * denom) + ac * (vc * denom)
}

/// Newell vector area of a closed polygon: its norm is twice the area and
/// its direction the normal.
pub fn polygon_vector_area(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();
    let mut sum = Vector3::zeros();
    for i in 0..n {
        sum += points[i].coords.cross(&points[(i + 1) % n].coords);
    }
    sum
}

/// Cumulative fractions in `[0, 1]` of a segmented line sampled with `ndiv`
/// divisions. The user lengths define a piecewise-linear grading that is
/// reproduced exactly when `ndiv == lengths.len()`.
pub fn segmented_fractions(lengths: &[f64], ndiv: usize) -> Vec<f64> {
    let total: f64 = lengths.iter().sum();
    let m = lengths.len();
    if m == 0 || total <= 0.0 || ndiv == 0 {
        return (0..=ndiv).map(|i| i as f64 / ndiv.max(1) as f64).collect();
    }

    let mut cumulative = Vec::with_capacity(m + 1);
    let mut acc = 0.0;
    cumulative.push(0.0);
    for l in lengths {
        acc += l;
        cumulative.push(acc / total);
    }

    (0..=ndiv)
        .map(|i| {
            let u = i as f64 * m as f64 / ndiv as f64;
            let k = (u.floor() as usize).min(m - 1);
            let t = u - k as f64;
            cumulative[k] + t * (cumulative[k + 1] - cumulative[k])
        })
        .collect()
}

fn lerp(a: &Point3<f64>, b: &Point3<f64>, t: f64) -> Point3<f64> {
    a + (b - a) * t
}

impl BrepArena {
    // --- Edge geometry ---

    /// Circle of an arc edge.
    pub fn arc_geometry(&self, edge: EdgeKey) -> Option<ArcGeometry> {
        match &self.edges.get(edge)?.geometry {
            EdgeGeometry::Arc { start, mid, end } => ArcGeometry::from_points(
                &self.point_position(*start)?,
                &self.point_position(*mid)?,
                &self.point_position(*end)?,
            ),
            _ => None,
        }
    }

    /// Length of an edge: chord for straight variants, `r·θ` for arcs, sum
    /// of the parts for composites.
    pub fn edge_length(&self, edge: EdgeKey) -> Option<f64> {
        match &self.edges.get(edge)?.geometry {
            EdgeGeometry::Segment { start, end }
            | EdgeGeometry::SegmentedLine { start, end, .. } => {
                Some((self.point_position(*end)? - self.point_position(*start)?).norm())
            }
            EdgeGeometry::Arc { .. } => self.arc_geometry(edge).map(|a| a.length()),
            EdgeGeometry::Composite(c) => c
                .sides
                .iter()
                .map(|s| self.edge_length(s.edge))
                .sum(),
        }
    }

    /// `ndiv + 1` positions along the edge, from its first to its last
    /// vertex. Composites concatenate their sides' positions, each with its
    /// own division count, dropping the shared end points.
    ///
    /// Returns `None` if the edge or one of its points is missing.
    pub fn edge_positions(&self, edge: EdgeKey) -> Option<Vec<Point3<f64>>> {
        self.sample_edge(edge, false)
    }

    /// Positions of an edge walked along `side`'s orientation.
    pub fn side_positions(&self, side: Side) -> Option<Vec<Point3<f64>>> {
        let mut positions = self.edge_positions(side.edge)?;
        if !side.forward {
            positions.reverse();
        }
        Some(positions)
    }

    /// Polyline used for geometric queries: arcs are sampled finely
    /// regardless of their division count.
    pub(crate) fn edge_polyline(&self, edge: EdgeKey) -> Option<Vec<Point3<f64>>> {
        self.sample_edge(edge, true)
    }

    fn sample_edge(&self, edge: EdgeKey, dense: bool) -> Option<Vec<Point3<f64>>> {
        let data = self.edges.get(edge)?;
        let n = data.ndiv;
        match &data.geometry {
            EdgeGeometry::Segment { start, end } => {
                let (a, b) = (self.point_position(*start)?, self.point_position(*end)?);
                let mut out: Vec<_> = (0..=n)
                    .map(|i| lerp(&a, &b, i as f64 / n.max(1) as f64))
                    .collect();
                snap_ends(&mut out, a, b);
                Some(out)
            }
            EdgeGeometry::Arc { start, end, .. } => {
                let arc = self.arc_geometry(edge)?;
                let n = if dense { n.max(ARC_QUERY_SAMPLES) } else { n };
                let mut out: Vec<_> = (0..=n)
                    .map(|i| arc.point_at_angle(arc.sweep * i as f64 / n.max(1) as f64))
                    .collect();
                snap_ends(&mut out, self.point_position(*start)?, self.point_position(*end)?);
                Some(out)
            }
            EdgeGeometry::SegmentedLine {
                start,
                end,
                lengths,
            } => {
                let (a, b) = (self.point_position(*start)?, self.point_position(*end)?);
                let mut out: Vec<_> = segmented_fractions(lengths, n)
                    .into_iter()
                    .map(|t| lerp(&a, &b, t))
                    .collect();
                snap_ends(&mut out, a, b);
                Some(out)
            }
            EdgeGeometry::Composite(c) => {
                let mut out: Vec<Point3<f64>> = Vec::new();
                for side in &c.sides {
                    let mut part = self.sample_edge(side.edge, dense)?;
                    if !side.forward {
                        part.reverse();
                    }
                    let skip = usize::from(!out.is_empty());
                    out.extend(part.into_iter().skip(skip));
                }
                Some(out)
            }
        }
    }

    /// Unit tangent at the fraction `t` (0 = first vertex, 1 = last vertex).
    pub fn edge_tangent(&self, edge: EdgeKey, t: f64) -> Option<Vector3<f64>> {
        let t = t.clamp(0.0, 1.0);
        if let Some(arc) = self.arc_geometry(edge) {
            return Some(arc.tangent_at_angle(arc.sweep * t));
        }
        let polyline = self.edge_polyline(edge)?;
        if polyline.len() < 2 {
            return None;
        }
        let segments = polyline.len() - 1;
        let i = ((t * segments as f64).floor() as usize).min(segments - 1);
        (polyline[i + 1] - polyline[i]).try_normalize(f64::EPSILON)
    }

    /// Closest point of the edge to `position`.
    pub fn closest_point_on_edge(
        &self,
        edge: EdgeKey,
        position: &Point3<f64>,
    ) -> Option<Point3<f64>> {
        let polyline = self.edge_polyline(edge)?;
        if polyline.len() == 1 {
            return polyline.first().copied();
        }
        polyline
            .windows(2)
            .map(|w| closest_point_on_segment(position, &w[0], &w[1]))
            .min_by(|a, b| (a - position).norm_squared().total_cmp(&(b - position).norm_squared()))
    }

    pub fn distance_to_edge(&self, edge: EdgeKey, position: &Point3<f64>) -> Option<f64> {
        self.closest_point_on_edge(edge, position)
            .map(|c| (c - position).norm())
    }

    // --- Face geometry ---

    /// Closed boundary polyline of a face (last point not repeated).
    pub fn face_boundary_positions(&self, face: FaceKey) -> Option<Vec<Point3<f64>>> {
        let data = self.faces.get(face)?;
        let mut out: Vec<Point3<f64>> = Vec::new();
        for side in &data.sides {
            let mut part = self.edge_polyline(side.edge)?;
            if !side.forward {
                part.reverse();
            }
            let skip = usize::from(!out.is_empty());
            out.extend(part.into_iter().skip(skip));
        }
        if out.len() > 1 {
            out.pop();
        }
        Some(out)
    }

    /// Area enclosed by the face boundary.
    pub fn face_area(&self, face: FaceKey) -> Option<f64> {
        let boundary = self.face_boundary_positions(face)?;
        Some(polygon_vector_area(&boundary).norm() / 2.0)
    }

    /// Unit normal following the boundary orientation (right-hand rule).
    pub fn face_normal(&self, face: FaceKey) -> Option<Vector3<f64>> {
        let boundary = self.face_boundary_positions(face)?;
        polygon_vector_area(&boundary).try_normalize(f64::EPSILON)
    }

    /// Average of the boundary polyline points.
    pub fn face_centroid(&self, face: FaceKey) -> Option<Point3<f64>> {
        let boundary = self.face_boundary_positions(face)?;
        if boundary.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = boundary.iter().map(|p| p.coords).sum();
        Some(Point3::from(sum / boundary.len() as f64))
    }

    /// Distance from `position` to the face, approximated by a triangle fan
    /// over the boundary polyline.
    pub fn distance_to_face(&self, face: FaceKey, position: &Point3<f64>) -> Option<f64> {
        let boundary = self.face_boundary_positions(face)?;
        let centroid = self.face_centroid(face)?;
        let n = boundary.len();
        if n < 2 {
            return boundary.first().map(|p| (p - position).norm());
        }
        (0..n)
            .map(|i| {
                let (a, b) = (&boundary[i], &boundary[(i + 1) % n]);
                let c = closest_point_on_triangle(position, &centroid, a, b);
                (c - position).norm()
            })
            .min_by(f64::total_cmp)
    }

    // --- Bounding boxes ---

    /// Bounding box of any entity.
    pub fn bounding_box(&self, key: EntityKey) -> Option<BoundingBox> {
        match key {
            EntityKey::Point(k) => self.point_position(k).map(BoundingBox::from_point),
            EntityKey::Edge(k) => BoundingBox::from_points(&self.edge_polyline(k)?),
            EntityKey::Face(k) => BoundingBox::from_points(&self.face_boundary_positions(k)?),
        }
    }
}

fn snap_ends(positions: &mut [Point3<f64>], start: Point3<f64>, end: Point3<f64>) {
    if let Some(first) = positions.first_mut() {
        *first = start;
    }
    if positions.len() > 1 {
        if let Some(last) = positions.last_mut() {
            *last = end;
        }
    }
}
