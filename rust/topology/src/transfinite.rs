// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discrete transfinite interpolation (bilinear Coons patch) over four
//! sampled boundary curves.
//!
//! Boundaries are passed in patch orientation:
//!
//! ```text
//!          top (i = 0..=ni)
//!        +-------------->+
//!   left ^               ^ right
//! (j = 0..=nj)           |
//!        +-------------->+
//!          bottom
//! ```
//!
//! Interior parameters come from the arc-length fractions of opposite
//! boundaries, coupled so that graded boundary spacing carries into the
//! interior; the blend reproduces every boundary point exactly.

use nalgebra::{Point3, Vector3};

/// Cumulative arc-length fractions of a polyline, `0` to `1`. Falls back to
/// index fractions when the polyline has no length.
pub fn arc_length_fractions(points: &[Point3<f64>]) -> Vec<f64> {
    let n = points.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mut cumulative = Vec::with_capacity(n);
    let mut acc = 0.0;
    cumulative.push(0.0);
    for w in points.windows(2) {
        acc += (w[1] - w[0]).norm();
        cumulative.push(acc);
    }
    if acc <= f64::EPSILON {
        return (0..n).map(|i| i as f64 / (n - 1) as f64).collect();
    }
    for c in &mut cumulative {
        *c /= acc;
    }
    cumulative
}

/// Structured grid `grid[j][i]` blending the four boundaries.
///
/// `bottom` and `top` must have the same length (`ni + 1`), as must `left`
/// and `right` (`nj + 1`). Corners are taken from `bottom` and `top`.
pub fn coons_grid(
    bottom: &[Point3<f64>],
    right: &[Point3<f64>],
    top: &[Point3<f64>],
    left: &[Point3<f64>],
) -> Vec<Vec<Point3<f64>>> {
    assert_eq!(bottom.len(), top.len(), "bottom and top sample counts differ");
    assert_eq!(left.len(), right.len(), "left and right sample counts differ");
    assert!(bottom.len() >= 2 && left.len() >= 2, "boundaries need two samples");

    let ni = bottom.len() - 1;
    let nj = left.len() - 1;

    let s_bottom = arc_length_fractions(bottom);
    let s_top = arc_length_fractions(top);
    let t_left = arc_length_fractions(left);
    let t_right = arc_length_fractions(right);

    let p00 = bottom[0].coords;
    let p10 = bottom[ni].coords;
    let p01 = top[0].coords;
    let p11 = top[ni].coords;

    let mut grid = Vec::with_capacity(nj + 1);
    for j in 0..=nj {
        let mut row = Vec::with_capacity(ni + 1);
        for i in 0..=ni {
            // u = s_b + v (s_t - s_b), v = t_l + u (t_r - t_l)
            let ds = s_top[i] - s_bottom[i];
            let dt = t_right[j] - t_left[j];
            let denom = 1.0 - ds * dt;
            let (u, v) = if denom.abs() > 1e-12 {
                (
                    (s_bottom[i] + t_left[j] * ds) / denom,
                    (t_left[j] + s_bottom[i] * dt) / denom,
                )
            } else {
                (i as f64 / ni as f64, j as f64 / nj as f64)
            };

            let ruled_v: Vector3<f64> = bottom[i].coords * (1.0 - v) + top[i].coords * v;
            let ruled_u: Vector3<f64> = left[j].coords * (1.0 - u) + right[j].coords * u;
            let bilinear = p00 * ((1.0 - u) * (1.0 - v))
                + p10 * (u * (1.0 - v))
                + p01 * ((1.0 - u) * v)
                + p11 * (u * v);
            row.push(Point3::from(ruled_v + ruled_u - bilinear));
        }
        grid.push(row);
    }
    grid
}
