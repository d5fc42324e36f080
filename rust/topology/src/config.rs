// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Meshing configuration loaded from defaults, JSON, or environment variables.

use serde::{Deserialize, Serialize};

/// Tunable thresholds shared by the arena, the spatial indices and the
/// quality checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshingConfig {
    /// Division count given to new edges until one is requested explicitly.
    pub default_ndiv: usize,
    /// Number of lazy erasures a KD index accepts before rebuilding itself.
    pub rebalance_threshold: usize,
    /// Dilation applied to bounding boxes when they enter an axis-shadow
    /// index; neighbour queries match boxes this close without touching.
    pub shadow_margin: f64,
    /// Elements below this area are reported as suspect.
    pub min_element_area: f64,
    /// Faces below this area are reported as suspect.
    pub min_face_area: f64,
    /// Distance under which two positions are treated as the same point.
    pub coincidence_tolerance: f64,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            default_ndiv: 4,
            rebalance_threshold: 10,
            shadow_margin: 1e-6,
            min_element_area: 1e-10,
            min_face_area: 1e-10,
            coincidence_tolerance: 1e-9,
        }
    }
}

impl MeshingConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ndiv: env_or("BREPMESH_DEFAULT_NDIV", defaults.default_ndiv),
            rebalance_threshold: env_or(
                "BREPMESH_REBALANCE_THRESHOLD",
                defaults.rebalance_threshold,
            ),
            shadow_margin: env_or("BREPMESH_SHADOW_MARGIN", defaults.shadow_margin),
            min_element_area: env_or("BREPMESH_MIN_ELEMENT_AREA", defaults.min_element_area),
            min_face_area: env_or("BREPMESH_MIN_FACE_AREA", defaults.min_face_area),
            coincidence_tolerance: env_or("BREPMESH_TOLERANCE", defaults.coincidence_tolerance),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
