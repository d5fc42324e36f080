// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only invariant checks over the whole arena.
//!
//! Checks, per entity:
//! - back-reference sets agree with the forward references (point → edges,
//!   edge → faces, edge → composites) and point at live entities
//! - composite chains are contiguous and face boundaries are closed
//! - faces with a mesh have equal division counts on opposite sides
//! - edges are not degenerate (coincident ends, zero divisions)
//! - the name index maps every name back to its entity

use std::fmt;

use crate::arena::*;
use crate::keys::*;

/// Category of a violated invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    DanglingReference,
    BackReference,
    Discontinuous,
    OpenBoundary,
    NonConforming,
    Degenerate,
    NameIndex,
}

/// One violated invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub entity: EntityKey,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} on {:?}: {}", self.kind, self.entity, self.message)
    }
}

impl BrepArena {
    /// Every violated invariant; empty for a consistent model.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.check_point_links(&mut issues);
        self.check_composites(&mut issues);
        self.check_faces(&mut issues);
        self.check_edges(&mut issues);
        self.check_names(&mut issues);
        if !issues.is_empty() {
            tracing::debug!(count = issues.len(), "model validation found issues");
        }
        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    fn check_point_links(&self, issues: &mut Vec<ValidationIssue>) {
        for (p, edges) in &self.point_to_edges {
            for &e in edges {
                match self.edges.get(e) {
                    None => push(
                        issues,
                        IssueKind::DanglingReference,
                        *p,
                        format!("incident edge {e:?} no longer exists"),
                    ),
                    Some(data) if !data.geometry.direct_points().contains(p) => push(
                        issues,
                        IssueKind::BackReference,
                        *p,
                        format!("listed as incident to {} which does not use it", data.name),
                    ),
                    Some(_) => {}
                }
            }
        }
        for (e, data) in &self.edges {
            for p in data.geometry.direct_points() {
                if !self.points.contains_key(p) {
                    push(
                        issues,
                        IssueKind::DanglingReference,
                        e,
                        format!("vertex {p:?} no longer exists"),
                    );
                } else if !self.point_to_edges.get(&p).is_some_and(|s| s.contains(&e)) {
                    push(
                        issues,
                        IssueKind::BackReference,
                        e,
                        format!("{} is missing from its vertex's incident edges", data.name),
                    );
                }
            }
        }
    }

    fn check_composites(&self, issues: &mut Vec<ValidationIssue>) {
        for (sub, composites) in &self.edge_to_composites {
            for &c in composites {
                let uses = match self.edges.get(c).map(|d| &d.geometry) {
                    Some(EdgeGeometry::Composite(chain)) => {
                        chain.sides.iter().any(|s| s.edge == *sub)
                    }
                    _ => false,
                };
                if !uses {
                    push(
                        issues,
                        IssueKind::BackReference,
                        *sub,
                        format!("listed in composite {c:?} which does not contain it"),
                    );
                }
            }
        }
        for (e, data) in &self.edges {
            let EdgeGeometry::Composite(chain) = &data.geometry else {
                continue;
            };
            let sides: Vec<Side> = chain.sides.iter().copied().collect();
            for side in &sides {
                if !self.edges.contains_key(side.edge) {
                    push(
                        issues,
                        IssueKind::DanglingReference,
                        e,
                        format!("side {:?} no longer exists", side.edge),
                    );
                } else if !self
                    .edge_to_composites
                    .get(&side.edge)
                    .is_some_and(|s| s.contains(&e))
                {
                    push(
                        issues,
                        IssueKind::BackReference,
                        e,
                        format!("{} is missing from a side's composite set", data.name),
                    );
                }
            }
            if sides.is_empty() {
                push(issues, IssueKind::Degenerate, e, format!("{} has no sides", data.name));
            }
            for (k, pair) in sides.windows(2).enumerate() {
                if self.side_end(pair[0]) != self.side_start(pair[1]) {
                    push(
                        issues,
                        IssueKind::Discontinuous,
                        e,
                        format!("{}: sides {} and {} do not meet", data.name, k, k + 1),
                    );
                }
            }
        }
    }

    fn check_faces(&self, issues: &mut Vec<ValidationIssue>) {
        for (e, faces) in &self.edge_to_faces {
            for &f in faces {
                let uses = self
                    .faces
                    .get(f)
                    .is_some_and(|d| d.sides.iter().any(|s| s.edge == *e));
                if !uses {
                    push(
                        issues,
                        IssueKind::BackReference,
                        *e,
                        format!("listed as boundary of {f:?} which does not use it"),
                    );
                }
            }
        }
        for (f, data) in &self.faces {
            let sides: Vec<Side> = data.sides.iter().copied().collect();
            for side in &sides {
                if !self.edges.contains_key(side.edge) {
                    push(
                        issues,
                        IssueKind::DanglingReference,
                        f,
                        format!("boundary edge {:?} no longer exists", side.edge),
                    );
                } else if !self.edge_to_faces.get(&side.edge).is_some_and(|s| s.contains(&f)) {
                    push(
                        issues,
                        IssueKind::BackReference,
                        f,
                        format!("{} is missing from a boundary edge's face set", data.name),
                    );
                }
            }
            if sides.is_empty() {
                if data.state != FaceState::Undefined {
                    push(
                        issues,
                        IssueKind::OpenBoundary,
                        f,
                        format!("{} has no boundary but state {:?}", data.name, data.state),
                    );
                }
                continue;
            }
            let closed = (0..sides.len()).all(|k| {
                let next = sides[(k + 1) % sides.len()];
                self.side_end(sides[k]).is_some()
                    && self.side_end(sides[k]) == self.side_start(next)
            });
            if !closed {
                push(
                    issues,
                    IssueKind::OpenBoundary,
                    f,
                    format!("{} boundary is not a closed loop", data.name),
                );
            }
            let meshed = matches!(data.state, FaceState::BoundaryMeshed | FaceState::SurfaceMeshed);
            if meshed && !self.check_ndivs(f) {
                push(
                    issues,
                    IssueKind::NonConforming,
                    f,
                    format!("{} is meshed with unequal opposite sides", data.name),
                );
            }
        }
    }

    fn check_edges(&self, issues: &mut Vec<ValidationIssue>) {
        for (e, data) in &self.edges {
            if data.ndiv == 0 {
                push(issues, IssueKind::Degenerate, e, format!("{} has zero divisions", data.name));
            }
            if data.geometry.is_composite() {
                continue;
            }
            let Some((a, b)) = self.edge_endpoints(e) else {
                continue;
            };
            let (Some(pa), Some(pb)) = (self.point_position(a), self.point_position(b)) else {
                continue;
            };
            if (pa - pb).norm() <= self.config.coincidence_tolerance {
                push(
                    issues,
                    IssueKind::Degenerate,
                    e,
                    format!("{} has coincident ends", data.name),
                );
            }
        }
    }

    fn check_names(&self, issues: &mut Vec<ValidationIssue>) {
        let keys = self
            .points
            .keys()
            .map(EntityKey::Point)
            .chain(self.edges.keys().map(EntityKey::Edge))
            .chain(self.faces.keys().map(EntityKey::Face));
        for key in keys {
            let Some(name) = self.name_of(key) else {
                continue;
            };
            if self.names.get(name) != Some(&key) {
                push(
                    issues,
                    IssueKind::NameIndex,
                    key,
                    format!("name {name:?} does not resolve to this entity"),
                );
            }
        }
        for (name, &key) in &self.names {
            if self.name_of(key) != Some(name.as_str()) {
                push(issues, IssueKind::NameIndex, key, format!("stale name {name:?}"));
            }
        }
    }
}

fn push(
    issues: &mut Vec<ValidationIssue>,
    kind: IssueKind,
    entity: impl Into<EntityKey>,
    message: String,
) {
    issues.push(ValidationIssue {
        kind,
        entity: entity.into(),
        message,
    });
}
