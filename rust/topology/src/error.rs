// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for model construction and lookup.
//!
//! Only the building API returns these. Conflicts found while reconciling
//! division counts or generating meshes are reported through
//! [`Diagnostics`](crate::diagnostics::Diagnostics) instead.

use crate::keys::{EdgeKey, EntityKey, FaceKey, PointKey};

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or editing the model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Point key not found in the arena.
    #[error("point not found: {0:?}")]
    PointNotFound(PointKey),

    /// Edge key not found in the arena.
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeKey),

    /// Face key not found in the arena.
    #[error("face not found: {0:?}")]
    FaceNotFound(FaceKey),

    /// Both ends of an edge are the same point (or coincide in space).
    #[error("edge endpoints coincide: {0:?} and {1:?}")]
    DegenerateEdge(PointKey, PointKey),

    /// The three points of an arc lie on a straight line.
    #[error("arc points are collinear")]
    CollinearArc,

    /// An edge does not share an endpoint with the chain it is appended to.
    #[error("edge {0:?} does not share an endpoint with the chain")]
    NonContiguous(EdgeKey),

    /// A composite edge must have at least one sub-edge.
    #[error("composite edge must have at least one sub-edge")]
    EmptyComposite,

    /// A composite edge cannot contain itself.
    #[error("composite edge {0:?} cannot contain itself")]
    RecursiveComposite(EdgeKey),

    /// The boundary of a face does not close on its first point.
    #[error("face boundary is open: last side ends away from the first side")]
    OpenBoundary,

    /// A face needs more boundary points/sides than given.
    #[error("face needs at least {required} boundary entries, got {given}")]
    TooFewPoints { required: usize, given: usize },

    /// The same point appears twice in a face boundary.
    #[error("point {0:?} appears twice in the face boundary")]
    RepeatedPoint(PointKey),

    /// A segmented line needs positive, finite segment lengths.
    #[error("segment lengths must be positive and finite")]
    InvalidLengths,

    /// The entity is still referenced by a higher-dimensional entity.
    #[error("entity {0:?} is still in use")]
    InUse(EntityKey),

    /// The entity already has mesh nodes and cannot be edited.
    #[error("entity {0:?} is already meshed")]
    AlreadyMeshed(EntityKey),

    /// Another entity already carries this name.
    #[error("duplicate entity name: {0}")]
    DuplicateName(String),
}

impl Error {
    /// The "not found" variant matching the key's entity type.
    pub(crate) fn not_found(key: EntityKey) -> Self {
        match key {
            EntityKey::Point(k) => Error::PointNotFound(k),
            EntityKey::Edge(k) => Error::EdgeNotFound(k),
            EntityKey::Face(k) => Error::FaceNotFound(k),
        }
    }
}
