// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diagnostic sink passed explicitly into reconciliation and meshing calls.
//!
//! Recoverable problems (conflicting division counts, repeated meshing
//! requests, quality warnings) are absorbed by the operation and recorded
//! here. Every entry is also emitted as a `tracing` event, so the subscriber
//! decides what reaches the log.

use crate::keys::EntityKey;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A division count request was clamped or overridden.
    Reconciliation,
    /// Opposite sides of a face disagree on their division count.
    NonConforming,
    /// The entity already has a mesh; the request was ignored.
    AlreadyMeshed,
    /// An I/J-specific request on a face with an odd side count.
    OddSideCount,
    /// Meshing requested on a face that is not four-sided.
    UnsupportedSideCount,
    /// An entity referenced by the operation no longer exists.
    MissingEntity,
    /// Zero-length edges, zero divisions and similar degenerate input.
    DegenerateGeometry,
    /// Element or face below the configured minimal area.
    LowQuality,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Reconciliation => "reconciliation",
            DiagnosticKind::NonConforming => "non_conforming",
            DiagnosticKind::AlreadyMeshed => "already_meshed",
            DiagnosticKind::OddSideCount => "odd_side_count",
            DiagnosticKind::UnsupportedSideCount => "unsupported_side_count",
            DiagnosticKind::MissingEntity => "missing_entity",
            DiagnosticKind::DegenerateGeometry => "degenerate_geometry",
            DiagnosticKind::LowQuality => "low_quality",
        }
    }
}

/// A single recorded diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub entity: Option<EntityKey>,
    pub message: String,
}

/// Ordered collection of diagnostics produced by one or more operations.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(
        &mut self,
        kind: DiagnosticKind,
        entity: Option<EntityKey>,
        message: impl Into<String>,
    ) {
        self.record(Severity::Info, kind, entity, message.into());
    }

    pub fn warn(
        &mut self,
        kind: DiagnosticKind,
        entity: Option<EntityKey>,
        message: impl Into<String>,
    ) {
        self.record(Severity::Warning, kind, entity, message.into());
    }

    pub fn error(
        &mut self,
        kind: DiagnosticKind,
        entity: Option<EntityKey>,
        message: impl Into<String>,
    ) {
        self.record(Severity::Error, kind, entity, message.into());
    }

    fn record(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        entity: Option<EntityKey>,
        message: String,
    ) {
        match severity {
            Severity::Info => {
                tracing::info!(kind = kind.as_str(), entity = ?entity, "{}", message)
            }
            Severity::Warning => {
                tracing::warn!(kind = kind.as_str(), entity = ?entity, "{}", message)
            }
            Severity::Error => {
                tracing::error!(kind = kind.as_str(), entity = ?entity, "{}", message)
            }
        }
        self.entries.push(Diagnostic {
            severity,
            kind,
            entity,
            message,
        });
    }

    /// All entries in the order they were recorded.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Entries at warning severity or above.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity >= Severity::Warning)
    }

    /// Number of entries of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
