// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Femida.

use thiserror::Error;

/// Top-level error type for all Femida operations.
///
/// Every sheet-processing call is atomic: it either returns a complete value
/// or one of these errors, never a partially built image or batch.
#[derive(Debug, Error)]
pub enum FemidaError {
    // -- Geometry errors --
    #[error("expected at least 4 corner markers, found {found}")]
    InsufficientMarkers { found: usize },

    #[error("degenerate sheet geometry: {0}")]
    DegenerateGeometry(String),

    // -- Identity code errors --
    #[error("no machine-readable code found in the image")]
    CodeNotFound,

    #[error("found {count} machine-readable codes, expected exactly one")]
    MultipleCodes { count: usize },

    #[error("identity code payload is malformed: {0}")]
    CodeFormat(String),

    // -- Caller errors --
    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Surrounding I/O --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FemidaError>;
