// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// femida-detect — Geometric pipeline for photographed answer sheets.
//
// Rectifies a photograph onto the canonical sheet using its four corner
// markers, extracts the 240 calibrated bubble regions as one normalised
// tensor, and validates the sheet's QR identity code.

pub mod calibration;
pub mod extract;
pub mod identity;
pub mod scan;
pub mod sheet;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export the primary entry points so callers can use `femida_detect::rectify` etc.
pub use calibration::{CANONICAL_HEIGHT, CANONICAL_WIDTH, CalibrationTable, geometry_for};
pub use extract::{RegionBatch, extract};
pub use identity::{IdentityPayload, parse_payload, validate};
pub use scan::{CandidateRectangle, SheetRectifier, find_rectangles, rectify};
pub use sheet::{AnswerSheet, SheetOptions, SheetSource, load_image};
