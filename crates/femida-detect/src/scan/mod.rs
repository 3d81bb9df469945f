// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — rectangle finding on raw photographs and perspective
// rectification onto the canonical sheet.

pub mod geometry;
pub mod rectangles;
pub mod rectify;

pub use rectangles::{CandidateRectangle, find_rectangles};
pub use rectify::{Anchors, SheetRectifier, rectify, select_anchors};
