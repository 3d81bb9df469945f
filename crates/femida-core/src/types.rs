// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Femida answer-sheet pipeline.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{FemidaError, Result};

/// Number of questions printed on the sheet.
pub const QUESTION_COUNT: u8 = 40;

/// Option label printed next to each bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Label {
    /// All labels in sheet order.
    pub const ALL: [Label; 6] = [Label::A, Label::B, Label::C, Label::D, Label::E, Label::F];

    /// Position of the label within [`Label::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
        }
    }

    /// Parse a label from its printed letter (case-insensitive).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'E' => Some(Self::E),
            'F' => Some(Self::F),
            _ => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Logical address of one bubble: a question number and an option label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    pub question: u8,
    pub label: Label,
}

impl Key {
    /// Build a key, rejecting questions outside `1..=40`.
    pub fn new(question: u8, label: Label) -> Result<Self> {
        if !(1..=QUESTION_COUNT).contains(&question) {
            return Err(FemidaError::Precondition(format!(
                "question {question} is outside 1..={QUESTION_COUNT}"
            )));
        }
        Ok(Self { question, label })
    }

    /// Build a key from a label letter, as printed on the sheet.
    pub fn from_char(question: u8, label: char) -> Result<Self> {
        let label = Label::from_char(label).ok_or_else(|| {
            FemidaError::Precondition(format!("label {label:?} is not one of A..F"))
        })?;
        Self::new(question, label)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.question, self.label)
    }
}

/// A rotated rectangle in image coordinates.
///
/// `center` is `(x, y)`, `delta` holds the extents along the rectangle's own
/// axes (`(width, height)` when `angle` is 0) and `angle` is in degrees. This
/// is the same convention the contour stage produces, so calibration boxes
/// and detected candidates can be compared directly.
///
/// Descriptors are immutable. Extents are stored as magnitudes and the angle
/// is normalised into `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryDescriptor {
    center: (f64, f64),
    delta: (f64, f64),
    angle: f64,
}

impl GeometryDescriptor {
    pub fn new(center: (f64, f64), delta: (f64, f64), angle: f64) -> Self {
        Self {
            center,
            delta: (delta.0.abs(), delta.1.abs()),
            angle: angle.rem_euclid(360.0),
        }
    }

    /// An unrotated rectangle.
    pub fn axis_aligned(center: (f64, f64), delta: (f64, f64)) -> Self {
        Self::new(center, delta, 0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn delta(&self) -> (f64, f64) {
        self.delta
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// A copy with both extents grown by the given amounts.
    pub fn inflated(&self, dw: f64, dh: f64) -> Self {
        Self::new(self.center, (self.delta.0 + dw, self.delta.1 + dh), self.angle)
    }

    /// The four corner points, in the order `cv::boxPoints` returns them:
    /// bottom-left, top-left, top-right, bottom-right for an unrotated box.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (cx, cy) = self.center;
        let (w, h) = self.delta;
        let theta = self.angle.to_radians();
        let b = theta.cos() * 0.5;
        let a = theta.sin() * 0.5;

        let p0 = (cx - a * h - b * w, cy + b * h - a * w);
        let p1 = (cx + a * h - b * w, cy - b * h - a * w);
        let p2 = (2.0 * cx - p0.0, 2.0 * cy - p0.1);
        let p3 = (2.0 * cx - p1.0, 2.0 * cy - p1.1);
        [p0, p1, p2, p3]
    }

    /// Axis-aligned pixel bounds of the rectangle.
    ///
    /// Corner points are truncated toward zero before taking the min/max, so
    /// an unrotated descriptor maps to `center ± delta / 2` truncated.
    pub fn to_slice(&self) -> PixelSlice {
        let corners = self.corners().map(|(x, y)| (x as i64, y as i64));
        let xs = corners.iter().map(|c| c.0);
        let ys = corners.iter().map(|c| c.1);
        let (x_min, x_max) = (xs.clone().min().unwrap_or(0), xs.max().unwrap_or(0));
        let (y_min, y_max) = (ys.clone().min().unwrap_or(0), ys.max().unwrap_or(0));
        PixelSlice {
            rows: y_min..y_max,
            cols: x_min..x_max,
        }
    }
}

/// Half-open row and column ranges into an image.
///
/// Bounds may lie outside the image; use [`PixelSlice::clamp_to`] before
/// reading pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSlice {
    pub rows: Range<i64>,
    pub cols: Range<i64>,
}

impl PixelSlice {
    pub fn height(&self) -> u32 {
        (self.rows.end - self.rows.start).max(0) as u32
    }

    pub fn width(&self) -> u32 {
        (self.cols.end - self.cols.start).max(0) as u32
    }

    /// Intersect with a `width x height` image.
    ///
    /// Returns `(x, y, w, h)` suitable for a crop, or `None` when nothing of
    /// the slice lies inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.cols.start.clamp(0, width as i64);
        let x1 = self.cols.end.clamp(0, width as i64);
        let y0 = self.rows.start.clamp(0, height as i64);
        let y1 = self.rows.end.clamp(0, height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}
