// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectangle finder — edge → contour → filter pipeline shared by corner-marker
// detection and the auxiliary box search.

use femida_core::config::RectanglePolicy;
use femida_core::types::GeometryDescriptor;
use image::{GrayImage, RgbImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use imageproc::morphology::close;
use imageproc::point::Point;
use tracing::{debug, info, instrument, trace};

use super::geometry::{compress_chain, min_area_rect};

/// Fixed 3x3 Gaussian (sigma 0.8), applied separably.
const GAUSSIAN_3X3: &[f32] = &[0.25, 0.5, 0.25];

/// Canny hysteresis thresholds tuned for printed markers on paper.
const CANNY_LOW: f32 = 10.0;
const CANNY_HIGH: f32 = 250.0;

/// LInf radius of the closing element: a 7x7 square.
const CLOSE_RADIUS: u8 = 3;

/// A channel value at or above this counts as paper white.
const NEAR_WHITE: u8 = 230;

/// One rectangle that survived the policy filters.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRectangle {
    /// Rotated rectangle, already grown by the policy margin.
    pub geometry: GeometryDescriptor,
    /// Corner points of the source contour after chain compression.
    pub contour: Vec<Point<i32>>,
    /// Near-white score (0..=255) inside the rectangle's bounding box.
    pub brightness: f64,
}

impl CandidateRectangle {
    pub fn center(&self) -> (f64, f64) {
        self.geometry.center()
    }
}

/// Find every rectangle in `image` that the policy accepts.
///
/// The order of the result follows contour discovery and carries no meaning;
/// callers select candidates by geometry only.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn find_rectangles(image: &RgbImage, policy: &RectanglePolicy) -> Vec<CandidateRectangle> {
    let closed = edge_map(image);

    let contours = find_contours::<i32>(&closed);
    let total = contours.len();

    let mut accepted = Vec::new();
    for contour in contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    {
        let chain = compress_chain(&contour.points);
        let Some(rect) = min_area_rect(&chain) else {
            continue;
        };

        let (w, h) = rect.delta();
        if !(w > policy.min_width && h > policy.min_height) {
            continue;
        }

        let Some(brightness) = near_white_score(image, &rect) else {
            trace!(center = ?rect.center(), "Candidate crop is empty");
            continue;
        };
        if !policy.brightness.accepts(brightness) {
            trace!(center = ?rect.center(), brightness, "Candidate rejected by brightness");
            continue;
        }

        let (cx, cy) = rect.center();
        if !(policy.x_window.contains(cx) && policy.y_window.contains(cy)) {
            trace!(cx, cy, "Candidate outside search window");
            continue;
        }

        let geometry = if policy.margin > 0.0 {
            rect.inflated(policy.margin, policy.margin)
        } else {
            rect
        };

        accepted.push(CandidateRectangle {
            geometry,
            contour: chain,
            brightness,
        });
    }

    info!(contours = total, accepted = accepted.len(), "Rectangle search complete");
    accepted
}

/// Grayscale → 3x3 Gaussian → Canny → 7x7 closing.
fn edge_map(image: &RgbImage) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    let blurred: GrayImage = separable_filter_equal(&gray, GAUSSIAN_3X3);
    let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
    debug!("Canny edge detection complete");
    close(&edges, Norm::LInf, CLOSE_RADIUS)
}

/// Mean of a 0/255 mask of near-white pixels inside the rectangle's
/// axis-aligned bounding box. `None` when the box misses the image.
pub fn near_white_score(image: &RgbImage, rect: &GeometryDescriptor) -> Option<f64> {
    let (x, y, w, h) = rect.to_slice().clamp_to(image.width(), image.height())?;

    let mut white = 0u64;
    for py in y..y + h {
        for px in x..x + w {
            let pixel = image.get_pixel(px, py);
            if pixel.0.iter().all(|&c| c >= NEAR_WHITE) {
                white += 1;
            }
        }
    }

    let total = w as u64 * h as u64;
    Some(255.0 * white as f64 / total as f64)
}
