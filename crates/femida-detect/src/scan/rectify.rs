// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet rectifier — locates the four corner markers, warps the photograph
// through the projective transform they define, and normalises the result
// to the canonical sheet size.

use std::cmp::Ordering;

use femida_core::config::DetectConfig;
use femida_core::error::{FemidaError, Result};
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument, warn};

use super::rectangles::{CandidateRectangle, find_rectangles};
use crate::calibration::{CANONICAL_HEIGHT, CANONICAL_WIDTH};

/// Centres of the four corner markers of one photograph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    pub top_left: (f64, f64),
    pub bottom_right: (f64, f64),
    pub bottom_left: (f64, f64),
    pub top_right: (f64, f64),
}

impl Anchors {
    /// Anchors in the order the destination corners are listed:
    /// top-left, bottom-right, bottom-left, top-right.
    pub fn points(&self) -> [(f64, f64); 4] {
        [self.top_left, self.bottom_right, self.bottom_left, self.top_right]
    }
}

/// Rectify a raw photograph with the default configuration.
pub fn rectify(raw: &RgbImage) -> Result<RgbImage> {
    SheetRectifier::default().rectify(raw)
}

/// Perspective correction driven by the printed corner markers.
#[derive(Debug, Clone, Default)]
pub struct SheetRectifier {
    config: DetectConfig,
}

impl SheetRectifier {
    pub fn with_config(config: DetectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Rectify a raw photograph into a `CANONICAL_WIDTH x CANONICAL_HEIGHT`
    /// sheet.
    ///
    /// ## Pipeline
    ///
    /// 1. Find marker candidates with the marker policy
    /// 2. Pick the four anchors by extremal `x + y` / `x - y`
    /// 3. Reject collinear or coincident anchors
    /// 4. Map the anchors onto a `large x small` canvas, where `large` and
    ///    `small` are the photograph's longer and shorter sides
    /// 5. Warp, then resize to the canonical size
    ///
    /// The anchor heuristic assumes the sheet is only mildly rotated in the
    /// photograph; a sheet turned by 45° or more picks the wrong corners.
    #[instrument(skip_all, fields(width = raw.width(), height = raw.height()))]
    pub fn rectify(&self, raw: &RgbImage) -> Result<RgbImage> {
        let anchors = self.locate_anchors(raw)?;

        let large = raw.width().max(raw.height());
        let small = raw.width().min(raw.height());
        self.check_anchors(&anchors, large, small)?;

        let src = anchors.points().map(|(x, y)| (x as f32, y as f32));
        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),
            (large as f32, small as f32),
            (0.0, small as f32),
            (large as f32, 0.0),
        ];

        let projection = Projection::from_control_points(src, dest).ok_or_else(|| {
            FemidaError::DegenerateGeometry(
                "corner markers do not define a projective transform".into(),
            )
        })?;

        let mut warped = RgbImage::new(large, small);
        warp_into(raw, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut warped);
        debug!(large, small, "Perspective warp applied");

        let rectified = image::imageops::resize(
            &warped,
            CANONICAL_WIDTH,
            CANONICAL_HEIGHT,
            FilterType::Triangle,
        );
        info!(
            width = CANONICAL_WIDTH,
            height = CANONICAL_HEIGHT,
            "Sheet rectified"
        );
        Ok(rectified)
    }

    /// Find the four corner-marker centres in a raw photograph.
    pub fn locate_anchors(&self, raw: &RgbImage) -> Result<Anchors> {
        let candidates = find_rectangles(raw, &self.config.marker);
        if candidates.len() < 4 {
            warn!(found = candidates.len(), "Not enough corner markers");
        }
        let anchors = select_anchors(&candidates)?;
        debug!(
            top_left = ?anchors.top_left,
            bottom_right = ?anchors.bottom_right,
            bottom_left = ?anchors.bottom_left,
            top_right = ?anchors.top_right,
            "Anchors selected"
        );
        Ok(anchors)
    }

    /// Reject anchor sets that cannot define a homography: coincident points
    /// or any three (nearly) collinear.
    fn check_anchors(&self, anchors: &Anchors, large: u32, small: u32) -> Result<()> {
        let points = anchors.points();
        for i in 0..4 {
            for j in i + 1..4 {
                if points[i] == points[j] {
                    return Err(FemidaError::DegenerateGeometry(format!(
                        "two anchors coincide at {:?}",
                        points[i]
                    )));
                }
            }
        }

        let min_area = self.config.degenerate_area_ratio * large as f64 * small as f64;
        for skip in 0..4 {
            let tri: Vec<(f64, f64)> = (0..4).filter(|&k| k != skip).map(|k| points[k]).collect();
            let area = triangle_area(tri[0], tri[1], tri[2]);
            if area < min_area {
                return Err(FemidaError::DegenerateGeometry(format!(
                    "anchors {:?} are collinear (area {area:.3})",
                    tri
                )));
            }
        }
        Ok(())
    }
}

/// Pick the four anchors from marker candidates by independent extrema over
/// their centres: min/max of `x + y` and min/max of `x - y`.
///
/// Ties are broken by the centre coordinates, so the result never depends on
/// the order of `candidates`.
pub fn select_anchors(candidates: &[CandidateRectangle]) -> Result<Anchors> {
    if candidates.len() < 4 {
        return Err(FemidaError::InsufficientMarkers {
            found: candidates.len(),
        });
    }

    let sum = |(x, y): (f64, f64)| x + y;
    let diff = |(x, y): (f64, f64)| x - y;

    Ok(Anchors {
        top_left: extreme(candidates, sum, Ordering::Less)?,
        bottom_right: extreme(candidates, sum, Ordering::Greater)?,
        bottom_left: extreme(candidates, diff, Ordering::Less)?,
        top_right: extreme(candidates, diff, Ordering::Greater)?,
    })
}

/// Centre that is smallest (`Less`) or largest (`Greater`) under `score`,
/// falling back to lexicographic `(x, y)` on equal scores.
fn extreme(
    candidates: &[CandidateRectangle],
    score: impl Fn((f64, f64)) -> f64,
    want: Ordering,
) -> Result<(f64, f64)> {
    let key = |c: (f64, f64)| (score(c), c.0, c.1);
    let cmp = |a: &(f64, f64), b: &(f64, f64)| {
        let (ka, kb) = (key(*a), key(*b));
        ka.0.total_cmp(&kb.0)
            .then(ka.1.total_cmp(&kb.1))
            .then(ka.2.total_cmp(&kb.2))
    };

    let centers = candidates.iter().map(CandidateRectangle::center);
    let best = match want {
        Ordering::Greater => centers.max_by(cmp),
        _ => centers.min_by(cmp),
    };
    best.ok_or(FemidaError::InsufficientMarkers { found: 0 })
}

fn triangle_area(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    ((b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)).abs() / 2.0
}

#[cfg(test)]
mod tests {
    use femida_core::types::GeometryDescriptor;

    use super::*;
    use crate::test_utils::{BLACK, fill, marker_sheet, white};

    fn candidate(x: f64, y: f64) -> CandidateRectangle {
        CandidateRectangle {
            geometry: GeometryDescriptor::axis_aligned((x, y), (60.0, 60.0)),
            contour: Vec::new(),
            brightness: 20.0,
        }
    }

    #[test]
    fn anchors_are_geometric_extrema() {
        let candidates = vec![
            candidate(900.0, 60.0),
            candidate(55.0, 640.0),
            candidate(500.0, 350.0),
            candidate(40.0, 45.0),
            candidate(950.0, 655.0),
        ];
        let anchors = select_anchors(&candidates).unwrap();
        assert_eq!(anchors.top_left, (40.0, 45.0));
        assert_eq!(anchors.bottom_right, (950.0, 655.0));
        assert_eq!(anchors.bottom_left, (55.0, 640.0));
        assert_eq!(anchors.top_right, (900.0, 60.0));

        let mut reversed = candidates.clone();
        reversed.reverse();
        assert_eq!(select_anchors(&reversed).unwrap(), anchors);
    }

    #[test]
    fn ties_resolve_independently_of_order() {
        // (10, 0) and (0, 10) tie on x + y.
        let candidates = vec![
            candidate(10.0, 0.0),
            candidate(0.0, 10.0),
            candidate(100.0, 100.0),
            candidate(100.0, 0.0),
        ];
        let forward = select_anchors(&candidates).unwrap();
        let mut reversed = candidates.clone();
        reversed.reverse();
        assert_eq!(select_anchors(&reversed).unwrap(), forward);
        assert_eq!(forward.top_left, (0.0, 10.0));
    }

    #[test]
    fn fewer_than_four_candidates_is_insufficient() {
        let candidates = vec![candidate(0.0, 0.0), candidate(10.0, 10.0), candidate(5.0, 1.0)];
        assert!(matches!(
            select_anchors(&candidates),
            Err(FemidaError::InsufficientMarkers { found: 3 })
        ));
    }

    #[test]
    fn blank_photo_has_no_markers() {
        let raw = white(400, 300);
        assert!(matches!(
            rectify(&raw),
            Err(FemidaError::InsufficientMarkers { found: 0 })
        ));
    }

    #[test]
    fn collinear_anchors_are_degenerate() {
        let rectifier = SheetRectifier::default();
        let anchors = select_anchors(&[
            candidate(0.0, 0.0),
            candidate(10.0, 10.0),
            candidate(20.0, 20.0),
            candidate(30.0, 30.0),
        ])
        .unwrap();
        assert!(matches!(
            rectifier.check_anchors(&anchors, 1000, 700),
            Err(FemidaError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn collinear_marker_row_is_degenerate() {
        // Four markers on one horizontal line: every x ± y extreme lands on
        // the same line.
        let mut raw = white(800, 300);
        for x0 in [40, 240, 440, 640] {
            fill(&mut raw, x0, 120, 60, BLACK);
        }
        assert!(matches!(
            rectify(&raw),
            Err(FemidaError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn rectify_maps_markers_to_canonical_corners() {
        let raw = marker_sheet(1000, 700);
        let rectified = rectify(&raw).unwrap();
        assert_eq!(rectified.dimensions(), (CANONICAL_WIDTH, CANONICAL_HEIGHT));

        let (w, h) = rectified.dimensions();
        for (x, y) in [(8, 8), (w - 9, 8), (8, h - 9), (w - 9, h - 9)] {
            let p = rectified.get_pixel(x, y);
            assert!(p.0.iter().all(|&c| c < 60), "corner ({x}, {y}) = {p:?}");
        }

        // Well inside the markers' reach the sheet is paper white.
        for (x, y) in [(w / 2, h / 2), (200, h / 2), (w / 2, 400)] {
            let p = rectified.get_pixel(x, y);
            assert!(p.0.iter().all(|&c| c > 240), "interior ({x}, {y}) = {p:?}");
        }
    }

    #[test]
    fn rectify_is_deterministic() {
        let raw = marker_sheet(640, 480);
        let first = rectify(&raw).unwrap();
        let second = rectify(&raw).unwrap();
        assert!(first == second);
    }
}
