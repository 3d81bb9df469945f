// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour geometry — chain compression and minimum-area rotated rectangles.

use femida_core::types::GeometryDescriptor;
use imageproc::geometry::convex_hull;
use imageproc::point::Point;

/// Drop every contour point that lies on a straight run between its
/// neighbours, keeping only the points where the chain changes direction.
///
/// Contours from `find_contours` are closed pixel chains, so the first and
/// last points are neighbours.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |a: Point<i32>, b: Point<i32>| ((b.x - a.x).signum(), (b.y - a.y).signum());
    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if kept.is_empty() {
        // A straight closed chain only happens for degenerate one-line
        // contours; keep its end points.
        vec![points[0], points[n - 1]]
    } else {
        kept
    }
}

/// Minimum-area enclosing rectangle of a point set (rotating calipers over
/// the convex hull).
///
/// The returned angle is in `[0, 90)`; extents are swapped accordingly, so
/// an axis-aligned box always reports angle 0 with `(width, height)`.
pub fn min_area_rect(points: &[Point<i32>]) -> Option<GeometryDescriptor> {
    if points.is_empty() {
        return None;
    }

    let hull: Vec<(f64, f64)> = convex_hull(points)
        .into_iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect();

    if hull.len() < 3 {
        return Some(bounding_box(&hull));
    }

    let mut best: Option<(f64, GeometryDescriptor)> = None;
    for i in 0..hull.len() {
        let (ax, ay) = hull[i];
        let (bx, by) = hull[(i + 1) % hull.len()];
        let len = (bx - ax).hypot(by - ay);
        if len == 0.0 {
            continue;
        }
        let u = ((bx - ax) / len, (by - ay) / len);
        let v = (-u.1, u.0);

        let (mut u_min, mut u_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut v_min, mut v_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(px, py) in &hull {
            let pu = px * u.0 + py * u.1;
            let pv = px * v.0 + py * v.1;
            u_min = u_min.min(pu);
            u_max = u_max.max(pu);
            v_min = v_min.min(pv);
            v_max = v_max.max(pv);
        }

        let area = (u_max - u_min) * (v_max - v_min);
        if best.as_ref().is_some_and(|(best_area, _)| *best_area <= area) {
            continue;
        }

        let cu = (u_min + u_max) / 2.0;
        let cv = (v_min + v_max) / 2.0;
        let center = (cu * u.0 + cv * v.0, cu * u.1 + cv * v.1);
        let angle = u.1.atan2(u.0).to_degrees();
        best = Some((
            area,
            canonical_rect(center, (u_max - u_min, v_max - v_min), angle),
        ));
    }

    best.map(|(_, rect)| rect).or_else(|| Some(bounding_box(&hull)))
}

/// Fold the angle into `[0, 90)`, swapping extents on quarter turns.
fn canonical_rect(center: (f64, f64), size: (f64, f64), angle: f64) -> GeometryDescriptor {
    let mut angle = angle.rem_euclid(180.0);
    let mut size = size;
    if angle >= 90.0 {
        angle -= 90.0;
        size = (size.1, size.0);
    }
    // Snap float noise so axis-aligned contours report exactly 0.
    if angle < 1e-9 || 90.0 - angle < 1e-9 {
        if angle > 45.0 {
            size = (size.1, size.0);
        }
        angle = 0.0;
    }
    GeometryDescriptor::new(center, size, angle)
}

fn bounding_box(points: &[(f64, f64)]) -> GeometryDescriptor {
    let (x_min, x_max, y_min, y_max) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |acc, &(x, y)| (acc.0.min(x), acc.1.max(x), acc.2.min(y), acc.3.max(y)),
    );
    GeometryDescriptor::axis_aligned(
        ((x_min + x_max) / 2.0, (y_min + y_max) / 2.0),
        (x_max - x_min, y_max - y_min),
    )
}
