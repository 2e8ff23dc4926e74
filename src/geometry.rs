// src/geometry.rs - Contour geometry: area, centroid, convex hull and convexity defects

use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use nalgebra::{Point2, Vector2};
use serde::Serialize;

#[inline]
fn to_point2(p: &Point<i32>) -> Point2<f64> {
    Point2::new(p.x as f64, p.y as f64)
}

/// Enclosed area of a closed polygon (shoelace formula)
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();

    (twice_area as f64 / 2.0).abs()
}

/// Area centroid of a closed polygon; falls back to the vertex mean when the area vanishes
pub fn polygon_centroid(points: &[Point<i32>]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }

    let mut signed_twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
        let cross = a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
        signed_twice_area += cross;
        cx += (a.x + b.x) as f64 * cross;
        cy += (a.y + b.y) as f64 * cross;
    }

    if signed_twice_area.abs() < f64::EPSILON {
        let n = points.len() as f64;
        let sx: f64 = points.iter().map(|p| p.x as f64).sum();
        let sy: f64 = points.iter().map(|p| p.y as f64).sum();
        return Some((sx / n, sy / n));
    }

    let factor = 1.0 / (3.0 * signed_twice_area);
    Some((cx * factor, cy * factor))
}

/// Indices into `contour` of its convex hull vertices, in ascending contour order.
///
/// A hull vertex visited more than once by the contour maps to its first occurrence.
pub fn hull_indices(contour: &[Point<i32>]) -> Vec<usize> {
    if contour.len() < 3 {
        return (0..contour.len()).collect();
    }

    let hull = convex_hull(contour);
    let mut indices: Vec<usize> = hull
        .iter()
        .filter_map(|h| contour.iter().position(|p| p == h))
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Convex hull polygon of `contour` in contour order
pub fn hull_points(contour: &[Point<i32>], indices: &[usize]) -> Vec<Point<i32>> {
    indices.iter().map(|&i| contour[i]).collect()
}

/// Perpendicular distance from `p` to the line through `a` and `b`
pub fn perpendicular_distance(p: &Point<i32>, a: &Point<i32>, b: &Point<i32>) -> f64 {
    let (p, a, b) = (to_point2(p), to_point2(a), to_point2(b));
    let chord: Vector2<f64> = b - a;
    let length = chord.norm();
    if length == 0.0 {
        return (p - a).norm();
    }
    let offset = p - a;
    (chord.x * offset.y - chord.y * offset.x).abs() / length
}

/// A stretch of contour between two consecutive hull vertices that dips inside the hull
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvexityDefect {
    /// Contour index where the contour leaves the hull
    pub start: usize,
    /// Contour index where it rejoins the hull
    pub end: usize,
    /// Contour index of the point deepest inside the hull
    pub farthest: usize,
    /// Perpendicular distance from `farthest` to the hull chord
    pub depth: f64,
}

/// All convexity defects of `contour` with positive depth
pub fn convexity_defects(contour: &[Point<i32>], hull: &[usize]) -> Vec<ConvexityDefect> {
    let n = contour.len();
    if hull.len() < 3 || n < 4 {
        return Vec::new();
    }

    let mut defects = Vec::new();
    for (k, &start) in hull.iter().enumerate() {
        let end = hull[(k + 1) % hull.len()];
        let span = (end + n - start) % n;
        if span < 2 {
            continue;
        }

        let mut deepest: Option<(usize, f64)> = None;
        for step in 1..span {
            let idx = (start + step) % n;
            let depth = perpendicular_distance(&contour[idx], &contour[start], &contour[end]);
            if deepest.map_or(true, |(_, d)| depth > d) {
                deepest = Some((idx, depth));
            }
        }

        if let Some((farthest, depth)) = deepest {
            if depth > 0.0 {
                defects.push(ConvexityDefect { start, end, farthest, depth });
            }
        }
    }

    defects
}

/// Deepest defect; on equal depth the first in contour order is kept
pub fn deepest_defect(defects: &[ConvexityDefect]) -> Option<ConvexityDefect> {
    defects.iter().fold(None, |best: Option<ConvexityDefect>, d| match best {
        Some(b) if b.depth >= d.depth => Some(b),
        _ => Some(*d),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn pts(coords: &[(i32, i32)]) -> Vec<Point<i32>> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn square_area_and_centroid() {
        let square = pts(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        assert_approx_eq!(polygon_area(&square), 100.0);
        let (cx, cy) = polygon_centroid(&square).unwrap();
        assert_approx_eq!(cx, 5.0);
        assert_approx_eq!(cy, 5.0);
    }

    #[test]
    fn area_ignores_orientation() {
        let ccw = pts(&[(0, 0), (0, 4), (3, 4), (3, 0)]);
        assert_approx_eq!(polygon_area(&ccw), 12.0);
    }

    #[test]
    fn degenerate_centroid_uses_vertex_mean() {
        let line = pts(&[(0, 0), (4, 0)]);
        assert_eq!(polygon_centroid(&line), Some((2.0, 0.0)));
        assert_eq!(polygon_centroid(&[]), None);
    }

    #[test]
    fn perpendicular_distance_to_horizontal_chord() {
        let d = perpendicular_distance(&Point::new(5, 7), &Point::new(0, 0), &Point::new(10, 0));
        assert_approx_eq!(d, 7.0);
        let same = perpendicular_distance(&Point::new(3, 4), &Point::new(0, 0), &Point::new(0, 0));
        assert_approx_eq!(same, 5.0);
    }

    #[test]
    fn convex_polygon_has_no_defects() {
        let square = pts(&[(0, 0), (5, 0), (10, 0), (10, 10), (0, 10)]);
        let hull = hull_indices(&square);
        assert!(convexity_defects(&square, &hull).is_empty());
    }

    #[test]
    fn notch_defect_reports_true_depth() {
        let notched = pts(&[(0, 0), (40, 0), (50, 30), (60, 0), (100, 0), (100, 100), (0, 100)]);
        let hull = hull_indices(&notched);
        let defects = convexity_defects(&notched, &hull);
        assert_eq!(defects.len(), 1);
        let defect = defects[0];
        assert_eq!(notched[defect.farthest], Point::new(50, 30));
        assert_approx_eq!(defect.depth, 30.0);
    }

    #[test]
    fn deepest_defect_picks_maximum() {
        let a = ConvexityDefect { start: 0, end: 2, farthest: 1, depth: 3.0 };
        let b = ConvexityDefect { start: 2, end: 5, farthest: 3, depth: 8.0 };
        let c = ConvexityDefect { start: 5, end: 7, farthest: 6, depth: 8.0 };
        assert_eq!(deepest_defect(&[a, b, c]), Some(b));
        assert_eq!(deepest_defect(&[]), None);
    }
}
