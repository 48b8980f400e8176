// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar primitives used by the topology engine.
//!
//! Azimuths, segment intersection and projection on `f64` coordinates.
//! Ring orientation, point location and rectangle tests come from `geo`;
//! what lives here needs exact endpoint coordinates or segment indices that
//! `geo` does not report. Coordinates are compared exactly: node and edge
//! endpoints must match bit for bit.

use std::f64::consts::TAU;

use geo::BoundingRect;
use geo_types::{Coord, LineString, Rect};
use nalgebra::Vector2;

#[inline]
pub(crate) fn v2(c: Coord<f64>) -> Vector2<f64> {
    Vector2::new(c.x, c.y)
}

#[inline]
fn coord(v: Vector2<f64>) -> Coord<f64> {
    Coord { x: v.x, y: v.y }
}

/// Clockwise bearing from north of the direction `a -> b`, in `[0, 2π)`.
///
/// Returns `None` for coincident points.
pub fn azimuth(a: Coord<f64>, b: Coord<f64>) -> Option<f64> {
    if a == b {
        return None;
    }
    let d = v2(b) - v2(a);
    let az = d.x.atan2(d.y);
    Some(if az < 0.0 { az + TAU } else { az })
}

/// Twice the signed area of triangle `abc`; positive when counter-clockwise.
#[inline]
pub fn orient(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    let ab = v2(b) - v2(a);
    let ac = v2(c) - v2(a);
    ab.perp(&ac)
}

#[inline]
fn within_box(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// True when `p` lies on the closed segment `ab`.
pub fn point_on_segment(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> bool {
    orient(a, b, p) == 0.0 && within_box(a, b, p)
}

/// Intersection of two closed segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentIntersection {
    None,
    Point(Coord<f64>),
    /// Collinear overlap of positive length, ordered along the first segment.
    Overlap(Coord<f64>, Coord<f64>),
}

/// Intersects segments `p1p2` and `q1q2`.
///
/// Intersections at segment endpoints are reported with the exact endpoint
/// coordinate so callers can compare them against node positions.
pub fn segment_intersection(
    p1: Coord<f64>,
    p2: Coord<f64>,
    q1: Coord<f64>,
    q2: Coord<f64>,
) -> SegmentIntersection {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    if d1 == 0.0 && d2 == 0.0 && d3 == 0.0 && d4 == 0.0 {
        return collinear_overlap(p1, p2, q1, q2);
    }

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        let r = v2(p2) - v2(p1);
        let s = v2(q2) - v2(q1);
        let t = (v2(q1) - v2(p1)).perp(&s) / r.perp(&s);
        return SegmentIntersection::Point(coord(v2(p1) + r * t));
    }

    if d1 == 0.0 && within_box(q1, q2, p1) {
        return SegmentIntersection::Point(p1);
    }
    if d2 == 0.0 && within_box(q1, q2, p2) {
        return SegmentIntersection::Point(p2);
    }
    if d3 == 0.0 && within_box(p1, p2, q1) {
        return SegmentIntersection::Point(q1);
    }
    if d4 == 0.0 && within_box(p1, p2, q2) {
        return SegmentIntersection::Point(q2);
    }
    SegmentIntersection::None
}

fn collinear_overlap(
    p1: Coord<f64>,
    p2: Coord<f64>,
    q1: Coord<f64>,
    q2: Coord<f64>,
) -> SegmentIntersection {
    let r = v2(p2) - v2(p1);
    let rr = r.dot(&r);
    let param = |c: Coord<f64>| {
        if rr == 0.0 {
            0.0
        } else {
            (v2(c) - v2(p1)).dot(&r) / rr
        }
    };

    let mut hits: Vec<(f64, Coord<f64>)> = Vec::with_capacity(4);
    for c in [p1, p2] {
        if within_box(q1, q2, c) {
            hits.push((param(c), c));
        }
    }
    for c in [q1, q2] {
        if within_box(p1, p2, c) {
            hits.push((param(c), c));
        }
    }
    if hits.is_empty() {
        return SegmentIntersection::None;
    }
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (first, last) = (hits[0].1, hits[hits.len() - 1].1);
    if first == last {
        SegmentIntersection::Point(first)
    } else {
        SegmentIntersection::Overlap(first, last)
    }
}

/// Closest point to `p` on segment `ab`, with its parameter in `[0, 1]`.
pub fn project_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> (Coord<f64>, f64) {
    let ab = v2(b) - v2(a);
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (a, 0.0);
    }
    let t = ((v2(p) - v2(a)).dot(&ab) / len2).clamp(0.0, 1.0);
    if t == 0.0 {
        (a, t)
    } else if t == 1.0 {
        (b, t)
    } else {
        (coord(v2(a) + ab * t), t)
    }
}

pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (v2(b) - v2(a)).norm()
}

/// Nearest location on a linestring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineProjection {
    pub point: Coord<f64>,
    /// Index of the segment holding `point`.
    pub segment: usize,
    pub distance: f64,
}

/// Projects `p` on `line`; the first segment wins ties.
pub fn project_on_line(line: &LineString<f64>, p: Coord<f64>) -> Option<LineProjection> {
    let pts = &line.0;
    match pts.len() {
        0 => None,
        1 => Some(LineProjection {
            point: pts[0],
            segment: 0,
            distance: distance(p, pts[0]),
        }),
        _ => {
            let mut best: Option<LineProjection> = None;
            for (i, w) in pts.windows(2).enumerate() {
                let (q, _) = project_on_segment(p, w[0], w[1]);
                let d = distance(p, q);
                if best.map_or(true, |b| d < b.distance) {
                    best = Some(LineProjection {
                        point: q,
                        segment: i,
                        distance: d,
                    });
                }
            }
            best
        }
    }
}

/// Distance from `p` to `line` (infinite for an empty line).
pub fn line_distance(line: &LineString<f64>, p: Coord<f64>) -> f64 {
    project_on_line(line, p).map_or(f64::INFINITY, |pr| pr.distance)
}

/// Minimum distance between two linestrings.
pub fn lines_distance(a: &LineString<f64>, b: &LineString<f64>) -> f64 {
    for sa in a.0.windows(2) {
        for sb in b.0.windows(2) {
            if segment_intersection(sa[0], sa[1], sb[0], sb[1]) != SegmentIntersection::None {
                return 0.0;
            }
        }
    }
    let ab = a.0.iter().map(|&p| line_distance(b, p));
    let ba = b.0.iter().map(|&p| line_distance(a, p));
    ab.chain(ba).fold(f64::INFINITY, f64::min)
}

/// True when `p` lies on some segment of `line`.
pub fn point_on_line(line: &LineString<f64>, p: Coord<f64>) -> bool {
    match line.0.len() {
        0 => false,
        1 => line.0[0] == p,
        _ => line.0.windows(2).any(|w| point_on_segment(w[0], w[1], p)),
    }
}

/// A vertex of `line` distinct from both endpoints, or the midpoint of the
/// endpoints when there is none. `None` if the endpoints coincide and no
/// other vertex exists.
pub fn interior_edge_point(line: &LineString<f64>) -> Option<Coord<f64>> {
    let pts = &line.0;
    let (first, last) = (*pts.first()?, *pts.last()?);
    if pts.len() > 2 {
        if let Some(&p) = pts[1..pts.len() - 1]
            .iter()
            .find(|&&p| p != first && p != last)
        {
            return Some(p);
        }
    }
    if first == last {
        return None;
    }
    Some(coord((v2(first) + v2(last)) * 0.5))
}

// ============================================================================
// Rectangles
// ============================================================================

pub fn line_bbox(line: &LineString<f64>) -> Option<Rect<f64>> {
    line.bounding_rect()
}

pub fn rect_union(a: &Rect<f64>, b: &Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Grows `r` by `d` on every side.
pub fn rect_expand(r: &Rect<f64>, d: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: r.min().x - d,
            y: r.min().y - d,
        },
        Coord {
            x: r.max().x + d,
            y: r.max().y + d,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{coord, line_string};
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn azimuth_is_clockwise_from_north() {
        let o = coord! { x: 0.0, y: 0.0 };
        assert_relative_eq!(azimuth(o, coord! { x: 0.0, y: 1.0 }).unwrap(), 0.0);
        assert_relative_eq!(
            azimuth(o, coord! { x: 1.0, y: 0.0 }).unwrap(),
            FRAC_PI_2
        );
        assert_relative_eq!(azimuth(o, coord! { x: 0.0, y: -1.0 }).unwrap(), PI);
        assert_relative_eq!(
            azimuth(o, coord! { x: -1.0, y: 0.0 }).unwrap(),
            3.0 * FRAC_PI_2
        );
        assert!(azimuth(o, o).is_none());
    }

    #[test]
    fn proper_crossing() {
        let r = segment_intersection(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 2.0, y: 2.0 },
            coord! { x: 0.0, y: 2.0 },
            coord! { x: 2.0, y: 0.0 },
        );
        assert_eq!(r, SegmentIntersection::Point(coord! { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn touching_reports_exact_endpoint() {
        let r = segment_intersection(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 10.0, y: 0.0 },
            coord! { x: 3.3, y: 0.0 },
            coord! { x: 3.3, y: 5.0 },
        );
        assert_eq!(r, SegmentIntersection::Point(coord! { x: 3.3, y: 0.0 }));
    }

    #[test]
    fn collinear_overlap_and_touch() {
        let r = segment_intersection(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 4.0, y: 0.0 },
            coord! { x: 6.0, y: 0.0 },
            coord! { x: 2.0, y: 0.0 },
        );
        assert_eq!(
            r,
            SegmentIntersection::Overlap(coord! { x: 2.0, y: 0.0 }, coord! { x: 4.0, y: 0.0 })
        );
        let r = segment_intersection(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 4.0, y: 0.0 },
            coord! { x: 4.0, y: 0.0 },
            coord! { x: 9.0, y: 0.0 },
        );
        assert_eq!(r, SegmentIntersection::Point(coord! { x: 4.0, y: 0.0 }));
        let r = segment_intersection(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 4.0, y: 0.0 },
            coord! { x: 5.0, y: 0.0 },
            coord! { x: 9.0, y: 0.0 },
        );
        assert_eq!(r, SegmentIntersection::None);
    }

    #[test]
    fn projection_clamps_to_segment() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)];
        let pr = project_on_line(&line, coord! { x: 4.0, y: 3.0 }).unwrap();
        assert_eq!(pr.point, coord! { x: 4.0, y: 0.0 });
        assert_eq!(pr.segment, 0);
        assert_relative_eq!(pr.distance, 3.0);
        let pr = project_on_line(&line, coord! { x: 12.0, y: 12.0 }).unwrap();
        assert_eq!(pr.point, coord! { x: 10.0, y: 10.0 });
    }

    #[test]
    fn interior_point_prefers_vertices() {
        let l = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 0.0)];
        assert_eq!(interior_edge_point(&l), Some(coord! { x: 1.0, y: 1.0 }));
        let l = line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0)];
        assert_eq!(interior_edge_point(&l), Some(coord! { x: 1.0, y: 0.0 }));
    }

    #[test]
    fn distance_between_lines() {
        let a = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let b = line_string![(x: 5.0, y: 2.0), (x: 5.0, y: 8.0)];
        assert_relative_eq!(lines_distance(&a, &b), 2.0);
        let c = line_string![(x: 5.0, y: -2.0), (x: 5.0, y: 8.0)];
        assert_relative_eq!(lines_distance(&a, &c), 0.0);
    }
}
