// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry predicate port.
//!
//! Every geometric test the engine needs goes through [`GeometryEngine`].
//! [`PlanarEngine`] is the default implementation; a host can inject its own
//! (for example one backed by a robust-predicates kernel) through
//! [`Topology::with_engine`](crate::Topology::with_engine).

use geo::coordinate_position::{coord_pos_relative_to_ring, CoordPos, CoordinatePosition};
use geo::{InteriorPoint, RemoveRepeatedPoints};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};

use crate::geometry::{
    distance, point_on_line, point_on_segment, project_on_line, segment_intersection, v2,
    LineProjection, SegmentIntersection,
};
use crate::polygonize;

/// How a candidate line meets an existing one, boundaries being the two
/// endpoints of each line (closed lines included).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineRelation {
    /// Interiors do not meet.
    InteriorsDisjoint,
    /// Same point set and same endpoints.
    Equal,
    /// Interiors share a linear piece.
    Overlaps,
    /// Interiors meet at a point.
    Crosses(Coord<f64>),
}

/// Computational geometry operations consumed by the engine.
pub trait GeometryEngine {
    /// Linestring has no self-intersection other than a closing endpoint.
    fn is_simple(&self, line: &LineString<f64>) -> bool;

    fn relate_lines(&self, candidate: &LineString<f64>, existing: &LineString<f64>)
        -> LineRelation;

    /// Point lies on the line and is not one of its endpoints.
    fn line_contains_point(&self, line: &LineString<f64>, p: Coord<f64>) -> bool;

    /// Point strictly inside the polygon.
    fn polygon_contains_point(&self, poly: &Polygon<f64>, p: Coord<f64>) -> bool;

    /// Point inside or on the boundary of the polygon.
    fn polygon_covers_point(&self, poly: &Polygon<f64>, p: Coord<f64>) -> bool;

    /// Point strictly inside the area enclosed by a possibly self-intersecting
    /// closed ring (non-zero winding rule).
    fn ring_area_contains_point(&self, ring: &LineString<f64>, p: Coord<f64>) -> bool;

    /// Polygons enclosed by noded linework.
    fn build_area(&self, lines: &[LineString<f64>]) -> MultiPolygon<f64>;

    /// Splits `line` at `p`, which must lie on its interior.
    fn split_line(
        &self,
        line: &LineString<f64>,
        p: Coord<f64>,
    ) -> Option<(LineString<f64>, LineString<f64>)>;

    fn project_point(&self, line: &LineString<f64>, p: Coord<f64>) -> Option<LineProjection>;

    fn point_on_surface(&self, poly: &Polygon<f64>) -> Option<Coord<f64>>;

    /// Snaps `line` vertices to `reference` points within `tol`, and inserts
    /// reference points lying within `tol` of a segment.
    fn snap_line(
        &self,
        line: &LineString<f64>,
        reference: &[Coord<f64>],
        tol: f64,
    ) -> LineString<f64>;

    /// Cuts `line` where it meets itself, any of `others`, or any of
    /// `points`, returning the pieces in line order.
    fn node_line(
        &self,
        line: &LineString<f64>,
        others: &[LineString<f64>],
        points: &[Coord<f64>],
    ) -> Vec<LineString<f64>>;
}

/// Default geometry engine working on exact `f64` coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarEngine;

impl GeometryEngine for PlanarEngine {
    fn is_simple(&self, line: &LineString<f64>) -> bool {
        let pts = line.remove_repeated_points().0;
        if pts.len() < 2 {
            return false;
        }
        let nseg = pts.len() - 1;
        let closed = pts[0] == pts[nseg];
        for i in 0..nseg {
            for j in (i + 1)..nseg {
                let hit = segment_intersection(pts[i], pts[i + 1], pts[j], pts[j + 1]);
                let allowed = if j == i + 1 {
                    Some(pts[j])
                } else if closed && i == 0 && j == nseg - 1 {
                    Some(pts[0])
                } else {
                    None
                };
                match hit {
                    SegmentIntersection::None => {}
                    SegmentIntersection::Point(p) if Some(p) == allowed => {}
                    _ => return false,
                }
            }
        }
        // a two-segment closed line doubles back on itself
        !(closed && nseg < 3)
    }

    fn relate_lines(
        &self,
        candidate: &LineString<f64>,
        existing: &LineString<f64>,
    ) -> LineRelation {
        let a = &candidate.0;
        let b = &existing.0;
        let (Some(&a0), Some(&an), Some(&b0), Some(&bn)) = (a.first(), a.last(), b.first(), b.last())
        else {
            return LineRelation::InteriorsDisjoint;
        };
        let boundary = |p: Coord<f64>| p == a0 || p == an || p == b0 || p == bn;

        let mut overlap = false;
        let mut crossing: Option<Coord<f64>> = None;
        for sa in a.windows(2) {
            for sb in b.windows(2) {
                match segment_intersection(sa[0], sa[1], sb[0], sb[1]) {
                    SegmentIntersection::None => {}
                    SegmentIntersection::Point(p) => {
                        if crossing.is_none() && !boundary(p) {
                            crossing = Some(p);
                        }
                    }
                    SegmentIntersection::Overlap(..) => overlap = true,
                }
            }
        }

        if overlap {
            let same_ends = (a0 == b0 && an == bn) || (a0 == bn && an == b0);
            if same_ends && line_covered_by(a, b) && line_covered_by(b, a) {
                return LineRelation::Equal;
            }
            return LineRelation::Overlaps;
        }
        match crossing {
            Some(p) => LineRelation::Crosses(p),
            None => LineRelation::InteriorsDisjoint,
        }
    }

    fn line_contains_point(&self, line: &LineString<f64>, p: Coord<f64>) -> bool {
        match (line.0.first(), line.0.last()) {
            (Some(&first), Some(&last)) if p != first && p != last => point_on_line(line, p),
            _ => false,
        }
    }

    fn polygon_contains_point(&self, poly: &Polygon<f64>, p: Coord<f64>) -> bool {
        poly.coordinate_position(&p) == CoordPos::Inside
    }

    fn polygon_covers_point(&self, poly: &Polygon<f64>, p: Coord<f64>) -> bool {
        poly.coordinate_position(&p) != CoordPos::Outside
    }

    fn ring_area_contains_point(&self, ring: &LineString<f64>, p: Coord<f64>) -> bool {
        coord_pos_relative_to_ring(p, ring) == CoordPos::Inside
    }

    fn build_area(&self, lines: &[LineString<f64>]) -> MultiPolygon<f64> {
        polygonize::build_area(lines)
    }

    fn split_line(
        &self,
        line: &LineString<f64>,
        p: Coord<f64>,
    ) -> Option<(LineString<f64>, LineString<f64>)> {
        let pts = &line.0;
        if pts.len() < 2 || p == pts[0] || p == pts[pts.len() - 1] {
            return None;
        }
        let proj = project_on_line(line, p)?;
        if proj.distance > 0.0 {
            return None;
        }
        let i = proj.segment;
        let mut first: Vec<Coord<f64>> = pts[..=i].to_vec();
        let mut second: Vec<Coord<f64>> = Vec::with_capacity(pts.len() - i + 1);
        if p == pts[i + 1] {
            first.push(p);
            second.extend_from_slice(&pts[i + 1..]);
        } else {
            if first.last() != Some(&p) {
                first.push(p);
            }
            second.push(p);
            second.extend_from_slice(&pts[i + 1..]);
        }
        Some((LineString::new(first), LineString::new(second)))
    }

    fn project_point(&self, line: &LineString<f64>, p: Coord<f64>) -> Option<LineProjection> {
        project_on_line(line, p)
    }

    fn point_on_surface(&self, poly: &Polygon<f64>) -> Option<Coord<f64>> {
        poly.interior_point().map(|p| p.0)
    }

    fn snap_line(
        &self,
        line: &LineString<f64>,
        reference: &[Coord<f64>],
        tol: f64,
    ) -> LineString<f64> {
        let mut pts: Vec<Coord<f64>> = line
            .0
            .iter()
            .map(|&c| {
                reference
                    .iter()
                    .copied()
                    .map(|r| (r, distance(c, r)))
                    .filter(|&(_, d)| d <= tol)
                    .min_by(|x, y| x.1.total_cmp(&y.1))
                    .map_or(c, |(r, _)| r)
            })
            .collect();

        for &r in reference {
            if pts.contains(&r) || pts.len() < 2 {
                continue;
            }
            let path = LineString::new(pts.clone());
            if let Some(proj) = project_on_line(&path, r) {
                let seg = proj.segment;
                if proj.distance <= tol && proj.point != pts[seg] && proj.point != pts[seg + 1] {
                    pts.insert(seg + 1, r);
                }
            }
        }
        LineString::new(pts).remove_repeated_points()
    }

    fn node_line(
        &self,
        line: &LineString<f64>,
        others: &[LineString<f64>],
        points: &[Coord<f64>],
    ) -> Vec<LineString<f64>> {
        let pts = line.remove_repeated_points().0;
        if pts.len() < 2 {
            return Vec::new();
        }
        let nseg = pts.len() - 1;
        let closed = pts[0] == pts[nseg];
        let mut cut_vertex = vec![false; pts.len()];
        let mut cuts: Vec<Vec<(f64, Coord<f64>)>> = vec![Vec::new(); nseg];

        let mut record = |i: usize, c: Coord<f64>, cut_vertex: &mut Vec<bool>| {
            let (a, b) = (pts[i], pts[i + 1]);
            if c == a {
                cut_vertex[i] = true;
            } else if c == b {
                cut_vertex[i + 1] = true;
            } else {
                let ab = v2(b) - v2(a);
                let t = (v2(c) - v2(a)).dot(&ab)
                    / ab.norm_squared();
                cuts[i].push((t, c));
            }
        };

        for i in 0..nseg {
            for j in 0..nseg {
                if i == j {
                    continue;
                }
                let adjacent = j + 1 == i
                    || i + 1 == j
                    || (closed && ((i == 0 && j == nseg - 1) || (j == 0 && i == nseg - 1)));
                match segment_intersection(pts[i], pts[i + 1], pts[j], pts[j + 1]) {
                    SegmentIntersection::None => {}
                    SegmentIntersection::Point(p) => {
                        let shared = p == pts[i] || p == pts[i + 1];
                        if !(adjacent && shared && (p == pts[j] || p == pts[j + 1])) {
                            record(i, p, &mut cut_vertex);
                        }
                    }
                    SegmentIntersection::Overlap(p, q) => {
                        record(i, p, &mut cut_vertex);
                        record(i, q, &mut cut_vertex);
                    }
                }
            }
            for other in others {
                for w in other.0.windows(2) {
                    match segment_intersection(pts[i], pts[i + 1], w[0], w[1]) {
                        SegmentIntersection::None => {}
                        SegmentIntersection::Point(p) => record(i, p, &mut cut_vertex),
                        SegmentIntersection::Overlap(p, q) => {
                            record(i, p, &mut cut_vertex);
                            record(i, q, &mut cut_vertex);
                        }
                    }
                }
            }
            for &p in points {
                if point_on_segment(pts[i], pts[i + 1], p) {
                    record(i, p, &mut cut_vertex);
                }
            }
        }

        let mut pieces = Vec::new();
        let mut current = vec![pts[0]];
        for i in 0..nseg {
            let seg_cuts = &mut cuts[i];
            seg_cuts.sort_by(|x, y| x.0.total_cmp(&y.0));
            for &(_, c) in seg_cuts.iter() {
                if current.last() != Some(&c) {
                    current.push(c);
                }
                flush(&mut pieces, &mut current, c);
            }
            current.push(pts[i + 1]);
            if cut_vertex[i + 1] && i + 1 < nseg {
                flush(&mut pieces, &mut current, pts[i + 1]);
            }
        }
        flush(&mut pieces, &mut current, pts[nseg]);
        pieces
    }
}

fn flush(pieces: &mut Vec<LineString<f64>>, current: &mut Vec<Coord<f64>>, restart: Coord<f64>) {
    let piece = LineString::new(std::mem::take(current)).remove_repeated_points();
    if piece.0.len() >= 2 {
        pieces.push(piece);
    }
    current.push(restart);
}

/// Every segment of `a` is covered by collinear pieces of `b`.
fn line_covered_by(a: &[Coord<f64>], b: &[Coord<f64>]) -> bool {
    a.windows(2).all(|sa| {
        let r = v2(sa[1]) - v2(sa[0]);
        let rr = r.norm_squared();
        if rr == 0.0 {
            return true;
        }
        let param = |c: Coord<f64>| {
            if c == sa[0] {
                0.0
            } else if c == sa[1] {
                1.0
            } else {
                (v2(c) - v2(sa[0])).dot(&r) / rr
            }
        };
        let mut spans: Vec<(f64, f64)> = b
            .windows(2)
            .filter_map(|sb| match segment_intersection(sa[0], sa[1], sb[0], sb[1]) {
                SegmentIntersection::Overlap(p, q) => {
                    let (s, t) = (param(p), param(q));
                    Some((s.min(t), s.max(t)))
                }
                _ => None,
            })
            .collect();
        spans.sort_by(|x, y| x.0.total_cmp(&y.0));
        let mut reach = 0.0;
        for (s, t) in spans {
            if s > reach {
                return false;
            }
            reach = f64::max(reach, t);
        }
        reach >= 1.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, line_string, polygon};

    #[test]
    fn simple_and_non_simple_lines() {
        let e = PlanarEngine;
        assert!(e.is_simple(&line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 5.0)]));
        assert!(!e.is_simple(&line_string![
            (x: 0.0, y: 0.0), (x: 5.0, y: 5.0), (x: 5.0, y: 0.0), (x: 0.0, y: 5.0)
        ]));
        // closed ring is simple
        assert!(e.is_simple(&line_string![
            (x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 5.0), (x: 0.0, y: 0.0)
        ]));
        // backtracking
        assert!(!e.is_simple(&line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 2.0, y: 0.0)]));
    }

    #[test]
    fn relate_classifies_interactions() {
        let e = PlanarEngine;
        let base = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let touching = line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 10.0)];
        assert_eq!(e.relate_lines(&touching, &base), LineRelation::InteriorsDisjoint);

        let crossing = line_string![(x: 5.0, y: -5.0), (x: 5.0, y: 5.0)];
        assert_eq!(
            e.relate_lines(&crossing, &base),
            LineRelation::Crosses(coord! { x: 5.0, y: 0.0 })
        );

        let reversed = line_string![(x: 10.0, y: 0.0), (x: 5.0, y: 0.0), (x: 0.0, y: 0.0)];
        assert_eq!(e.relate_lines(&reversed, &base), LineRelation::Equal);

        let partial = line_string![(x: 5.0, y: 0.0), (x: 15.0, y: 0.0)];
        assert_eq!(e.relate_lines(&partial, &base), LineRelation::Overlaps);
    }

    #[test]
    fn closed_line_meeting_at_its_node_is_not_a_crossing() {
        let e = PlanarEngine;
        let ring = line_string![
            (x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 5.0), (x: 0.0, y: 0.0)
        ];
        let spur = line_string![(x: 0.0, y: 0.0), (x: -5.0, y: 0.0)];
        assert_eq!(e.relate_lines(&spur, &ring), LineRelation::InteriorsDisjoint);
    }

    #[test]
    fn split_at_interior_point_and_vertex() {
        let e = PlanarEngine;
        let l = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)];
        let (a, b) = e.split_line(&l, coord! { x: 5.0, y: 0.0 }).unwrap();
        assert_eq!(a, line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)]);
        assert_eq!(b, line_string![(x: 5.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)]);
        let (a, b) = e.split_line(&l, coord! { x: 10.0, y: 0.0 }).unwrap();
        assert_eq!(a.0.len(), 2);
        assert_eq!(b.0.len(), 2);
        assert!(e.split_line(&l, coord! { x: 0.0, y: 0.0 }).is_none());
        assert!(e.split_line(&l, coord! { x: 5.0, y: 1.0 }).is_none());
    }

    #[test]
    fn polygon_point_tests() {
        let e = PlanarEngine;
        let sq = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)];
        assert!(e.polygon_contains_point(&sq, coord! { x: 1.0, y: 1.0 }));
        assert!(!e.polygon_contains_point(&sq, coord! { x: 0.0, y: 1.0 }));
        assert!(e.polygon_covers_point(&sq, coord! { x: 0.0, y: 1.0 }));
        let p = e.point_on_surface(&sq).unwrap();
        assert!(e.polygon_contains_point(&sq, p));
    }

    #[test]
    fn ring_area_excludes_boundary() {
        let e = PlanarEngine;
        let ring = line_string![
            (x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0), (x: 0.0, y: 0.0)
        ];
        assert!(e.ring_area_contains_point(&ring, coord! { x: 1.0, y: 1.0 }));
        assert!(!e.ring_area_contains_point(&ring, coord! { x: 4.0, y: 2.0 }));
        assert!(!e.ring_area_contains_point(&ring, coord! { x: 5.0, y: 2.0 }));
        // orientation does not matter
        let cw = LineString::new(ring.0.iter().rev().copied().collect());
        assert!(e.ring_area_contains_point(&cw, coord! { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn snap_moves_vertices_and_inserts_reference_points() {
        let e = PlanarEngine;
        let l = line_string![(x: 0.0, y: 0.1), (x: 10.0, y: 0.0)];
        let snapped = e.snap_line(
            &l,
            &[coord! { x: 0.0, y: 0.0 }, coord! { x: 5.0, y: 0.05 }],
            0.2,
        );
        assert_eq!(
            snapped,
            line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.05), (x: 10.0, y: 0.0)]
        );
    }

    #[test]
    fn node_line_cuts_at_crossings_and_points() {
        let e = PlanarEngine;
        let l = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let other = line_string![(x: 3.0, y: -1.0), (x: 3.0, y: 1.0)];
        let pieces = e.node_line(&l, &[other], &[coord! { x: 7.0, y: 0.0 }]);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 0.0)]);
        assert_eq!(pieces[2], line_string![(x: 7.0, y: 0.0), (x: 10.0, y: 0.0)]);
    }

    #[test]
    fn node_line_cuts_self_intersection() {
        let e = PlanarEngine;
        let bow = line_string![
            (x: 0.0, y: 0.0), (x: 4.0, y: 4.0), (x: 4.0, y: 0.0), (x: 0.0, y: 4.0)
        ];
        let pieces = e.node_line(&bow, &[], &[]);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].0.last(), Some(&coord! { x: 2.0, y: 2.0 }));
    }
}
