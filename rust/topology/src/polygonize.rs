// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Area construction from noded linework.
//!
//! Input lines must only meet at their endpoints (true for topology edges).
//! The lines are turned into a half-edge graph, dangles and cut edges are
//! pruned, the remaining face cycles are traced and split into minimal
//! rings, and counter-clockwise rings are assembled into polygons by
//! even-odd nesting: a ring inside an even number of others is a shell, a
//! ring inside an odd number is a hole of its closest enclosing shell.

use geo::coordinate_position::{coord_pos_relative_to_ring, CoordPos};
use geo::{Area, RemoveRepeatedPoints};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use rustc_hash::FxHashMap;

/// Builds the polygons enclosed by `lines`.
///
/// Polygon exteriors are counter-clockwise, holes clockwise. Every ring
/// starts at one of the input line endpoints.
pub fn build_area(lines: &[LineString<f64>]) -> MultiPolygon<f64> {
    let graph = HalfEdgeGraph::new(lines);
    let rings = graph.minimal_rings();

    let mut shells: Vec<Shell> = rings
        .into_iter()
        .filter_map(|coords| {
            let ring = LineString::new(coords);
            let area = Polygon::new(ring.clone(), Vec::new()).signed_area();
            (area > 0.0).then_some(Shell {
                ring,
                area,
                parent: None,
                depth: 0,
            })
        })
        .collect();

    // Largest first so a parent is always resolved before its children.
    shells.sort_by(|a, b| b.area.total_cmp(&a.area));
    for i in 0..shells.len() {
        let mut parent = None;
        for j in (0..i).rev() {
            if ring_inside(&shells[i].ring, &shells[j].ring) {
                parent = Some(j);
                break;
            }
        }
        shells[i].parent = parent;
        shells[i].depth = parent.map_or(0, |p| shells[p].depth + 1);
    }

    let mut polygons: Vec<(usize, Vec<LineString<f64>>)> = Vec::new();
    let mut slot: FxHashMap<usize, usize> = FxHashMap::default();
    for (i, shell) in shells.iter().enumerate() {
        if shell.depth % 2 == 0 {
            slot.insert(i, polygons.len());
            polygons.push((i, Vec::new()));
        }
    }
    for shell in shells.iter() {
        if shell.depth % 2 == 1 {
            if let Some(&k) = shell.parent.and_then(|p| slot.get(&p)) {
                let mut hole = shell.ring.clone();
                hole.0.reverse();
                polygons[k].1.push(hole);
            }
        }
    }

    MultiPolygon::new(
        polygons
            .into_iter()
            .map(|(i, holes)| Polygon::new(shells[i].ring.clone(), holes))
            .collect(),
    )
}

struct Shell {
    ring: LineString<f64>,
    area: f64,
    parent: Option<usize>,
    depth: usize,
}

/// True when `inner` lies inside `outer`, judged at the first vertex or
/// segment midpoint of `inner` that is off `outer`'s boundary. A ring
/// entirely on the boundary of `outer` (a pinched lobe) counts as inside.
fn ring_inside(inner: &LineString<f64>, outer: &LineString<f64>) -> bool {
    let mids = inner.lines().map(|l| Coord {
        x: (l.start.x + l.end.x) * 0.5,
        y: (l.start.y + l.end.y) * 0.5,
    });
    for p in inner.coords().copied().chain(mids) {
        match coord_pos_relative_to_ring(p, outer) {
            CoordPos::Inside => return true,
            CoordPos::Outside => return false,
            CoordPos::OnBoundary => {}
        }
    }
    true
}

// ============================================================================
// Half-edge graph
// ============================================================================

struct HalfEdge {
    origin: usize,
    /// Coordinates from origin to destination.
    coords: Vec<Coord<f64>>,
    angle: f64,
}

struct HalfEdgeGraph {
    half_edges: Vec<HalfEdge>,
    /// Outgoing half-edges per vertex, counter-clockwise by angle.
    outgoing: Vec<Vec<usize>>,
    active: Vec<bool>,
}

#[inline]
fn twin(h: usize) -> usize {
    h ^ 1
}

fn coord_key(c: Coord<f64>) -> (u64, u64) {
    // +0.0 folds negative zero onto positive zero.
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

impl HalfEdgeGraph {
    fn new(lines: &[LineString<f64>]) -> Self {
        let mut vertex_ids: FxHashMap<(u64, u64), usize> = FxHashMap::default();
        let mut outgoing: Vec<Vec<usize>> = Vec::new();
        let mut half_edges = Vec::with_capacity(lines.len() * 2);

        let mut vertex = |c: Coord<f64>, outgoing: &mut Vec<Vec<usize>>| -> usize {
            *vertex_ids.entry(coord_key(c)).or_insert_with(|| {
                outgoing.push(Vec::new());
                outgoing.len() - 1
            })
        };

        for line in lines {
            let clean = line.remove_repeated_points();
            let pts = clean.0;
            if pts.len() < 2 {
                continue;
            }
            let n = pts.len();
            let a = vertex(pts[0], &mut outgoing);
            let b = vertex(pts[n - 1], &mut outgoing);
            let fwd_angle = (pts[1].y - pts[0].y).atan2(pts[1].x - pts[0].x);
            let bwd_angle = (pts[n - 2].y - pts[n - 1].y).atan2(pts[n - 2].x - pts[n - 1].x);
            let mut rev = pts.clone();
            rev.reverse();

            let h = half_edges.len();
            half_edges.push(HalfEdge {
                origin: a,
                coords: pts,
                angle: fwd_angle,
            });
            half_edges.push(HalfEdge {
                origin: b,
                coords: rev,
                angle: bwd_angle,
            });
            outgoing[a].push(h);
            outgoing[b].push(h + 1);
        }

        for out in outgoing.iter_mut() {
            out.sort_by(|&x, &y| half_edges[x].angle.total_cmp(&half_edges[y].angle));
        }

        let active = vec![true; half_edges.len()];
        Self {
            half_edges,
            outgoing,
            active,
        }
    }

    fn dest(&self, h: usize) -> usize {
        self.half_edges[twin(h)].origin
    }

    fn degree(&self, v: usize) -> usize {
        self.outgoing[v].iter().filter(|&&h| self.active[h]).count()
    }

    /// Next half-edge of the face on the left of `h`: at the destination,
    /// the first active outgoing half-edge clockwise from the twin.
    fn next(&self, h: usize) -> Option<usize> {
        let t = twin(h);
        let out = &self.outgoing[self.dest(h)];
        let pos = out.iter().position(|&x| x == t)?;
        let n = out.len();
        (1..=n)
            .map(|k| out[(pos + n - k) % n])
            .find(|&x| self.active[x])
    }

    fn deactivate_edge(&mut self, h: usize) {
        self.active[h] = false;
        self.active[twin(h)] = false;
    }

    fn prune_dangles(&mut self) {
        let mut stack: Vec<usize> = (0..self.outgoing.len())
            .filter(|&v| self.degree(v) == 1)
            .collect();
        while let Some(v) = stack.pop() {
            let Some(h) = self.outgoing[v].iter().copied().find(|&h| self.active[h]) else {
                continue;
            };
            if self.degree(v) != 1 {
                continue;
            }
            let far = self.dest(h);
            self.deactivate_edge(h);
            if self.degree(far) == 1 {
                stack.push(far);
            }
        }
    }

    fn trace_cycles(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.half_edges.len()];
        let mut cycles = Vec::new();
        for start in 0..self.half_edges.len() {
            if !self.active[start] || seen[start] {
                continue;
            }
            let mut cycle = Vec::new();
            let mut h = start;
            loop {
                seen[h] = true;
                cycle.push(h);
                match self.next(h) {
                    Some(n) if n != start && !seen[n] => h = n,
                    _ => break,
                }
            }
            cycles.push(cycle);
        }
        cycles
    }

    /// Removes edges with the same cycle on both sides, repeating dangle
    /// pruning until the graph is stable.
    fn prune(&mut self) -> Vec<Vec<usize>> {
        loop {
            self.prune_dangles();
            let cycles = self.trace_cycles();
            let mut cycle_of = vec![usize::MAX; self.half_edges.len()];
            for (i, c) in cycles.iter().enumerate() {
                for &h in c {
                    cycle_of[h] = i;
                }
            }
            let mut removed = false;
            for h in (0..self.half_edges.len()).step_by(2) {
                if self.active[h] && cycle_of[h] == cycle_of[twin(h)] {
                    self.deactivate_edge(h);
                    removed = true;
                }
            }
            if !removed {
                return cycles;
            }
        }
    }

    /// Face cycles split at repeated vertices, as closed coordinate lists.
    fn minimal_rings(mut self) -> Vec<Vec<Coord<f64>>> {
        let cycles = self.prune();
        let mut rings = Vec::new();
        for cycle in cycles {
            let mut stack: Vec<usize> = Vec::with_capacity(cycle.len());
            let mut at: FxHashMap<usize, usize> = FxHashMap::default();
            for &h in &cycle {
                let origin = self.half_edges[h].origin;
                if let Some(&pos) = at.get(&origin) {
                    let lobe: Vec<usize> = stack.drain(pos..).collect();
                    for &l in &lobe {
                        at.remove(&self.half_edges[l].origin);
                    }
                    rings.push(self.ring_coords(&lobe));
                }
                at.insert(origin, stack.len());
                stack.push(h);
            }
            if !stack.is_empty() {
                rings.push(self.ring_coords(&stack));
            }
        }
        rings
    }

    fn ring_coords(&self, hs: &[usize]) -> Vec<Coord<f64>> {
        let mut coords: Vec<Coord<f64>> = Vec::new();
        for &h in hs {
            let c = &self.half_edges[h].coords;
            let skip = usize::from(!coords.is_empty());
            coords.extend_from_slice(&c[skip..]);
        }
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last {
                coords.push(first);
            }
        }
        coords
    }
}
