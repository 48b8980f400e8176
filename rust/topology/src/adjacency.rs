// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Azimuth ordering of edge ends around a node.

use geo::RemoveRepeatedPoints;
use geo_types::{Coord, LineString};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::geometry::azimuth;
use crate::keys::{DirectedEdge, EdgeId, FaceId, NodeId};
use crate::predicate::GeometryEngine;
use crate::topology::Topology;

/// One end of an edge as seen from the node it touches, with the edges met
/// first when turning clockwise and counter-clockwise from it.
///
/// `next_cw`/`next_ccw` are outgoing (forward) when the neighbour starts at
/// the node, incoming (backward) when it ends there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EdgeEnd {
    pub myaz: f64,
    pub next_cw: Option<DirectedEdge>,
    pub cw_face: Option<FaceId>,
    pub next_ccw: Option<DirectedEdge>,
    pub ccw_face: Option<FaceId>,
}

impl EdgeEnd {
    fn new(myaz: f64) -> Self {
        Self {
            myaz,
            next_cw: None,
            cw_face: None,
            next_ccw: None,
            ccw_face: None,
        }
    }
}

/// Azimuth of the first (or last, when `reverse`) vertex towards the
/// nearest distinct one.
fn end_azimuth(pts: &[Coord<f64>], reverse: bool) -> Option<f64> {
    let first = if reverse { *pts.last()? } else { *pts.first()? };
    let other = if reverse {
        pts.iter().rev().find(|&&p| p != first)
    } else {
        pts.iter().find(|&&p| p != first)
    }?;
    azimuth(first, *other)
}

/// Edge ends of both extremities of `line`.
pub(crate) fn init_edge_ends(line: &LineString<f64>) -> Result<(EdgeEnd, EdgeEnd)> {
    let first = end_azimuth(&line.0, false);
    let last = end_azimuth(&line.0, true);
    match (first, last) {
        (Some(f), Some(l)) => Ok((EdgeEnd::new(f), EdgeEnd::new(l))),
        _ => Err(Error::InvalidEdge("no two distinct vertices exist".into())),
    }
}

/// Bearing difference normalized to `[0, 2π)`.
fn az_diff(az: f64, reference: f64) -> f64 {
    let d = az - reference;
    if d < 0.0 {
        d + std::f64::consts::TAU
    } else {
        d
    }
}

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// Fills `data` with the edges adjacent to its azimuth around `node`.
    ///
    /// `other` is the opposite end of the same edge when that edge is closed
    /// on `node`; `myedge` is skipped among incident edges. Returns the number
    /// of incident edges the backend reported.
    pub(crate) fn find_adjacent_edges(
        &self,
        node: NodeId,
        data: &mut EdgeEnd,
        other: Option<&EdgeEnd>,
        myedge: Option<EdgeId>,
    ) -> Result<usize> {
        data.next_cw = None;
        data.next_ccw = None;
        data.cw_face = None;
        data.ccw_face = None;

        let mut bounds: Option<(f64, f64)> = other.map(|o| {
            let d = az_diff(o.myaz, data.myaz);
            (d, d)
        });
        let mut seen: Vec<f64> = bounds.iter().map(|b| b.0).collect();

        let edges = self.backend.get_edge_by_node(&[node])?;
        for edge in &edges {
            if Some(edge.id) == myedge {
                continue;
            }
            let clean = edge.geom.remove_repeated_points();
            if clean.0.len() < 2 {
                return Err(Error::corrupted(format!(
                    "edge {} does not have two distinct points",
                    edge.id
                )));
            }

            let mut ends = Vec::with_capacity(2);
            if edge.start_node == node {
                // outgoing: left face is met turning clockwise onto it
                ends.push((false, edge.id.forward(), edge.face_left, edge.face_right));
            }
            if edge.end_node == node {
                ends.push((true, edge.id.backward(), edge.face_right, edge.face_left));
            }

            for (reverse, signed, cw_face, ccw_face) in ends {
                let az = end_azimuth(&clean.0, reverse).ok_or_else(|| {
                    Error::corrupted(format!("cannot compute azimuth of edge {}", edge.id))
                })?;
                let azdif = az_diff(az, data.myaz);
                if azdif == 0.0 || seen.contains(&azdif) {
                    return Err(Error::corrupted(format!(
                        "edge {} shares azimuth {az} with another edge end at node {node}",
                        edge.id
                    )));
                }
                seen.push(azdif);

                match bounds {
                    None => {
                        bounds = Some((azdif, azdif));
                        data.next_cw = Some(signed);
                        data.next_ccw = Some(signed);
                        data.cw_face = Some(cw_face);
                        data.ccw_face = Some(ccw_face);
                    }
                    Some((ref mut minaz, ref mut maxaz)) => {
                        if azdif < *minaz {
                            data.next_cw = Some(signed);
                            data.cw_face = Some(cw_face);
                            *minaz = azdif;
                        } else if azdif > *maxaz {
                            data.next_ccw = Some(signed);
                            data.ccw_face = Some(ccw_face);
                            *maxaz = azdif;
                        }
                    }
                }
            }
        }

        tracing::trace!(
            node = %node,
            az = data.myaz,
            cw = ?data.next_cw,
            ccw = ?data.next_ccw,
            "Found adjacent edges"
        );

        if myedge.is_none() && !edges.is_empty() {
            if let (Some(cw), Some(ccw)) = (data.cw_face, data.ccw_face) {
                if cw != ccw {
                    return Err(Error::corrupted(format!(
                        "adjacent edges {:?} and {:?} bind different face ({cw} and {ccw})",
                        data.next_cw, data.next_ccw
                    )));
                }
            }
        }

        Ok(edges.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::line_string;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn edge_ends_skip_repeated_vertices() {
        let line = line_string![
            (x: 0.0, y: 0.0), (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 1.0, y: 1.0)
        ];
        let (first, last) = init_edge_ends(&line).unwrap();
        assert_relative_eq!(first.myaz, FRAC_PI_2);
        assert_relative_eq!(last.myaz, PI);
    }

    #[test]
    fn collapsed_line_has_no_edge_ends() {
        let line = line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)];
        assert!(matches!(init_edge_ends(&line), Err(Error::InvalidEdge(_))));
    }

    #[test]
    fn diff_wraps_into_positive_range() {
        assert_relative_eq!(az_diff(0.5, 1.0), std::f64::consts::TAU - 0.5);
        assert_relative_eq!(az_diff(1.0, 0.5), 0.5);
    }
}
