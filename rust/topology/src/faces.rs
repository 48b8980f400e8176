// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face geometry, face boundary walks and face splitting.

use geo::{Area, BoundingRect, RemoveRepeatedPoints};
use geo_types::{Coord, LineString, Polygon, Rect};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::geometry::interior_edge_point;
use crate::keys::{DirectedEdge, FaceId};
use crate::predicate::GeometryEngine;
use crate::records::{Edge, EdgeFields, Face};
use crate::topology::Topology;

/// Outcome of trying to close a face on one side of a new edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaceSplit {
    /// Both sides of the edge lie on the same ring: no face was closed.
    NoRing,
    /// A ring was closed but no face was created on this side, either
    /// because the other side forms it or because only the MBR was updated.
    Skipped,
    Created(FaceId),
}

fn empty_polygon() -> Polygon<f64> {
    Polygon::new(LineString::new(Vec::new()), Vec::new())
}

/// Concatenates the geometries of a ring of directed edges.
pub(crate) fn ring_coords(ring: &[DirectedEdge], edges: &[Edge]) -> Result<Vec<Coord<f64>>> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for de in ring {
        let edge = edges
            .iter()
            .find(|e| e.id == de.edge)
            .ok_or_else(|| Error::corrupted(format!("missing edge {} of ring", de.edge)))?;
        let mut push = |c: Coord<f64>| {
            if coords.last() != Some(&c) {
                coords.push(c);
            }
        };
        if de.is_forward() {
            edge.geom.0.iter().copied().for_each(&mut push);
        } else {
            edge.geom.0.iter().rev().copied().for_each(&mut push);
        }
    }
    Ok(coords)
}

/// Rotates a closed ring so that it starts on one of `stops`.
fn start_ring_at(ring: &mut Vec<Coord<f64>>, stops: &[Coord<f64>]) {
    if ring.len() < 2 {
        return;
    }
    let Some(k) = ring.iter().position(|c| stops.contains(c)) else {
        return;
    };
    if k > 0 {
        ring.pop();
        ring.rotate_left(k);
        ring.push(ring[0]);
    }
}

/// Edge from `edges` covering the ring portion starting at `ring[from]`,
/// in either direction, skipping dangling and consumed edges.
fn next_ring_edge(
    ring: &[Coord<f64>],
    from: usize,
    edges: &[(Edge, LineString<f64>)],
    used: &[bool],
) -> Option<usize> {
    let (p, next) = (ring[from], ring[from + 1]);
    edges.iter().enumerate().find_map(|(i, (edge, clean))| {
        if used[i] || edge.is_dangling() {
            return None;
        }
        let pts = &clean.0;
        let forward = pts.first() == Some(&p) && pts.iter().find(|&&c| c != p) == Some(&next);
        let backward =
            pts.last() == Some(&p) && pts.iter().rev().find(|&&c| c != p) == Some(&next);
        (forward || backward).then_some(i)
    })
}

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// Returns the polygon of a face.
    ///
    /// A face with no boundary edges yields an empty polygon.
    pub fn get_face_geometry(&self, face: FaceId) -> Result<Polygon<f64>> {
        if face.is_universe() {
            return Err(Error::UniversalFace);
        }
        let edges = self.backend.get_edge_by_face(&[face])?;
        if edges.is_empty() {
            self.fetch_face(face)?;
            return Ok(empty_polygon());
        }
        let lines: Vec<LineString<f64>> = edges.into_iter().map(|e| e.geom).collect();
        let mut area = self.engine.build_area(&lines);
        match area.0.len() {
            0 => Ok(empty_polygon()),
            1 => Ok(area.0.remove(0)),
            n => Err(Error::corrupted(format!(
                "face {face} is bounded by {n} separate polygons"
            ))),
        }
    }

    /// Returns the signed edges bounding a face, one ring after the other.
    ///
    /// Each ring is walked with the face on its left and rotated so that
    /// the edge with the smallest id comes first.
    pub fn get_face_edges(&self, face: FaceId) -> Result<Vec<DirectedEdge>> {
        let edges = self.backend.get_edge_by_face(&[face])?;
        if edges.is_empty() {
            return Ok(Vec::new());
        }
        let lines: Vec<LineString<f64>> = edges.iter().map(|e| e.geom.clone()).collect();
        let area = self.engine.build_area(&lines);

        let stops: Vec<Coord<f64>> = edges
            .iter()
            .flat_map(|e| [e.geom.0.first(), e.geom.0.last()])
            .flatten()
            .copied()
            .collect();
        let mut rings: Vec<Vec<Coord<f64>>> = Vec::new();
        for poly in &area.0 {
            let (exterior, interiors) = poly.clone().into_inner();
            for ring in std::iter::once(exterior).chain(interiors) {
                let mut coords = ring.0;
                // universe boundaries have the face on the outside
                if face.is_universe() {
                    coords.reverse();
                }
                start_ring_at(&mut coords, &stops);
                rings.push(coords);
            }
        }

        let edges: Vec<(Edge, LineString<f64>)> = edges
            .into_iter()
            .map(|e| {
                let clean = e.geom.remove_repeated_points();
                (e, clean)
            })
            .collect();
        let mut used = vec![false; edges.len()];
        let mut out: Vec<DirectedEdge> = Vec::with_capacity(edges.len());

        for ring in &rings {
            let start = out.len();
            let mut j = 0;
            while j + 1 < ring.len() {
                let i = next_ring_edge(ring, j, &edges, &used).ok_or_else(|| {
                    Error::corrupted(format!(
                        "no edge (among {}) found to be defining geometry of face {face}",
                        edges.len()
                    ))
                })?;
                used[i] = true;
                let (edge, clean) = &edges[i];
                j += clean.0.len() - 1;
                out.push(if edge.face_left == face {
                    edge.id.forward()
                } else {
                    edge.id.backward()
                });
            }
            let ring_edges = &mut out[start..];
            if let Some(minidx) = ring_edges
                .iter()
                .enumerate()
                .min_by_key(|(_, de)| de.edge.0.abs())
                .map(|(i, _)| i)
            {
                ring_edges.rotate_left(minidx);
            }
        }
        Ok(out)
    }

    /// Creates the face enclosed by the ring on the left of `sedge`, taking
    /// its area out of `face`.
    ///
    /// With `mbr_only`, nothing is created: a counter-clockwise ring only
    /// refreshes the MBR of `face`.
    pub(crate) fn add_face_split(
        &mut self,
        sedge: DirectedEdge,
        face: FaceId,
        mbr_only: bool,
    ) -> Result<FaceSplit> {
        let ring = self.backend.get_ring_edges(sedge, None)?;
        if ring.contains(&sedge.reversed()) {
            return Ok(FaceSplit::NoRing);
        }

        let mut ids: Vec<_> = ring.iter().map(|de| de.edge).collect();
        ids.sort_unstable();
        ids.dedup();
        let ring_edges = self.backend.get_edge_by_id(&ids)?;
        if ring_edges.len() != ids.len() {
            return Err(Error::corrupted(format!(
                "{} edges found when expecting {}",
                ring_edges.len(),
                ids.len()
            )));
        }

        let shell = LineString::new(ring_coords(&ring, &ring_edges)?);
        let isccw = Polygon::new(shell.clone(), Vec::new()).signed_area() > 0.0;
        let shellbox = shell
            .bounding_rect()
            .ok_or_else(|| Error::corrupted(format!("ring of edge {sedge} is empty")))?;
        tracing::debug!(edge = %sedge, face = %face, isccw, "Ring closed");

        if face.is_universe() && !isccw {
            return Ok(FaceSplit::Skipped);
        }

        if mbr_only && !face.is_universe() {
            if isccw {
                let n = self.backend.update_faces_by_id(&[Face {
                    id: face,
                    mbr: shellbox,
                }])?;
                if n != 1 {
                    return Err(Error::corrupted(format!(
                        "{n} faces found when expecting 1"
                    )));
                }
            }
            return Ok(FaceSplit::Skipped);
        }

        let newface_outside = !face.is_universe() && !isccw;
        let mbr = if newface_outside {
            self.fetch_face(face)?.mbr
        } else {
            shellbox
        };
        let newface = self
            .backend
            .insert_faces(&[mbr])?
            .first()
            .copied()
            .ok_or_else(|| Error::corrupted("face insertion returned no id"))?;

        // the new face takes over the side of every edge found inside it
        for e in self.backend.get_edge_by_face(&[face])? {
            let mut upd = EdgeFields::default();
            if ring.contains(&e.id.forward()) {
                upd.face_left = Some(newface);
            }
            if ring.contains(&e.id.backward()) {
                upd.face_right = Some(newface);
            }
            if upd == EdgeFields::default() {
                let ep = interior_edge_point(&e.geom).ok_or_else(|| {
                    Error::corrupted(format!("could not find interior point for edge {}", e.id))
                })?;
                let contains = self.engine.ring_area_contains_point(&shell, ep);
                if contains == newface_outside {
                    continue;
                }
                if e.face_left == face {
                    upd.face_left = Some(newface);
                }
                if e.face_right == face {
                    upd.face_right = Some(newface);
                }
            }
            self.update_edge(e.id, upd)?;
        }

        for n in self.backend.get_node_by_face(&[face])? {
            let contains = self.engine.ring_area_contains_point(&shell, n.geom);
            if contains == newface_outside {
                continue;
            }
            self.set_node_face(n.id, Some(newface))?;
        }

        tracing::debug!(face = %newface, outside = newface_outside, "Created face");
        Ok(FaceSplit::Created(newface))
    }

    /// Bounding box of the polygon of `face`, `None` when it has no area.
    pub(crate) fn face_shell_box(&self, face: FaceId) -> Result<Option<Rect<f64>>> {
        Ok(self.get_face_geometry(face)?.bounding_rect())
    }
}
