// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapping front ends that load points, lines and polygons into the
//! topology, reusing or splitting what is already there.
//!
//! Input is snapped to existing nodes and edges within a tolerance, noded
//! against them, and decomposed into isolated nodes, edge splits and edge
//! insertions.

use geo::RemoveRepeatedPoints;
use geo_types::{Coord, LineString, Polygon};

use crate::backend::Backend;
use crate::edge::FaceMode;
use crate::error::{Error, Result};
use crate::geometry::{
    distance, line_bbox, line_distance, lines_distance, point_on_line, rect_expand,
};
use crate::keys::{EdgeId, FaceId, NodeId};
use crate::predicate::{GeometryEngine, LineRelation};
use crate::topology::Topology;

/// Smallest delta that still perturbs the largest absolute ordinate of
/// `coords`; 0 for no coordinates. All-zero ordinates scale as 1.
pub fn min_tolerance<I>(coords: I) -> f64
where
    I: IntoIterator<Item = Coord<f64>>,
{
    let mut any = false;
    let max = coords.into_iter().fold(0.0_f64, |m, c| {
        any = true;
        m.max(c.x.abs()).max(c.y.abs())
    });
    if !any {
        return 0.0;
    }
    let max = if max == 0.0 { 1.0 } else { max };
    3.6 * 10f64.powf(-(15.0 - max.log10()))
}

fn is_finite(c: Coord<f64>) -> bool {
    c.x.is_finite() && c.y.is_finite()
}

/// Same linework, in either direction.
fn same_piece(a: &LineString<f64>, b: &LineString<f64>) -> bool {
    a == b || a.0.iter().eq(b.0.iter().rev())
}

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// `tol`, else the topology precision, else the minimum tolerance of
    /// `coords`.
    fn effective_tolerance<I>(&self, tol: f64, coords: I) -> f64
    where
        I: IntoIterator<Item = Coord<f64>>,
    {
        if tol != 0.0 {
            tol
        } else if self.precision() != 0.0 {
            self.precision()
        } else {
            min_tolerance(coords)
        }
    }

    /// Adds a point, returning the node standing for it.
    ///
    /// The closest node within `tol` is reused; otherwise the closest edge
    /// within `tol` is split at the projection of the point; otherwise an
    /// isolated node is created.
    pub fn add_point(&mut self, pt: Coord<f64>, tol: f64) -> Result<NodeId> {
        if !is_finite(pt) {
            return Err(Error::InvalidInput(format!(
                "non-finite point ({}, {})",
                pt.x, pt.y
            )));
        }
        let tol = self.effective_tolerance(tol, [pt]);

        let nearest = self
            .backend
            .get_node_within_distance_2d(pt, tol, None)?
            .into_iter()
            .map(|n| (distance(n.geom, pt), n.id))
            .filter(|&(d, _)| d < tol)
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((_, id)) = nearest {
            tracing::debug!(node = %id, "Reusing node within tolerance");
            return Ok(id);
        }

        let mut edges: Vec<_> = self
            .backend
            .get_edge_within_distance_2d(pt, tol, None)?
            .into_iter()
            .map(|e| (line_distance(&e.geom, pt), e))
            .collect();
        edges.sort_by(|a, b| a.0.total_cmp(&b.0));

        let count = edges.len();
        for (i, (_, e)) in edges.into_iter().enumerate() {
            let prj = self
                .engine
                .project_point(&e.geom, pt)
                .ok_or_else(|| Error::corrupted(format!("edge {} has no geometry", e.id)))?
                .point;
            if !point_on_line(&e.geom, prj) {
                // prefer an edge holding the projected point exactly
                if i + 1 < count {
                    continue;
                }
                let mut snapped = self
                    .engine
                    .snap_line(&e.geom, &[prj], min_tolerance([prj]));
                if let Some(&first) = e.geom.0.first() {
                    if snapped.0.first() != Some(&first) {
                        snapped.0.insert(0, first);
                    }
                }
                tracing::debug!(edge = %e.id, "Snapping edge to projected point");
                self.change_edge_geom(e.id, &snapped)?;
            }
            return self.mod_edge_split(e.id, prj, false);
        }

        self.add_iso_node(None, pt, false)
    }

    /// Adds a line, splitting it where it meets existing linework. Returns
    /// the edges composing it, in line order and without duplicates. Faces
    /// closed by new edges are split keeping the old face on one side.
    pub fn add_line(&mut self, line: &LineString<f64>, tol: f64) -> Result<Vec<EdgeId>> {
        self.add_line_with(line, tol, FaceMode::ModFace)
    }

    /// Like [`add_line`](Self::add_line), but new edges never split faces.
    pub fn add_line_no_face(&mut self, line: &LineString<f64>, tol: f64) -> Result<Vec<EdgeId>> {
        self.add_line_with(line, tol, FaceMode::NoFace)
    }

    fn add_line_with(
        &mut self,
        line: &LineString<f64>,
        tol: f64,
        mode: FaceMode,
    ) -> Result<Vec<EdgeId>> {
        if !line.0.iter().all(|&c| is_finite(c)) {
            return Err(Error::InvalidInput("non-finite line coordinate".into()));
        }
        let tol = self.effective_tolerance(tol, line.0.iter().copied());
        let Some(bbox) = line_bbox(line) else {
            return Err(Error::InvalidInput("empty line".into()));
        };
        let qbox = rect_expand(&bbox, tol);

        let mut pieces = self.engine.node_line(line, &[], &[]);

        let nearby: Vec<LineString<f64>> = self
            .backend
            .get_edge_within_box_2d(&qbox, None)?
            .into_iter()
            .map(|e| e.geom)
            .filter(|g| lines_distance(g, line) < tol)
            .collect();
        if !nearby.is_empty() {
            let vertices: Vec<Coord<f64>> = nearby.iter().flat_map(|g| g.0.iter().copied()).collect();
            pieces = pieces
                .iter()
                .flat_map(|p| {
                    let snapped = self.engine.snap_line(p, &vertices, tol);
                    self.engine.node_line(&snapped, &nearby, &[])
                })
                .collect();
        }

        let node_pts: Vec<Coord<f64>> = self
            .backend
            .get_node_within_box_2d(&qbox, None)?
            .into_iter()
            .map(|n| n.geom)
            .filter(|&p| pieces.iter().any(|piece| line_distance(piece, p) < tol))
            .collect();
        if !node_pts.is_empty() {
            pieces = pieces
                .iter()
                .flat_map(|p| {
                    let snapped = self.engine.snap_line(p, &node_pts, tol);
                    self.engine.node_line(&snapped, &[], &node_pts)
                })
                .collect();
        }

        let mut unique: Vec<LineString<f64>> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            if !unique.iter().any(|u| same_piece(u, &piece)) {
                unique.push(piece);
            }
        }
        tracing::debug!(pieces = unique.len(), tol, "Noded input line");

        let mut ids = Vec::with_capacity(unique.len());
        for piece in unique {
            if let Some(id) = self.add_line_edge(piece, tol, mode)? {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        tracing::info!(edges = ids.len(), "Added line");
        Ok(ids)
    }

    /// Adds one noded piece of a line. `None` when it collapsed after
    /// snapping its endpoints to their nodes.
    fn add_line_edge(
        &mut self,
        mut piece: LineString<f64>,
        tol: f64,
        mode: FaceMode,
    ) -> Result<Option<EdgeId>> {
        let (Some(&first), Some(&last)) = (piece.0.first(), piece.0.last()) else {
            return Ok(None);
        };
        let start = self.add_point(first, tol)?;
        let end = self.add_point(last, tol)?;

        // endpoints may have drifted to existing nodes
        let spt = self.fetch_node(start)?.geom;
        let ept = self.fetch_node(end)?.geom;
        if let Some(p) = piece.0.first_mut() {
            *p = spt;
        }
        if let Some(p) = piece.0.last_mut() {
            *p = ept;
        }
        let piece = piece.remove_repeated_points();
        let collapsed = if start == end {
            piece.0.len() < 4
        } else {
            piece.0.len() < 2
        };
        if collapsed {
            tracing::debug!(node = %start, "Line piece collapsed on snapping");
            return Ok(None);
        }

        if let Some(bbox) = line_bbox(&piece) {
            for e in self.backend.get_edge_within_box_2d(&bbox, None)? {
                if self.engine.relate_lines(&piece, &e.geom) == LineRelation::Equal {
                    return Ok(Some(e.id));
                }
            }
        }

        self.add_edge(start, end, &piece, false, mode).map(Some)
    }

    /// Adds the rings of a polygon as lines and returns the faces it covers.
    pub fn add_polygon(&mut self, poly: &Polygon<f64>, tol: f64) -> Result<Vec<FaceId>> {
        let coords = poly
            .exterior()
            .0
            .iter()
            .chain(poly.interiors().iter().flat_map(|r| r.0.iter()))
            .copied();
        let tol = self.effective_tolerance(tol, coords);

        let rings = std::iter::once(poly.exterior()).chain(poly.interiors().iter());
        for (i, ring) in rings.enumerate() {
            self.add_line(ring, tol).map_err(|e| {
                tracing::debug!(ring = i, error = %e, "Could not add polygon ring");
                e
            })?;
        }

        let Some(bbox) = line_bbox(poly.exterior()) else {
            return Err(Error::InvalidInput("empty polygon".into()));
        };
        let qbox = rect_expand(&bbox, tol);
        let mut ids = Vec::new();
        for face in self.backend.get_face_within_box_2d(&qbox, None)? {
            let geom = self.get_face_geometry(face.id)?;
            let Some(sp) = self.engine.point_on_surface(&geom) else {
                return Err(Error::corrupted(format!(
                    "could not find point on surface of face {}",
                    face.id
                )));
            };
            if self.engine.polygon_covers_point(poly, sp) && !ids.contains(&face.id) {
                ids.push(face.id);
            }
        }
        tracing::info!(faces = ids.len(), "Added polygon");
        Ok(ids)
    }
}
