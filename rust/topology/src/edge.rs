// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge insertion between existing nodes.
//!
//! The new edge is linked into the edge rings of both endpoints by azimuth,
//! then the rings it closes are turned into faces: either two new faces
//! replacing the split one, or one new face carved out of the old one.

use geo::RemoveRepeatedPoints;
use geo_types::LineString;

use crate::adjacency::init_edge_ends;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::faces::FaceSplit;
use crate::keys::{EdgeId, FaceId, NodeId};
use crate::predicate::GeometryEngine;
use crate::records::{Edge, TopoGeomEvent};
use crate::topology::Topology;

/// What happens to a face closed by a new edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaceMode {
    /// The split face is replaced by two new faces.
    NewFaces,
    /// The split face keeps one side, a new face takes the other.
    ModFace,
    /// Faces are left untouched.
    NoFace,
}

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// Adds an edge between two nodes, splitting a face into two new ones
    /// when a ring is closed. The split face is removed.
    ///
    /// With `skip_checks`, simplicity, endpoint and crossing checks are not
    /// run.
    pub fn add_edge_new_faces(
        &mut self,
        start: NodeId,
        end: NodeId,
        geom: &LineString<f64>,
        skip_checks: bool,
    ) -> Result<EdgeId> {
        self.add_edge(start, end, geom, skip_checks, FaceMode::NewFaces)
    }

    /// Adds an edge between two nodes; when a ring is closed the split face
    /// keeps its id for one side and a new face is created for the other.
    pub fn add_edge_mod_face(
        &mut self,
        start: NodeId,
        end: NodeId,
        geom: &LineString<f64>,
        skip_checks: bool,
    ) -> Result<EdgeId> {
        self.add_edge(start, end, geom, skip_checks, FaceMode::ModFace)
    }

    pub(crate) fn add_edge(
        &mut self,
        start: NodeId,
        end: NodeId,
        geom: &LineString<f64>,
        skip_checks: bool,
        mode: FaceMode,
    ) -> Result<EdgeId> {
        if !skip_checks && !self.engine.is_simple(geom) {
            return Err(Error::CurveNotSimple);
        }
        let clean = geom.remove_repeated_points();
        let (mut span, mut epan) = init_edge_ends(&clean)?;
        let (first, last) = match (clean.0.first(), clean.0.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(Error::InvalidEdge("no two distinct vertices exist".into())),
        };

        let ids: Vec<NodeId> = if start == end {
            vec![start]
        } else {
            vec![start, end]
        };
        let endpoints = self.backend.get_node_by_id(&ids)?;

        let mut face: Option<FaceId> = None;
        for node in &endpoints {
            if let Some(cf) = node.containing_face {
                match face {
                    None => face = Some(cf),
                    Some(f) if f != cf => return Err(Error::EndnodesInDifferentFaces(f, cf)),
                    Some(_) => {}
                }
            }
        }
        let (mut face_left, mut face_right) = (face, face);

        if !skip_checks {
            match endpoints.iter().find(|n| n.id == start) {
                None => return Err(Error::NonExistentNode(start)),
                Some(n) if n.geom != first => return Err(Error::StartNodeMismatch),
                Some(_) => {}
            }
            match endpoints.iter().find(|n| n.id == end) {
                None => return Err(Error::NonExistentNode(end)),
                Some(n) if n.geom != last => return Err(Error::EndNodeMismatch),
                Some(_) => {}
            }
            self.check_edge_crossing(start, end, geom, None)?;
        }

        let id = self.backend.get_next_edge_id()?;
        let closed = start == end;

        let other = closed.then_some(epan);
        let start_found = self.find_adjacent_edges(start, &mut span, other.as_ref(), None)? > 0;
        let (next_right, prev_left) = if start_found {
            face_right = face_right.or(span.cw_face);
            face_left = face_left.or(span.ccw_face);
            (
                span.next_cw.unwrap_or(id.backward()),
                span.next_ccw.map_or(id.forward(), |d| -d),
            )
        } else if closed {
            (id.backward(), id.forward())
        } else {
            (id.forward(), id.backward())
        };

        let other = closed.then_some(span);
        let end_found = self.find_adjacent_edges(end, &mut epan, other.as_ref(), None)? > 0;
        let (next_left, prev_right) = if end_found {
            face_right = face_right.or(epan.ccw_face);
            face_left = face_left.or(epan.cw_face);
            (
                epan.next_cw.unwrap_or(id.forward()),
                epan.next_ccw.map_or(id.backward(), |d| -d),
            )
        } else if closed {
            (id.forward(), id.backward())
        } else {
            (id.backward(), id.forward())
        };

        let face = match (face_left, face_right) {
            (Some(l), Some(r)) if l == r => l,
            (Some(l), Some(r)) => return Err(Error::FacesMismatch { left: l, right: r }),
            _ => {
                return Err(Error::corrupted(
                    "could not derive edge face from linked primitives",
                ))
            }
        };

        let inserted = self.backend.insert_edges(&[Edge {
            id,
            start_node: start,
            end_node: end,
            next_left,
            next_right,
            face_left: face,
            face_right: face,
            geom: geom.clone(),
        }])?;
        if inserted != 1 {
            return Err(Error::corrupted("insertion of new edge failed"));
        }

        if prev_left.edge != id {
            self.link_after(prev_left, id.forward())?;
        }
        if prev_right.edge != id {
            self.link_after(prev_right, id.backward())?;
        }

        if !start_found {
            self.set_node_face(start, None)?;
        }
        if !end_found && !closed {
            self.set_node_face(end, None)?;
        }

        tracing::debug!(
            edge = %id,
            next_left = %next_left,
            next_right = %next_right,
            face = %face,
            "Linked new edge"
        );

        if mode != FaceMode::NoFace {
            self.split_faces_of_new_edge(id, face, mode)?;
        }
        tracing::info!(edge = %id, start = %start, end = %end, "Added edge");
        Ok(id)
    }

    fn split_faces_of_new_edge(&mut self, id: EdgeId, face: FaceId, mode: FaceMode) -> Result<()> {
        let created = |s: FaceSplit| match s {
            FaceSplit::Created(f) => Some(f),
            _ => None,
        };

        let (newface, newface1) = if mode == FaceMode::NewFaces {
            let right = self.add_face_split(id.backward(), face, false)?;
            if right == FaceSplit::NoRing {
                return Ok(());
            }
            let left = self.add_face_split(id.forward(), face, false)?;
            (created(left), created(right))
        } else {
            let newface = match self.add_face_split(id.forward(), face, false)? {
                FaceSplit::NoRing => return Ok(()),
                FaceSplit::Skipped => {
                    // the left side is the universe, the ring closes on the right
                    match self.add_face_split(id.backward(), face, false)? {
                        FaceSplit::Created(f) => f,
                        _ => return Ok(()),
                    }
                }
                FaceSplit::Created(f) => {
                    self.add_face_split(id.backward(), face, true)?;
                    f
                }
            };
            (Some(newface), None)
        };

        if !face.is_universe() {
            self.notify(TopoGeomEvent::FaceSplit {
                split: face,
                new_face1: newface,
                new_face2: newface1,
            })?;
            if mode == FaceMode::NewFaces {
                self.backend.delete_faces_by_id(&[face])?;
                tracing::debug!(face = %face, "Dropped split face");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::TopologyArena;
    use crate::config::TopologyConfig;
    use approx::assert_relative_eq;
    use geo::Area;
    use geo_types::{coord, line_string};

    fn topo() -> Topology<TopologyArena> {
        Topology::new(
            TopologyArena::new(),
            TopologyConfig {
                name: "t".into(),
                srid: 0,
                precision: 0.0,
                has_z: false,
            },
        )
    }

    /// Square made of four edges around nodes at the corners of (0,0)-(10,10).
    fn square(t: &mut Topology<TopologyArena>, new_faces: bool) -> Vec<EdgeId> {
        let corners = [
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 10.0, y: 0.0 },
            coord! { x: 10.0, y: 10.0 },
            coord! { x: 0.0, y: 10.0 },
        ];
        let nodes: Vec<NodeId> = corners
            .iter()
            .map(|&c| t.add_iso_node(None, c, false).unwrap())
            .collect();
        (0..4)
            .map(|i| {
                let j = (i + 1) % 4;
                let line = LineString::new(vec![corners[i], corners[j]]);
                if new_faces {
                    t.add_edge_new_faces(nodes[i], nodes[j], &line, false).unwrap()
                } else {
                    t.add_edge_mod_face(nodes[i], nodes[j], &line, false).unwrap()
                }
            })
            .collect()
    }

    #[test]
    fn closing_a_ring_creates_one_face() {
        let mut t = topo();
        let edges = square(&mut t, true);
        assert_eq!(t.backend().face_count(), 1);
        let face = t.backend().faces().next().unwrap().id;
        for e in &edges {
            let edge = t.backend().edge(*e).unwrap();
            assert_eq!(edge.face_left, face);
            assert_eq!(edge.face_right, FaceId::UNIVERSE);
        }
        assert_relative_eq!(t.get_face_geometry(face).unwrap().unsigned_area(), 100.0);
    }

    #[test]
    fn splitting_a_face_replaces_it_in_new_faces_mode() {
        let mut t = topo();
        let edges = square(&mut t, true);
        let old = t.backend().edge(edges[0]).unwrap().face_left;
        let diag = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)];
        let start = t.backend().edge(edges[0]).unwrap().start_node;
        let end = t.backend().edge(edges[2]).unwrap().start_node;
        let d = t.add_edge_new_faces(start, end, &diag, false).unwrap();

        assert!(t.backend().face(old).is_none());
        assert_eq!(t.backend().face_count(), 2);
        let de = t.backend().edge(d).unwrap();
        assert_ne!(de.face_left, de.face_right);
        assert_relative_eq!(t.get_face_geometry(de.face_left).unwrap().unsigned_area(), 50.0);
        assert_relative_eq!(t.get_face_geometry(de.face_right).unwrap().unsigned_area(), 50.0);
        assert!(matches!(
            t.backend().journal().last(),
            Some(TopoGeomEvent::FaceSplit { split, .. }) if *split == old
        ));
    }

    #[test]
    fn splitting_a_face_keeps_it_in_mod_face_mode() {
        let mut t = topo();
        let edges = square(&mut t, false);
        let old = t.backend().edge(edges[0]).unwrap().face_left;
        let diag = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)];
        let start = t.backend().edge(edges[0]).unwrap().start_node;
        let end = t.backend().edge(edges[2]).unwrap().start_node;
        let d = t.add_edge_mod_face(start, end, &diag, false).unwrap();

        let de = t.backend().edge(d).unwrap();
        assert_eq!(de.face_right, old);
        assert_ne!(de.face_left, old);
        assert_eq!(t.backend().face_count(), 2);
    }

    #[test]
    fn nodes_in_different_faces_are_rejected() {
        let mut t = topo();
        square(&mut t, true);
        let inside = t.add_iso_node(None, coord! { x: 5.0, y: 5.0 }, false).unwrap();
        let outside = t.add_iso_node(None, coord! { x: 20.0, y: 5.0 }, false).unwrap();
        let line = line_string![(x: 5.0, y: 5.0), (x: 20.0, y: 5.0)];
        assert!(matches!(
            t.add_edge_new_faces(inside, outside, &line, true),
            Err(Error::EndnodesInDifferentFaces(..))
        ));
    }

    #[test]
    fn dangling_edge_inside_face_keeps_face() {
        let mut t = topo();
        let edges = square(&mut t, true);
        let face = t.backend().edge(edges[0]).unwrap().face_left;
        let inner = t.add_iso_node(None, coord! { x: 5.0, y: 5.0 }, false).unwrap();
        assert_eq!(t.backend().node(inner).unwrap().containing_face, Some(face));
        let corner = t.backend().edge(edges[0]).unwrap().start_node;
        let e = t
            .add_edge_new_faces(corner, inner, &line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 5.0)], false)
            .unwrap();
        let edge = t.backend().edge(e).unwrap();
        assert_eq!(edge.face_left, face);
        assert_eq!(edge.face_right, face);
        assert!(!t.backend().node(inner).unwrap().is_isolated());
    }
}
