// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Replacement of an edge geometry keeping the topology isomorphic.

use geo::Winding;
use geo_types::LineString;

use crate::adjacency::{init_edge_ends, EdgeEnd};
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::geometry::{interior_edge_point, line_bbox, rect_union};
use crate::keys::EdgeId;
use crate::predicate::GeometryEngine;
use crate::records::{Edge, EdgeFields, Face};
use crate::topology::Topology;

/// Ring swept by an edge: the line itself when closed, otherwise the line
/// closed back onto its first point.
fn motion_ring(line: &LineString<f64>, closed: bool) -> LineString<f64> {
    let mut ring = line.clone();
    if !closed {
        ring.close();
    }
    ring
}

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// Adjacent edges at both ends of `edge` if it had geometry `geom`.
    fn edge_ends_at(&self, edge: &Edge, geom: &LineString<f64>) -> Result<(EdgeEnd, EdgeEnd)> {
        let (mut span, mut epan) = init_edge_ends(geom)?;
        let closed = edge.is_closed();
        let other = closed.then_some(epan);
        self.find_adjacent_edges(edge.start_node, &mut span, other.as_ref(), Some(edge.id))?;
        let other = closed.then_some(span);
        self.find_adjacent_edges(edge.end_node, &mut epan, other.as_ref(), Some(edge.id))?;
        Ok((span, epan))
    }

    /// Replaces the geometry of `edge`.
    ///
    /// The new line must keep the endpoints, cross nothing, sweep over no
    /// node and leave the edge ordering around both endpoints unchanged.
    pub fn change_edge_geom(&mut self, edge: EdgeId, geom: &LineString<f64>) -> Result<()> {
        if !self.engine.is_simple(geom) {
            return Err(Error::CurveNotSimple);
        }
        let old = self.fetch_edge(edge)?;

        if old.geom.0.first() != geom.0.first() {
            return Err(Error::StartNodeMismatch);
        }
        if old.geom.0.len() < 2 {
            return Err(Error::corrupted(format!(
                "edge {} has less than 2 vertices",
                old.id
            )));
        }
        if geom.0.len() < 2 {
            return Err(Error::InvalidEdge("less than 2 vertices".into()));
        }
        if old.geom.0.last() != geom.0.last() {
            return Err(Error::EndNodeMismatch);
        }

        let closed = old.is_closed();
        if closed {
            if interior_edge_point(geom).is_none() {
                return Err(Error::InvalidEdge("no two distinct vertices exist".into()));
            }
            if old.geom.is_ccw() != geom.is_ccw() {
                return Err(Error::EdgeTwist(old.start_node));
            }
        }

        self.check_edge_crossing(old.start_node, old.end_node, geom, Some(edge))?;

        let (Some(obox), Some(nbox)) = (line_bbox(&old.geom), line_bbox(geom)) else {
            return Err(Error::InvalidEdge("empty geometry".into()));
        };
        let mbox = rect_union(&obox, &nbox);
        let oarea = motion_ring(&old.geom, closed);
        let narea = motion_ring(geom, closed);
        for node in self.backend.get_node_within_box_2d(&mbox, None)? {
            if node.id == old.start_node || node.id == old.end_node {
                continue;
            }
            let ocont = self.engine.ring_area_contains_point(&oarea, node.geom);
            let ncont = self.engine.ring_area_contains_point(&narea, node.geom);
            if ocont != ncont {
                tracing::debug!(node = %node.id, "Node swept by edge motion");
                return Err(Error::MotionCollision(node.geom));
            }
        }

        // other edges are looked up without `edge`, so both states can be
        // computed before writing
        let (span_pre, epan_pre) = self.edge_ends_at(&old, &old.geom)?;
        let (span_post, epan_post) = self.edge_ends_at(&old, geom)?;
        if span_pre.next_cw != span_post.next_cw || span_pre.next_ccw != span_post.next_ccw {
            return Err(Error::DispositionChanged {
                end: "start",
                node: old.start_node,
            });
        }
        if epan_pre.next_cw != epan_post.next_cw || epan_pre.next_ccw != epan_post.next_ccw {
            return Err(Error::DispositionChanged {
                end: "end",
                node: old.end_node,
            });
        }

        self.update_edge(
            edge,
            EdgeFields {
                geom: Some(geom.clone()),
                ..Default::default()
            },
        )?;

        let mut faces = Vec::with_capacity(2);
        if !old.face_left.is_universe() {
            faces.push(old.face_left);
        }
        if !old.face_right.is_universe() && old.face_right != old.face_left {
            faces.push(old.face_right);
        }
        let mut updates = Vec::with_capacity(faces.len());
        for face in faces {
            let mbr = self.face_shell_box(face)?.ok_or_else(|| {
                Error::corrupted(format!("face {face} has no area after edge change"))
            })?;
            updates.push(Face { id: face, mbr });
        }
        if !updates.is_empty() {
            let n = self.backend.update_faces_by_id(&updates)?;
            if n != updates.len() {
                return Err(Error::corrupted(format!(
                    "{n} faces updated when expecting {}",
                    updates.len()
                )));
            }
        }

        tracing::info!(edge = %edge, "Changed edge geometry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::TopologyArena;
    use crate::config::TopologyConfig;
    use crate::keys::{FaceId, NodeId};
    use approx::assert_relative_eq;
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

    fn node(t: &mut Topology<TopologyArena>, x: f64, y: f64) -> NodeId {
        t.add_iso_node(None, coord! { x: x, y: y }, false).unwrap()
    }

    #[test]
    fn endpoints_must_be_kept() {
        let mut t = topo();
        let a = node(&mut t, 0.0, 0.0);
        let b = node(&mut t, 10.0, 0.0);
        let e = t
            .add_iso_edge(a, b, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)])
            .unwrap();
        assert!(matches!(
            t.change_edge_geom(e, &line_string![(x: 1.0, y: 0.0), (x: 10.0, y: 0.0)]),
            Err(Error::StartNodeMismatch)
        ));
        assert!(matches!(
            t.change_edge_geom(e, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 1.0)]),
            Err(Error::EndNodeMismatch)
        ));
        t.change_edge_geom(
            e,
            &line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 3.0), (x: 10.0, y: 0.0)],
        )
        .unwrap();
        assert_eq!(t.backend().edge(e).unwrap().geom.0.len(), 3);
    }

    #[test]
    fn sweeping_over_a_node_is_rejected() {
        let mut t = topo();
        let a = node(&mut t, 0.0, 0.0);
        let b = node(&mut t, 10.0, 0.0);
        node(&mut t, 5.0, 2.0);
        let e = t
            .add_iso_edge(a, b, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)])
            .unwrap();
        let err = t
            .change_edge_geom(
                e,
                &line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 4.0), (x: 10.0, y: 0.0)],
            )
            .unwrap_err();
        assert!(matches!(err, Error::MotionCollision(c) if c == coord! { x: 5.0, y: 2.0 }));
        // other side is free
        t.change_edge_geom(
            e,
            &line_string![(x: 0.0, y: 0.0), (x: 5.0, y: -4.0), (x: 10.0, y: 0.0)],
        )
        .unwrap();
    }

    #[test]
    fn closed_edge_keeps_winding_and_face_box_follows() {
        let mut t = topo();
        let a = node(&mut t, 0.0, 0.0);
        let ring = line_string![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)
        ];
        let e = t.add_edge_mod_face(a, a, &ring, false).unwrap();
        let face = t.backend().edge(e).unwrap().face_left;
        assert_ne!(face, FaceId::UNIVERSE);

        let twisted = line_string![
            (x: 0.0, y: 0.0), (x: 0.0, y: 10.0), (x: 10.0, y: 10.0), (x: 10.0, y: 0.0), (x: 0.0, y: 0.0)
        ];
        assert!(matches!(
            t.change_edge_geom(e, &twisted),
            Err(Error::EdgeTwist(n)) if n == a
        ));

        let bigger = line_string![
            (x: 0.0, y: 0.0), (x: 20.0, y: 0.0), (x: 20.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)
        ];
        t.change_edge_geom(e, &bigger).unwrap();
        let mbr = t.backend().face(face).unwrap().mbr;
        assert_relative_eq!(mbr.max().x, 20.0);
    }

    #[test]
    fn reordering_around_an_endpoint_is_rejected() {
        let mut t = topo();
        let a = node(&mut t, 0.0, 0.0);
        let b = node(&mut t, 10.0, 0.0);
        let c = node(&mut t, 10.0, 10.0);
        let d = node(&mut t, 10.0, -10.0);
        let ab = t
            .add_edge_mod_face(a, b, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
            .unwrap();
        t.add_edge_mod_face(a, c, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)], false)
            .unwrap();
        t.add_edge_mod_face(a, d, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: -10.0)], false)
            .unwrap();
        // leaves `a` heading north, between the edges to c and d in the
        // other order
        let moved = line_string![
            (x: 0.0, y: 0.0), (x: 0.0, y: 20.0), (x: 20.0, y: 20.0), (x: 20.0, y: 0.0), (x: 10.0, y: 0.0)
        ];
        assert!(matches!(
            t.change_edge_geom(ab, &moved),
            Err(Error::DispositionChanged { end: "start", .. })
                | Err(Error::MotionCollision(_))
        ));
    }
}
