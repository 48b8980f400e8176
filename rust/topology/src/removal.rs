// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge removal, healing the faces on its two sides.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::geometry::rect_union;
use crate::keys::{EdgeId, FaceId};
use crate::predicate::GeometryEngine;
use crate::records::{EdgeFields, Face, NodeFields, TopoGeomEvent};
use crate::topology::Topology;

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// Removes an edge. When it separated two faces, the right one takes
    /// over the area of both. Returns the face now covering the edge.
    pub fn rem_edge_mod_face(&mut self, edge: EdgeId) -> Result<FaceId> {
        self.rem_edge(edge, true)
    }

    /// Removes an edge. When it separated two bounded faces, both are
    /// replaced by a new one, whose id is returned; otherwise returns the
    /// universe id.
    pub fn rem_edge_new_face(&mut self, edge: EdgeId) -> Result<FaceId> {
        self.rem_edge(edge, false)
    }

    /// Points every reference to faces `from` at `to`.
    fn replace_face_refs(&mut self, from: FaceId, to: FaceId) -> Result<()> {
        self.backend.update_edges(
            &EdgeFields::face_left(from),
            &EdgeFields::face_left(to),
            None,
        )?;
        self.backend.update_edges(
            &EdgeFields::face_right(from),
            &EdgeFields::face_right(to),
            None,
        )?;
        self.backend.update_nodes(
            &NodeFields::containing_face(Some(from)),
            &NodeFields::containing_face(Some(to)),
            None,
        )?;
        Ok(())
    }

    fn rem_edge(&mut self, id: EdgeId, mod_face: bool) -> Result<FaceId> {
        let edge = self.fetch_edge(id)?;
        self.backend
            .check_topo_geom_rem_edge(id, edge.face_left, edge.face_right)?;

        let fwd = id.forward();
        let bwd = id.backward();
        // what a ring reaching either end continues with once the edge is gone
        let after_end = if edge.next_left != fwd {
            edge.next_left
        } else {
            edge.next_right
        };
        let after_start = if edge.next_right != bwd {
            edge.next_right
        } else {
            edge.next_left
        };

        let mut nodes = vec![edge.start_node];
        if !edge.is_closed() {
            nodes.push(edge.end_node);
        }
        let mut start_edges = 0usize;
        let mut end_edges = 0usize;
        let mut relinks = Vec::new();
        for e in self.backend.get_edge_by_node(&nodes)? {
            if e.id == id {
                continue;
            }
            if e.start_node == edge.start_node || e.end_node == edge.start_node {
                start_edges += 1;
            }
            if e.start_node == edge.end_node || e.end_node == edge.end_node {
                end_edges += 1;
            }
            let mut upd = EdgeFields::default();
            if e.next_left == bwd {
                upd.next_left = Some(after_end);
            } else if e.next_left == fwd {
                upd.next_left = Some(after_start);
            }
            if e.next_right == bwd {
                upd.next_right = Some(after_end);
            } else if e.next_right == fwd {
                upd.next_right = Some(after_start);
            }
            if upd != EdgeFields::default() {
                relinks.push((e.id, upd));
            }
        }
        for (eid, upd) in relinks {
            tracing::debug!(edge = %eid, removed = %id, "Relinking around removed edge");
            self.update_edge(eid, upd)?;
        }

        let mut created = FaceId::UNIVERSE;
        let floodface = if edge.face_left == edge.face_right {
            edge.face_right
        } else {
            let flood = if edge.face_left.is_universe() || edge.face_right.is_universe() {
                FaceId::UNIVERSE
            } else {
                let faces = self
                    .backend
                    .get_face_by_id(&[edge.face_left, edge.face_right])?;
                let mbr_of = |f: FaceId| -> Result<_> {
                    let mut found = faces.iter().filter(|r| r.id == f);
                    match (found.next(), found.next()) {
                        (Some(r), None) => Ok(r.mbr),
                        (None, _) => Err(Error::corrupted(format!(
                            "no face has face_id={f} (side face of edge {id})"
                        ))),
                        _ => Err(Error::corrupted(format!(
                            "more than 1 face have face_id={f}"
                        ))),
                    }
                };
                let mbr = rect_union(&mbr_of(edge.face_left)?, &mbr_of(edge.face_right)?);
                if mod_face {
                    let n = self.backend.update_faces_by_id(&[Face {
                        id: edge.face_right,
                        mbr,
                    }])?;
                    if n != 1 {
                        return Err(Error::corrupted(format!(
                            "{n} faces updated when expecting 1"
                        )));
                    }
                    edge.face_right
                } else {
                    created = self
                        .backend
                        .insert_faces(&[mbr])?
                        .first()
                        .copied()
                        .ok_or_else(|| Error::corrupted("face insertion returned no id"))?;
                    created
                }
            };
            tracing::debug!(
                edge = %id,
                left = %edge.face_left,
                right = %edge.face_right,
                flood = %flood,
                "Healing faces"
            );

            if edge.face_left != flood {
                self.replace_face_refs(edge.face_left, flood)?;
            }
            if edge.face_right != flood {
                self.replace_face_refs(edge.face_right, flood)?;
            }
            self.notify(TopoGeomEvent::FaceHeal {
                face1: edge.face_right,
                face2: edge.face_left,
                new_face: flood,
            })?;
            flood
        };

        let n = self.backend.delete_edges(&EdgeFields::id(id))?;
        if n != 1 {
            return Err(Error::corrupted(format!(
                "{n} edges deleted when expecting 1"
            )));
        }

        if start_edges == 0 {
            self.set_node_face(edge.start_node, Some(floodface))?;
        }
        if !edge.is_closed() && end_edges == 0 {
            self.set_node_face(edge.end_node, Some(floodface))?;
        }

        if edge.face_left != edge.face_right {
            let doomed: Vec<FaceId> = [edge.face_right, edge.face_left]
                .into_iter()
                .filter(|&f| f != floodface)
                .collect();
            self.backend.delete_faces_by_id(&doomed)?;
        }

        tracing::info!(edge = %id, face = %floodface, "Removed edge");
        Ok(if mod_face { floodface } else { created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::TopologyArena;
    use crate::config::TopologyConfig;
    use crate::keys::NodeId;
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

    /// Square split by a vertical edge into two faces; returns the
    /// splitting edge.
    fn split_square(t: &mut Topology<TopologyArena>) -> EdgeId {
        let pts = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let n: Vec<NodeId> = pts
            .iter()
            .map(|&(x, y)| t.add_iso_node(None, coord! { x: x, y: y }, false).unwrap())
            .collect();
        let m1 = t.add_iso_node(None, coord! { x: 5.0, y: 0.0 }, false).unwrap();
        let m2 = t.add_iso_node(None, coord! { x: 5.0, y: 10.0 }, false).unwrap();
        t.add_edge_mod_face(n[0], m1, &line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)], false)
            .unwrap();
        t.add_edge_mod_face(m1, n[1], &line_string![(x: 5.0, y: 0.0), (x: 10.0, y: 0.0)], false)
            .unwrap();
        t.add_edge_mod_face(n[1], n[2], &line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 10.0)], false)
            .unwrap();
        t.add_edge_mod_face(n[2], m2, &line_string![(x: 10.0, y: 10.0), (x: 5.0, y: 10.0)], false)
            .unwrap();
        t.add_edge_mod_face(m2, n[3], &line_string![(x: 5.0, y: 10.0), (x: 0.0, y: 10.0)], false)
            .unwrap();
        t.add_edge_mod_face(n[3], n[0], &line_string![(x: 0.0, y: 10.0), (x: 0.0, y: 0.0)], false)
            .unwrap();
        t.add_edge_mod_face(m1, m2, &line_string![(x: 5.0, y: 0.0), (x: 5.0, y: 10.0)], false)
            .unwrap()
    }

    #[test]
    fn mod_face_keeps_right_face() {
        let mut t = topo();
        let e = split_square(&mut t);
        assert_eq!(t.backend().face_count(), 2);
        let right = t.backend().edge(e).unwrap().face_right;

        let flood = t.rem_edge_mod_face(e).unwrap();
        assert_eq!(flood, right);
        assert_eq!(t.backend().face_count(), 1);
        assert!(t.backend().face(right).is_some());
        assert!(t
            .backend()
            .edges()
            .all(|x| x.face_left == right || x.face_right == right));
        assert!(matches!(
            t.backend().journal().last(),
            Some(TopoGeomEvent::FaceHeal { new_face, .. }) if *new_face == right
        ));
    }

    #[test]
    fn new_face_replaces_both() {
        let mut t = topo();
        let e = split_square(&mut t);
        let before: Vec<FaceId> = t.backend().faces().map(|f| f.id).collect();

        let created = t.rem_edge_new_face(e).unwrap();
        assert!(!before.contains(&created));
        assert_eq!(t.backend().face_count(), 1);
        let mbr = t.backend().face(created).unwrap().mbr;
        assert_eq!(mbr.min(), coord! { x: 0.0, y: 0.0 });
        assert_eq!(mbr.max(), coord! { x: 10.0, y: 10.0 });
    }

    #[test]
    fn removing_last_edge_isolates_nodes() {
        let mut t = topo();
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        let b = t.add_iso_node(None, coord! { x: 10.0, y: 0.0 }, false).unwrap();
        let e = t
            .add_edge_new_faces(a, b, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
            .unwrap();
        assert_eq!(t.rem_edge_new_face(e).unwrap(), FaceId::UNIVERSE);
        assert_eq!(t.backend().node(a).unwrap().containing_face, Some(FaceId::UNIVERSE));
        assert_eq!(t.backend().node(b).unwrap().containing_face, Some(FaceId::UNIVERSE));
    }

    #[test]
    fn protected_edge_is_kept() {
        let mut t = topo();
        let e = split_square(&mut t);
        t.backend_mut().protect_edge(e);
        assert!(matches!(t.rem_edge_mod_face(e), Err(Error::Backend(_))));
        assert!(t.backend().edge(e).is_some());
    }
}
