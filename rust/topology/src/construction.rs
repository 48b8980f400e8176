// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Isolated node and edge operations.
//!
//! Isolated elements touch nothing else in the topology: an isolated node
//! has no incident edge and records the face it lies in, an isolated edge
//! joins two such nodes and has the same face on both sides.

use geo_types::{Coord, LineString};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::keys::{EdgeId, FaceId, NodeId};
use crate::predicate::GeometryEngine;
use crate::records::{Edge, EdgeFields, NewNode, Node, NodeFields};
use crate::topology::Topology;

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    pub(crate) fn exists_coincident_node(&self, pt: Coord<f64>) -> Result<bool> {
        Ok(!self
            .backend
            .get_node_within_distance_2d(pt, 0.0, Some(1))?
            .is_empty())
    }

    pub(crate) fn exists_edge_intersecting_point(&self, pt: Coord<f64>) -> Result<bool> {
        Ok(!self
            .backend
            .get_edge_within_distance_2d(pt, 0.0, Some(1))?
            .is_empty())
    }

    /// Face containing `pt`, the universe when no stored face does.
    pub(crate) fn face_containing_point(&self, pt: Coord<f64>) -> Result<FaceId> {
        Ok(self
            .backend
            .get_face_containing_point(pt)?
            .unwrap_or(FaceId::UNIVERSE))
    }

    fn fetch_iso_node(&self, id: NodeId) -> Result<Node> {
        let node = self.fetch_node(id)?;
        if !node.is_isolated() {
            return Err(Error::NotIsolatedNode(id));
        }
        Ok(node)
    }

    /// Adds an isolated node at `pt`.
    ///
    /// With `face` unset the containing face is looked up. Unless
    /// `skip_checks` is set, the point must not touch an existing node or
    /// edge and must lie in `face` when one is given.
    pub fn add_iso_node(
        &mut self,
        face: Option<FaceId>,
        pt: Coord<f64>,
        skip_checks: bool,
    ) -> Result<NodeId> {
        if !skip_checks {
            if self.exists_coincident_node(pt)? {
                return Err(Error::CoincidentNode);
            }
            if self.exists_edge_intersecting_point(pt)? {
                return Err(Error::EdgeCrossesNode);
            }
        }

        let face = match face {
            None => self.face_containing_point(pt)?,
            Some(f) if skip_checks => f,
            Some(f) => {
                if self.face_containing_point(pt)? != f {
                    return Err(Error::NotWithinFace);
                }
                f
            }
        };

        let id = self
            .backend
            .insert_nodes(&[NewNode {
                geom: pt,
                containing_face: Some(face),
            }])?
            .first()
            .copied()
            .ok_or_else(|| Error::corrupted("node insertion returned no id"))?;
        tracing::info!(node = %id, face = %face, "Added isolated node");
        Ok(id)
    }

    /// Moves an isolated node to `pt`, which must stay within its face.
    pub fn move_iso_node(&mut self, id: NodeId, pt: Coord<f64>) -> Result<()> {
        let node = self.fetch_iso_node(id)?;
        if self.exists_coincident_node(pt)? {
            return Err(Error::CoincidentNode);
        }
        if self.exists_edge_intersecting_point(pt)? {
            return Err(Error::EdgeCrossesNode);
        }
        if Some(self.face_containing_point(pt)?) != node.containing_face {
            return Err(Error::NotWithinFace);
        }

        self.backend.update_nodes(
            &NodeFields::id(id),
            &NodeFields {
                geom: Some(pt),
                ..Default::default()
            },
            None,
        )?;
        tracing::info!(node = %id, x = pt.x, y = pt.y, "Moved isolated node");
        Ok(())
    }

    /// Removes an isolated node.
    pub fn remove_iso_node(&mut self, id: NodeId) -> Result<()> {
        self.fetch_iso_node(id)?;
        let n = self.backend.delete_nodes_by_id(&[id])?;
        if n != 1 {
            return Err(Error::corrupted(format!(
                "{n} nodes deleted when expecting 1"
            )));
        }
        tracing::info!(node = %id, "Removed isolated node");
        Ok(())
    }

    /// Adds an edge between two isolated nodes of the same face.
    pub fn add_iso_edge(
        &mut self,
        start: NodeId,
        end: NodeId,
        geom: &LineString<f64>,
    ) -> Result<EdgeId> {
        if start == end {
            return Err(Error::ClosedIsolatedEdge);
        }
        if !self.engine.is_simple(geom) {
            return Err(Error::CurveNotSimple);
        }

        let nodes = self.backend.get_node_by_id(&[start, end])?;
        let (Some(snode), Some(enode)) = (
            nodes.iter().find(|n| n.id == start),
            nodes.iter().find(|n| n.id == end),
        ) else {
            let missing = if nodes.iter().any(|n| n.id == start) {
                end
            } else {
                start
            };
            return Err(Error::NonExistentNode(missing));
        };

        let face = match (snode.containing_face, enode.containing_face) {
            (None, _) => return Err(Error::NotIsolatedNode(start)),
            (_, None) => return Err(Error::NotIsolatedNode(end)),
            (Some(a), Some(b)) if a != b => return Err(Error::NodesInDifferentFaces),
            (Some(a), Some(_)) => a,
        };
        if geom.0.first() != Some(&snode.geom) {
            return Err(Error::StartNodeMismatch);
        }
        if geom.0.last() != Some(&enode.geom) {
            return Err(Error::EndNodeMismatch);
        }

        self.check_edge_crossing(start, end, geom, None)?;

        let id = self.backend.get_next_edge_id()?;
        let inserted = self.backend.insert_edges(&[Edge {
            id,
            start_node: start,
            end_node: end,
            next_left: id.backward(),
            next_right: id.forward(),
            face_left: face,
            face_right: face,
            geom: geom.clone(),
        }])?;
        if inserted != 1 {
            return Err(Error::corrupted("insertion of isolated edge failed"));
        }

        self.set_node_face(start, None)?;
        self.set_node_face(end, None)?;
        tracing::info!(edge = %id, face = %face, "Added isolated edge");
        Ok(id)
    }

    /// Removes an isolated edge; its endpoints become isolated nodes in the
    /// face the edge was lying in.
    pub fn rem_iso_edge(&mut self, id: EdgeId) -> Result<()> {
        let edge = self.fetch_edge(id)?;
        if edge.face_left != edge.face_right {
            return Err(Error::NotIsolatedEdge(id));
        }
        let incident = self
            .backend
            .get_edge_by_node(&[edge.start_node, edge.end_node])?;
        if incident.iter().any(|e| e.id != id) {
            return Err(Error::NotIsolatedEdge(id));
        }

        let n = self.backend.delete_edges(&EdgeFields::id(id))?;
        if n != 1 {
            return Err(Error::corrupted(format!(
                "{n} edges deleted when expecting 1"
            )));
        }
        self.set_node_face(edge.start_node, Some(edge.face_left))?;
        if edge.end_node != edge.start_node {
            self.set_node_face(edge.end_node, Some(edge.face_left))?;
        }
        tracing::info!(edge = %id, "Removed isolated edge");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::TopologyArena;
    use crate::config::TopologyConfig;
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

    #[test]
    fn coincident_node_is_rejected() {
        let mut t = topo();
        t.add_iso_node(None, coord! { x: 1.0, y: 1.0 }, false).unwrap();
        assert!(matches!(
            t.add_iso_node(None, coord! { x: 1.0, y: 1.0 }, false),
            Err(Error::CoincidentNode)
        ));
        // checks skipped
        assert!(t
            .add_iso_node(Some(FaceId::UNIVERSE), coord! { x: 1.0, y: 1.0 }, true)
            .is_ok());
    }

    #[test]
    fn node_on_edge_is_rejected() {
        let mut t = topo();
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        let b = t.add_iso_node(None, coord! { x: 10.0, y: 0.0 }, false).unwrap();
        t.add_iso_edge(a, b, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)])
            .unwrap();
        assert!(matches!(
            t.add_iso_node(None, coord! { x: 5.0, y: 0.0 }, false),
            Err(Error::EdgeCrossesNode)
        ));
    }

    #[test]
    fn wrong_face_hint_is_rejected() {
        let mut t = topo();
        assert!(matches!(
            t.add_iso_node(Some(FaceId(3)), coord! { x: 0.0, y: 0.0 }, false),
            Err(Error::NotWithinFace)
        ));
    }

    #[test]
    fn iso_edge_checks() {
        let mut t = topo();
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        let b = t.add_iso_node(None, coord! { x: 10.0, y: 0.0 }, false).unwrap();
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];

        assert!(matches!(t.add_iso_edge(a, a, &line), Err(Error::ClosedIsolatedEdge)));
        assert!(matches!(
            t.add_iso_edge(a, NodeId(99), &line),
            Err(Error::NonExistentNode(NodeId(99)))
        ));
        assert!(matches!(
            t.add_iso_edge(b, a, &line),
            Err(Error::StartNodeMismatch)
        ));

        let e = t.add_iso_edge(a, b, &line).unwrap();
        let edge = t.backend().edge(e).unwrap();
        assert_eq!(edge.next_left, e.backward());
        assert_eq!(edge.next_right, e.forward());
        assert!(!t.backend().node(a).unwrap().is_isolated());
        assert!(matches!(
            t.add_iso_edge(a, b, &line),
            Err(Error::NotIsolatedNode(_))
        ));
    }

    #[test]
    fn move_and_remove_iso_node() {
        let mut t = topo();
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        t.move_iso_node(a, coord! { x: 2.0, y: 2.0 }).unwrap();
        assert_eq!(t.backend().node(a).unwrap().geom, coord! { x: 2.0, y: 2.0 });
        t.remove_iso_node(a).unwrap();
        assert!(matches!(
            t.remove_iso_node(a),
            Err(Error::NonExistentNode(_))
        ));
    }

    #[test]
    fn removing_iso_edge_isolates_its_nodes() {
        let mut t = topo();
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        let b = t.add_iso_node(None, coord! { x: 10.0, y: 0.0 }, false).unwrap();
        let e = t
            .add_iso_edge(a, b, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)])
            .unwrap();
        t.rem_iso_edge(e).unwrap();
        assert_eq!(t.backend().edge_count(), 0);
        assert_eq!(
            t.backend().node(a).unwrap().containing_face,
            Some(FaceId::UNIVERSE)
        );
        assert_eq!(
            t.backend().node(b).unwrap().containing_face,
            Some(FaceId::UNIVERSE)
        );
    }
}
