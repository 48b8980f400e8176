// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge splitting at a point.

use geo_types::{Coord, LineString};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::keys::{EdgeId, NodeId};
use crate::predicate::GeometryEngine;
use crate::records::{Edge, EdgeFields, NewNode, TopoGeomEvent};
use crate::topology::Topology;

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// Fetches `edge` and cuts its geometry at `pt`.
    fn edge_split(
        &self,
        edge: EdgeId,
        pt: Coord<f64>,
        skip_checks: bool,
    ) -> Result<(Edge, LineString<f64>, LineString<f64>)> {
        let old = self.fetch_edge(edge)?;
        if !skip_checks && self.exists_coincident_node(pt)? {
            return Err(Error::CoincidentNode);
        }
        let (first, second) = self
            .engine
            .split_line(&old.geom, pt)
            .ok_or(Error::PointNotOnEdge)?;
        Ok((old, first, second))
    }

    fn insert_split_node(&mut self, pt: Coord<f64>) -> Result<NodeId> {
        self.backend
            .insert_nodes(&[NewNode {
                geom: pt,
                containing_face: None,
            }])?
            .first()
            .copied()
            .ok_or_else(|| Error::corrupted("node insertion returned no id"))
    }

    /// Splits an edge at `pt`, keeping its id for the part from its start
    /// node to the new node. Returns the new node.
    pub fn mod_edge_split(
        &mut self,
        edge: EdgeId,
        pt: Coord<f64>,
        skip_checks: bool,
    ) -> Result<NodeId> {
        let (old, first, second) = self.edge_split(edge, pt, skip_checks)?;
        let node = self.insert_split_node(pt)?;

        let new_id = self.backend.get_next_edge_id()?;
        let new_edge = Edge {
            id: new_id,
            start_node: node,
            end_node: old.end_node,
            next_left: if old.next_left == old.id.backward() {
                new_id.backward()
            } else {
                old.next_left
            },
            next_right: old.id.backward(),
            face_left: old.face_left,
            face_right: old.face_right,
            geom: second,
        };
        if self.backend.insert_edges(&[new_edge])? != 1 {
            return Err(Error::corrupted("insertion of split edge failed"));
        }

        self.update_edge(
            old.id,
            EdgeFields {
                geom: Some(first),
                next_left: Some(new_id.forward()),
                end_node: Some(node),
                ..Default::default()
            },
        )?;

        let exclude = EdgeFields::id(new_id);
        self.backend.update_edges(
            &EdgeFields {
                next_right: Some(old.id.backward()),
                start_node: Some(old.end_node),
                ..Default::default()
            },
            &EdgeFields::next_right(new_id.backward()),
            Some(&exclude),
        )?;
        self.backend.update_edges(
            &EdgeFields {
                next_left: Some(old.id.backward()),
                end_node: Some(old.end_node),
                ..Default::default()
            },
            &EdgeFields::next_left(new_id.backward()),
            Some(&exclude),
        )?;

        self.notify(TopoGeomEvent::EdgeSplit {
            split: old.id,
            new_edge1: new_id,
            new_edge2: None,
        })?;
        tracing::info!(edge = %old.id, new_edge = %new_id, node = %node, "Split edge");
        Ok(node)
    }

    /// Splits an edge at `pt`, replacing it with two new edges. Returns the
    /// new node.
    pub fn new_edges_split(
        &mut self,
        edge: EdgeId,
        pt: Coord<f64>,
        skip_checks: bool,
    ) -> Result<NodeId> {
        let (old, first, second) = self.edge_split(edge, pt, skip_checks)?;
        let node = self.insert_split_node(pt)?;

        self.backend.delete_edges(&EdgeFields::id(old.id))?;

        let e0 = self.backend.get_next_edge_id()?;
        let e1 = self.backend.get_next_edge_id()?;
        let fwd = old.id.forward();
        let bwd = old.id.backward();

        let first_edge = Edge {
            id: e0,
            start_node: old.start_node,
            end_node: node,
            next_left: e1.forward(),
            next_right: if old.next_right == fwd {
                e0.forward()
            } else if old.next_right == bwd {
                e1.backward()
            } else {
                old.next_right
            },
            face_left: old.face_left,
            face_right: old.face_right,
            geom: first,
        };
        let second_edge = Edge {
            id: e1,
            start_node: node,
            end_node: old.end_node,
            next_left: if old.next_left == bwd {
                e1.backward()
            } else if old.next_left == fwd {
                e0.forward()
            } else {
                old.next_left
            },
            next_right: e0.backward(),
            face_left: old.face_left,
            face_right: old.face_right,
            geom: second,
        };
        if self.backend.insert_edges(&[first_edge, second_edge])? != 2 {
            return Err(Error::corrupted("insertion of split edges failed"));
        }

        // every reference to the old edge now points at the half touching
        // the same node
        let relinks = [
            (
                EdgeFields {
                    next_right: Some(fwd),
                    start_node: Some(old.start_node),
                    ..Default::default()
                },
                EdgeFields::next_right(e0.forward()),
            ),
            (
                EdgeFields {
                    next_right: Some(bwd),
                    start_node: Some(old.end_node),
                    ..Default::default()
                },
                EdgeFields::next_right(e1.backward()),
            ),
            (
                EdgeFields {
                    next_left: Some(fwd),
                    end_node: Some(old.start_node),
                    ..Default::default()
                },
                EdgeFields::next_left(e0.forward()),
            ),
            (
                EdgeFields {
                    next_left: Some(bwd),
                    end_node: Some(old.end_node),
                    ..Default::default()
                },
                EdgeFields::next_left(e1.backward()),
            ),
        ];
        for (sel, upd) in &relinks {
            self.backend.update_edges(sel, upd, None)?;
        }

        self.notify(TopoGeomEvent::EdgeSplit {
            split: old.id,
            new_edge1: e0,
            new_edge2: Some(e1),
        })?;
        tracing::info!(edge = %old.id, first = %e0, second = %e1, node = %node, "Split edge into new edges");
        Ok(node)
    }
}
