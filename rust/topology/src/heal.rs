// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merging of two edges meeting at a degree-2 node.

use geo_types::{Coord, LineString};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::keys::{DirectedEdge, EdgeId, NodeId};
use crate::predicate::GeometryEngine;
use crate::records::{Edge, EdgeFields, TopoGeomEvent};
use crate::topology::Topology;

/// Which ends of the two edges meet at the shared node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sharing {
    /// e1 end = e2 start
    EndStart,
    /// e1 end = e2 end
    EndEnd,
    /// e1 start = e2 start
    StartStart,
    /// e1 start = e2 end
    StartEnd,
}

impl Sharing {
    /// True when e2 runs against the merged edge.
    fn e2_reversed(self) -> bool {
        matches!(self, Sharing::EndEnd | Sharing::StartStart)
    }

    /// True when the shared node is the end node of e1.
    fn at_e1_end(self) -> bool {
        matches!(self, Sharing::EndStart | Sharing::EndEnd)
    }

    /// True when the shared node is the end node of e2.
    fn at_e2_end(self) -> bool {
        matches!(self, Sharing::EndEnd | Sharing::StartEnd)
    }
}

/// `a` followed by `b`, dropping the repeated junction vertex.
fn concat(a: &[Coord<f64>], b: &[Coord<f64>]) -> LineString<f64> {
    let mut pts = a.to_vec();
    let skip = usize::from(pts.last().is_some() && pts.last() == b.first());
    pts.extend_from_slice(&b[skip..]);
    LineString::new(pts)
}

/// Geometry, end nodes and outer links of the edge replacing `e1` and `e2`.
type Merged = (LineString<f64>, NodeId, NodeId, DirectedEdge, DirectedEdge);

fn merged(e1: &Edge, e2: &Edge, case: Sharing) -> Merged {
    let rev2: Vec<_> = e2.geom.0.iter().rev().copied().collect();
    match case {
        Sharing::EndStart => (
            concat(&e1.geom.0, &e2.geom.0),
            e1.start_node,
            e2.end_node,
            e2.next_left,
            e1.next_right,
        ),
        Sharing::EndEnd => (
            concat(&e1.geom.0, &rev2),
            e1.start_node,
            e2.start_node,
            e2.next_right,
            e1.next_right,
        ),
        Sharing::StartStart => (
            concat(&rev2, &e1.geom.0),
            e2.end_node,
            e1.end_node,
            e1.next_left,
            e2.next_left,
        ),
        Sharing::StartEnd => (
            concat(&e2.geom.0, &e1.geom.0),
            e2.start_node,
            e1.end_node,
            e1.next_left,
            e2.next_right,
        ),
    }
}

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// Merges `e2` into `e1`, which keeps its id. Returns the removed node.
    pub fn mod_edge_heal(&mut self, e1: EdgeId, e2: EdgeId) -> Result<NodeId> {
        let (node, _) = self.heal_edges(e1, e2, true)?;
        Ok(node)
    }

    /// Replaces `e1` and `e2` with a new edge, whose id is returned.
    pub fn new_edge_heal(&mut self, e1: EdgeId, e2: EdgeId) -> Result<EdgeId> {
        let (_, edge) = self.heal_edges(e1, e2, false)?;
        Ok(edge)
    }

    /// Edges other than `e1` and `e2` incident to `node`.
    fn other_edges_at(&self, node: NodeId, e1: EdgeId, e2: EdgeId) -> Result<Vec<EdgeId>> {
        let mut ids: Vec<EdgeId> = self
            .backend
            .get_edge_by_node(&[node])?
            .into_iter()
            .map(|e| e.id)
            .filter(|&id| id != e1 && id != e2)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn heal_edges(
        &mut self,
        eid1: EdgeId,
        eid2: EdgeId,
        mod_edge: bool,
    ) -> Result<(NodeId, EdgeId)> {
        if eid1 == eid2 {
            return Err(Error::SameEdge);
        }
        let edges = self.backend.get_edge_by_id(&[eid1, eid2])?;
        let pick = |id: EdgeId| -> Result<Edge> {
            let mut found = edges.iter().filter(|e| e.id == id);
            match (found.next(), found.next()) {
                (Some(e), None) => Ok(e.clone()),
                (None, _) => Err(Error::NonExistentEdge(id)),
                _ => Err(Error::corrupted(format!("multiple edges have id {id}"))),
            }
        };
        let e1 = pick(eid1)?;
        let e2 = pick(eid2)?;
        if e1.is_closed() {
            return Err(Error::ClosedEdge(eid1));
        }
        if e2.is_closed() {
            return Err(Error::ClosedEdge(eid2));
        }

        let mut others = Vec::new();
        let mut found = None;
        let end_case = if e1.end_node == e2.start_node {
            Some(Sharing::EndStart)
        } else if e1.end_node == e2.end_node {
            Some(Sharing::EndEnd)
        } else {
            None
        };
        if let Some(case) = end_case {
            let o = self.other_edges_at(e1.end_node, eid1, eid2)?;
            if o.is_empty() {
                found = Some((e1.end_node, case));
            }
            others.extend(o);
        }
        if found.is_none() {
            let start_case = if e1.start_node == e2.start_node {
                Some(Sharing::StartStart)
            } else if e1.start_node == e2.end_node {
                Some(Sharing::StartEnd)
            } else {
                None
            };
            if let Some(case) = start_case {
                let o = self.other_edges_at(e1.start_node, eid1, eid2)?;
                if o.is_empty() {
                    found = Some((e1.start_node, case));
                }
                others.extend(o);
            }
        }
        let Some((common, case)) = found else {
            if others.is_empty() {
                return Err(Error::NonConnectedEdges);
            }
            return Err(Error::OtherEdgesConnected(others));
        };

        self.backend.check_topo_geom_rem_node(common, eid1, eid2)?;
        tracing::debug!(e1 = %eid1, e2 = %eid2, node = %common, ?case, "Healing edges");

        let (geom, start_node, end_node, next_left, next_right) = merged(&e1, &e2, case);
        let new_id = if mod_edge {
            self.update_edge(
                eid1,
                EdgeFields {
                    start_node: Some(start_node),
                    end_node: Some(end_node),
                    next_left: Some(next_left),
                    next_right: Some(next_right),
                    geom: Some(geom),
                    ..Default::default()
                },
            )?;
            eid1
        } else {
            let id = self.backend.get_next_edge_id()?;
            let inserted = self.backend.insert_edges(&[Edge {
                id,
                start_node,
                end_node,
                next_left,
                next_right,
                face_left: e1.face_left,
                face_right: e1.face_right,
                geom,
            }])?;
            if inserted != 1 {
                return Err(Error::corrupted("insertion of healed edge failed"));
            }
            id
        };

        // references to the free end of e2, then of e1
        let e2_free = if case.at_e2_end() { eid2.forward() } else { eid2.backward() };
        let mut e2_new = if case.at_e2_end() { new_id.forward() } else { new_id.backward() };
        if case.e2_reversed() {
            e2_new = -e2_new;
        }
        let mut relinks = vec![(e2_free, e2_new)];
        if !mod_edge {
            if case.at_e1_end() {
                relinks.push((eid1.forward(), new_id.forward()));
            } else {
                relinks.push((eid1.backward(), new_id.backward()));
            }
        }
        for (from, to) in relinks {
            self.backend
                .update_edges(&EdgeFields::next_left(from), &EdgeFields::next_left(to), None)?;
            self.backend
                .update_edges(&EdgeFields::next_right(from), &EdgeFields::next_right(to), None)?;
        }

        self.backend.delete_edges(&EdgeFields::id(eid2))?;
        if !mod_edge {
            self.backend.delete_edges(&EdgeFields::id(eid1))?;
        }
        let n = self.backend.delete_nodes_by_id(&[common])?;
        if n != 1 {
            return Err(Error::corrupted(format!("{n} nodes deleted when expecting 1")));
        }

        self.notify(TopoGeomEvent::EdgeHeal {
            edge1: eid1,
            edge2: eid2,
            new_edge: new_id,
        })?;
        tracing::info!(e1 = %eid1, e2 = %eid2, edge = %new_id, node = %common, "Healed edges");
        Ok((common, new_id))
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

    /// a(0,0) -e1-> b(5,0) <-e2- c(10,0)
    fn opposed_pair(t: &mut Topology<TopologyArena>) -> (EdgeId, EdgeId, NodeId) {
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        let b = t.add_iso_node(None, coord! { x: 5.0, y: 0.0 }, false).unwrap();
        let c = t.add_iso_node(None, coord! { x: 10.0, y: 0.0 }, false).unwrap();
        let e1 = t
            .add_edge_mod_face(a, b, &line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)], false)
            .unwrap();
        let e2 = t
            .add_edge_mod_face(c, b, &line_string![(x: 10.0, y: 0.0), (x: 5.0, y: 0.0)], false)
            .unwrap();
        (e1, e2, b)
    }

    #[test]
    fn mod_heal_of_opposed_edges() {
        let mut t = topo();
        let (e1, e2, b) = opposed_pair(&mut t);
        assert_eq!(t.mod_edge_heal(e1, e2).unwrap(), b);

        assert!(t.backend().node(b).is_none());
        assert!(t.backend().edge(e2).is_none());
        let e = t.backend().edge(e1).unwrap();
        assert_eq!(e.geom, line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 10.0, y: 0.0)]);
        assert_eq!(e.next_left, e1.backward());
        assert_eq!(e.next_right, e1.forward());
        assert!(matches!(
            t.backend().journal().last(),
            Some(TopoGeomEvent::EdgeHeal { new_edge, .. }) if *new_edge == e1
        ));
    }

    #[test]
    fn new_heal_replaces_both() {
        let mut t = topo();
        let (e1, e2, _) = opposed_pair(&mut t);
        let n = t.new_edge_heal(e1, e2).unwrap();
        assert_eq!(t.backend().edge_count(), 1);
        let e = t.backend().edge(n).unwrap();
        assert_eq!(e.next_left, n.backward());
        assert_eq!(e.next_right, n.forward());
    }

    #[test]
    fn heal_rejections() {
        let mut t = topo();
        let (e1, e2, _) = opposed_pair(&mut t);
        assert!(matches!(t.mod_edge_heal(e1, e1), Err(Error::SameEdge)));
        assert!(matches!(
            t.mod_edge_heal(e1, EdgeId(77)),
            Err(Error::NonExistentEdge(EdgeId(77)))
        ));

        let d = t.add_iso_node(None, coord! { x: 5.0, y: 5.0 }, false).unwrap();
        let b = t.backend().edge(e1).unwrap().end_node;
        let e3 = t
            .add_edge_mod_face(b, d, &line_string![(x: 5.0, y: 0.0), (x: 5.0, y: 5.0)], false)
            .unwrap();
        assert!(matches!(
            t.mod_edge_heal(e1, e2),
            Err(Error::OtherEdgesConnected(ids)) if ids == vec![e3]
        ));

        let f = t.add_iso_node(None, coord! { x: 20.0, y: 0.0 }, false).unwrap();
        let g = t.add_iso_node(None, coord! { x: 30.0, y: 0.0 }, false).unwrap();
        let far = t
            .add_iso_edge(f, g, &line_string![(x: 20.0, y: 0.0), (x: 30.0, y: 0.0)])
            .unwrap();
        assert!(matches!(t.mod_edge_heal(e1, far), Err(Error::NonConnectedEdges)));
    }

    #[test]
    fn protected_node_blocks_heal() {
        let mut t = topo();
        let (e1, e2, b) = opposed_pair(&mut t);
        t.backend_mut().protect_node(b);
        assert!(matches!(t.mod_edge_heal(e1, e2), Err(Error::Backend(_))));
        assert!(t.backend().node(b).is_some());
    }
}
