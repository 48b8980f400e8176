// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory storage for planar topology records.
//!
//! [`TopologyArena`] keeps nodes, edges and faces in ordered maps keyed by
//! integer id, with an upward node → edges index for incidence queries, and
//! implements [`Backend`] on top of them. Spatial queries scan linearly;
//! the arena is meant for tests, tooling and small datasets.

use std::collections::BTreeMap;

use geo::Intersects;
use geo_types::{Coord, LineString, Rect};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::backend::{Backend, BackendResult};
use crate::error::BackendError;
use crate::geometry::{distance, line_bbox, line_distance};
use crate::keys::{DirectedEdge, EdgeId, FaceId, NodeId};
use crate::predicate::{GeometryEngine, PlanarEngine};
use crate::records::{
    Edge, EdgeFields, Face, NewNode, Node, NodeFields, TopoGeomEvent, TopologyInfo,
};

/// Owner of every node, edge and face of one topology.
///
/// # Example
///
/// ```
/// use geo_types::coord;
/// use topo_lite_topology::{Backend, NewNode, TopologyArena};
///
/// let mut arena = TopologyArena::new();
/// let ids = arena
///     .insert_nodes(&[NewNode { geom: coord! { x: 1.0, y: 2.0 }, containing_face: None }])
///     .unwrap();
///
/// assert_eq!(arena.node_count(), 1);
/// assert_eq!(arena.node(ids[0]).unwrap().geom, coord! { x: 1.0, y: 2.0 });
/// ```
#[derive(Debug, Clone)]
pub struct TopologyArena {
    pub(crate) info: Option<TopologyInfo>,

    // Entity storage
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) edges: BTreeMap<EdgeId, Edge>,
    pub(crate) faces: BTreeMap<FaceId, Face>,

    // Upward adjacency: node → incident edges
    pub(crate) node_to_edges: FxHashMap<NodeId, FxHashSet<EdgeId>>,

    // Id sequences
    pub(crate) next_node: i64,
    pub(crate) next_edge: i64,
    pub(crate) next_face: i64,

    // Composite geometry bookkeeping
    pub(crate) journal: Vec<TopoGeomEvent>,
    pub(crate) protected_edges: FxHashSet<EdgeId>,
    pub(crate) protected_nodes: FxHashSet<NodeId>,
}

impl TopologyArena {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            info: None,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            faces: BTreeMap::new(),
            node_to_edges: FxHashMap::default(),
            next_node: 1,
            next_edge: 1,
            next_face: 1,
            journal: Vec::new(),
            protected_edges: FxHashSet::default(),
            protected_nodes: FxHashSet::default(),
        }
    }

    /// Creates an empty arena answering [`Backend::load_topology`] with `info`.
    pub fn with_info(info: TopologyInfo) -> Self {
        Self {
            info: Some(info),
            ..Self::new()
        }
    }

    // --- Accessors ---

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of stored faces (the universal face is never stored).
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of edges incident to a node.
    pub fn degree(&self, id: NodeId) -> usize {
        self.node_to_edges.get(&id).map_or(0, |s| s.len())
    }

    /// Composite geometry notifications received so far.
    pub fn journal(&self) -> &[TopoGeomEvent] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<TopoGeomEvent> {
        std::mem::take(&mut self.journal)
    }

    /// Marks an edge as used by a composite geometry, refusing its removal.
    pub fn protect_edge(&mut self, id: EdgeId) {
        self.protected_edges.insert(id);
    }

    /// Marks a node as joining edges of a composite geometry, refusing heals
    /// across it.
    pub fn protect_node(&mut self, id: NodeId) {
        self.protected_nodes.insert(id);
    }

    // --- Index maintenance ---

    pub(crate) fn link_edge(&mut self, edge: &Edge) {
        self.node_to_edges
            .entry(edge.start_node)
            .or_default()
            .insert(edge.id);
        self.node_to_edges
            .entry(edge.end_node)
            .or_default()
            .insert(edge.id);
    }

    pub(crate) fn unlink_edge(&mut self, edge: &Edge) {
        for n in [edge.start_node, edge.end_node] {
            if let Some(set) = self.node_to_edges.get_mut(&n) {
                set.remove(&edge.id);
                if set.is_empty() {
                    self.node_to_edges.remove(&n);
                }
            }
        }
    }

    /// Edges of `face`, as noded linework.
    fn face_linework(&self, face: FaceId) -> Vec<LineString<f64>> {
        self.edges
            .values()
            .filter(|e| e.face_left == face || e.face_right == face)
            .map(|e| e.geom.clone())
            .collect()
    }
}

impl Default for TopologyArena {
    fn default() -> Self {
        Self::new()
    }
}

fn take<T>(iter: impl Iterator<Item = T>, limit: Option<usize>) -> Vec<T> {
    match limit {
        Some(n) => iter.take(n).collect(),
        None => iter.collect(),
    }
}

impl Backend for TopologyArena {
    fn load_topology(&self, name: &str) -> BackendResult<TopologyInfo> {
        match &self.info {
            Some(info) if info.name == name => Ok(info.clone()),
            _ => Err(BackendError::new(format!("no topology named {name:?}"))),
        }
    }

    fn get_node_by_id(&self, ids: &[NodeId]) -> BackendResult<Vec<Node>> {
        Ok(ids.iter().filter_map(|id| self.nodes.get(id).cloned()).collect())
    }

    fn get_edge_by_id(&self, ids: &[EdgeId]) -> BackendResult<Vec<Edge>> {
        Ok(ids.iter().filter_map(|id| self.edges.get(id).cloned()).collect())
    }

    fn get_face_by_id(&self, ids: &[FaceId]) -> BackendResult<Vec<Face>> {
        Ok(ids.iter().filter_map(|id| self.faces.get(id).cloned()).collect())
    }

    fn get_node_within_box_2d(
        &self,
        bbox: &Rect<f64>,
        limit: Option<usize>,
    ) -> BackendResult<Vec<Node>> {
        let iter = self
            .nodes
            .values()
            .filter(|n| bbox.intersects(&n.geom))
            .cloned();
        Ok(take(iter, limit))
    }

    fn get_edge_within_box_2d(
        &self,
        bbox: &Rect<f64>,
        limit: Option<usize>,
    ) -> BackendResult<Vec<Edge>> {
        let iter = self
            .edges
            .values()
            .filter(|e| line_bbox(&e.geom).map_or(false, |b| b.intersects(bbox)))
            .cloned();
        Ok(take(iter, limit))
    }

    fn get_face_within_box_2d(
        &self,
        bbox: &Rect<f64>,
        limit: Option<usize>,
    ) -> BackendResult<Vec<Face>> {
        let iter = self
            .faces
            .values()
            .filter(|f| f.mbr.intersects(bbox))
            .cloned();
        Ok(take(iter, limit))
    }

    fn get_node_within_distance_2d(
        &self,
        pt: Coord<f64>,
        dist: f64,
        limit: Option<usize>,
    ) -> BackendResult<Vec<Node>> {
        let iter = self
            .nodes
            .values()
            .filter(|n| distance(n.geom, pt) <= dist)
            .cloned();
        Ok(take(iter, limit))
    }

    fn get_edge_within_distance_2d(
        &self,
        pt: Coord<f64>,
        dist: f64,
        limit: Option<usize>,
    ) -> BackendResult<Vec<Edge>> {
        let iter = self
            .edges
            .values()
            .filter(|e| line_distance(&e.geom, pt) <= dist)
            .cloned();
        Ok(take(iter, limit))
    }

    fn get_face_containing_point(&self, pt: Coord<f64>) -> BackendResult<Option<FaceId>> {
        let engine = PlanarEngine;
        for face in self.faces.values() {
            if !face.mbr.intersects(&pt) {
                continue;
            }
            let area = engine.build_area(&self.face_linework(face.id));
            if area
                .0
                .iter()
                .any(|poly| engine.polygon_contains_point(poly, pt))
            {
                return Ok(Some(face.id));
            }
        }
        Ok(None)
    }

    fn get_edge_by_node(&self, nodes: &[NodeId]) -> BackendResult<Vec<Edge>> {
        let mut ids: Vec<EdgeId> = nodes
            .iter()
            .filter_map(|n| self.node_to_edges.get(n))
            .flat_map(|set| set.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.edges.get(&id).cloned())
            .collect())
    }

    fn get_edge_by_face(&self, faces: &[FaceId]) -> BackendResult<Vec<Edge>> {
        Ok(self
            .edges
            .values()
            .filter(|e| faces.contains(&e.face_left) || faces.contains(&e.face_right))
            .cloned()
            .collect())
    }

    fn get_node_by_face(&self, faces: &[FaceId]) -> BackendResult<Vec<Node>> {
        Ok(self
            .nodes
            .values()
            .filter(|n| n.containing_face.map_or(false, |f| faces.contains(&f)))
            .cloned()
            .collect())
    }

    fn get_ring_edges(
        &self,
        start: DirectedEdge,
        limit: Option<usize>,
    ) -> BackendResult<Vec<DirectedEdge>> {
        let cap = limit.unwrap_or(2 * self.edges.len() + 1);
        let mut ring = Vec::new();
        let mut cur = start;
        loop {
            ring.push(cur);
            if ring.len() > cap {
                return Err(BackendError::new(format!(
                    "ring of edge {start} exceeds {cap} edges"
                )));
            }
            let edge = self.edges.get(&cur.edge).ok_or_else(|| {
                BackendError::new(format!("ring of edge {start} references missing edge {}", cur.edge))
            })?;
            let next = if cur.is_forward() {
                edge.next_left
            } else {
                edge.next_right
            };
            if next == start {
                return Ok(ring);
            }
            cur = next;
        }
    }

    fn get_next_edge_id(&mut self) -> BackendResult<EdgeId> {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        Ok(id)
    }

    fn insert_nodes(&mut self, nodes: &[NewNode]) -> BackendResult<Vec<NodeId>> {
        let mut ids = Vec::with_capacity(nodes.len());
        for n in nodes {
            let id = NodeId(self.next_node);
            self.next_node += 1;
            self.nodes.insert(
                id,
                Node {
                    id,
                    geom: n.geom,
                    containing_face: n.containing_face,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    fn insert_edges(&mut self, edges: &[Edge]) -> BackendResult<usize> {
        if let Some(dup) = edges.iter().find(|e| self.edges.contains_key(&e.id)) {
            return Err(BackendError::new(format!("duplicate edge id {}", dup.id)));
        }
        for e in edges {
            self.next_edge = self.next_edge.max(e.id.0 + 1);
            self.link_edge(e);
            self.edges.insert(e.id, e.clone());
        }
        Ok(edges.len())
    }

    fn insert_faces(&mut self, mbrs: &[Rect<f64>]) -> BackendResult<Vec<FaceId>> {
        let mut ids = Vec::with_capacity(mbrs.len());
        for mbr in mbrs {
            let id = FaceId(self.next_face);
            self.next_face += 1;
            self.faces.insert(id, Face { id, mbr: *mbr });
            ids.push(id);
        }
        Ok(ids)
    }

    fn update_edges(
        &mut self,
        sel: &EdgeFields,
        upd: &EdgeFields,
        exclude: Option<&EdgeFields>,
    ) -> BackendResult<usize> {
        if upd.id.is_some() {
            return Err(BackendError::new("edge ids are immutable"));
        }
        let ids: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.matches(sel) && !exclude.map_or(false, |x| e.matches(x)))
            .map(|e| e.id)
            .collect();
        let relinks = upd.start_node.is_some() || upd.end_node.is_some();
        for id in &ids {
            let Some(edge) = self.edges.get(id).cloned() else {
                continue;
            };
            let mut updated = edge.clone();
            updated.apply(upd);
            if relinks {
                self.unlink_edge(&edge);
                self.link_edge(&updated);
            }
            self.edges.insert(*id, updated);
        }
        Ok(ids.len())
    }

    fn update_nodes(
        &mut self,
        sel: &NodeFields,
        upd: &NodeFields,
        exclude: Option<&NodeFields>,
    ) -> BackendResult<usize> {
        if upd.id.is_some() {
            return Err(BackendError::new("node ids are immutable"));
        }
        let mut count = 0;
        for node in self.nodes.values_mut() {
            if node.matches(sel) && !exclude.map_or(false, |x| node.matches(x)) {
                node.apply(upd);
                count += 1;
            }
        }
        Ok(count)
    }

    fn update_faces_by_id(&mut self, faces: &[Face]) -> BackendResult<usize> {
        let mut count = 0;
        for f in faces {
            if let Some(stored) = self.faces.get_mut(&f.id) {
                stored.mbr = f.mbr;
                count += 1;
            }
        }
        Ok(count)
    }

    fn delete_nodes_by_id(&mut self, ids: &[NodeId]) -> BackendResult<usize> {
        Ok(ids.iter().filter(|id| self.nodes.remove(id).is_some()).count())
    }

    fn delete_edges(&mut self, sel: &EdgeFields) -> BackendResult<usize> {
        let doomed: Vec<Edge> = self
            .edges
            .values()
            .filter(|e| e.matches(sel))
            .cloned()
            .collect();
        for e in &doomed {
            self.unlink_edge(e);
            self.edges.remove(&e.id);
        }
        Ok(doomed.len())
    }

    fn delete_faces_by_id(&mut self, ids: &[FaceId]) -> BackendResult<usize> {
        Ok(ids.iter().filter(|id| self.faces.remove(id).is_some()).count())
    }

    fn update_topo_geom(&mut self, event: &TopoGeomEvent) -> BackendResult<()> {
        self.journal.push(event.clone());
        Ok(())
    }

    fn check_topo_geom_rem_edge(
        &self,
        edge: EdgeId,
        _face_left: FaceId,
        _face_right: FaceId,
    ) -> BackendResult<()> {
        if self.protected_edges.contains(&edge) {
            return Err(BackendError::new(format!(
                "TopoGeom uses edge {} and would be broken by its removal",
                edge.0
            )));
        }
        Ok(())
    }

    fn check_topo_geom_rem_node(
        &self,
        node: NodeId,
        edge1: EdgeId,
        edge2: EdgeId,
    ) -> BackendResult<()> {
        if self.protected_nodes.contains(&node) {
            return Err(BackendError::new(format!(
                "TopoGeom uses node {} joining edges {} and {}",
                node.0, edge1.0, edge2.0
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, line_string};

    fn arena_with_edge() -> TopologyArena {
        let mut arena = TopologyArena::new();
        let ids = arena
            .insert_nodes(&[
                NewNode {
                    geom: coord! { x: 0.0, y: 0.0 },
                    containing_face: None,
                },
                NewNode {
                    geom: coord! { x: 4.0, y: 0.0 },
                    containing_face: None,
                },
            ])
            .unwrap();
        let id = arena.get_next_edge_id().unwrap();
        arena
            .insert_edges(&[Edge {
                id,
                start_node: ids[0],
                end_node: ids[1],
                next_left: id.backward(),
                next_right: id.forward(),
                face_left: FaceId::UNIVERSE,
                face_right: FaceId::UNIVERSE,
                geom: line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)],
            }])
            .unwrap();
        arena
    }

    #[test]
    fn new_arena_is_empty() {
        let arena = TopologyArena::new();
        assert_eq!(arena.node_count(), 0);
        assert_eq!(arena.edge_count(), 0);
        assert_eq!(arena.face_count(), 0);
    }

    #[test]
    fn edge_index_follows_updates() {
        let mut arena = arena_with_edge();
        assert_eq!(arena.degree(NodeId(1)), 1);
        assert_eq!(arena.degree(NodeId(2)), 1);
        let n = arena
            .update_edges(
                &EdgeFields::id(EdgeId(1)),
                &EdgeFields {
                    end_node: Some(NodeId(1)),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(arena.degree(NodeId(2)), 0);
        assert_eq!(arena.get_edge_by_node(&[NodeId(1)]).unwrap().len(), 1);
    }

    #[test]
    fn update_respects_exclusion() {
        let mut arena = arena_with_edge();
        let n = arena
            .update_edges(
                &EdgeFields::default(),
                &EdgeFields::face_left(FaceId(9)),
                Some(&EdgeFields::id(EdgeId(1))),
            )
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(arena.edge(EdgeId(1)).unwrap().face_left, FaceId::UNIVERSE);
    }

    #[test]
    fn ring_of_isolated_edge_has_both_sides() {
        let arena = arena_with_edge();
        let ring = arena.get_ring_edges(EdgeId(1).forward(), None).unwrap();
        assert_eq!(ring, vec![EdgeId(1).forward(), EdgeId(1).backward()]);
    }

    #[test]
    fn ring_limit_is_enforced() {
        let arena = arena_with_edge();
        assert!(arena.get_ring_edges(EdgeId(1).forward(), Some(1)).is_err());
    }

    #[test]
    fn spatial_queries() {
        let arena = arena_with_edge();
        let near = arena
            .get_edge_within_distance_2d(coord! { x: 2.0, y: 0.5 }, 0.5, None)
            .unwrap();
        assert_eq!(near.len(), 1);
        let far = arena
            .get_node_within_distance_2d(coord! { x: 2.0, y: 0.5 }, 0.5, None)
            .unwrap();
        assert!(far.is_empty());
        let boxed = arena
            .get_node_within_box_2d(
                &Rect::new(coord! { x: 3.0, y: -1.0 }, coord! { x: 5.0, y: 1.0 }),
                None,
            )
            .unwrap();
        assert_eq!(boxed.len(), 1);
        assert_eq!(boxed[0].id, NodeId(2));
    }

    #[test]
    fn duplicate_edge_ids_are_rejected() {
        let mut arena = arena_with_edge();
        let copy = arena.edge(EdgeId(1)).unwrap().clone();
        assert!(arena.insert_edges(&[copy]).is_err());
    }

    #[test]
    fn protected_edges_refuse_removal() {
        let mut arena = arena_with_edge();
        arena.protect_edge(EdgeId(1));
        assert!(arena
            .check_topo_geom_rem_edge(EdgeId(1), FaceId::UNIVERSE, FaceId::UNIVERSE)
            .is_err());
    }
}
