// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Storage interface consumed by the topology engine.
//!
//! The engine never holds records across operations: every read and write
//! goes through a [`Backend`] handed to [`Topology`](crate::Topology) at
//! construction. Implementations own transactions; an operation that fails
//! halfway leaves whatever it already wrote for the caller to roll back.

use geo_types::{Coord, Rect};

use crate::error::BackendError;
use crate::keys::{DirectedEdge, EdgeId, FaceId, NodeId};
use crate::records::{
    Edge, EdgeFields, Face, NewNode, Node, NodeFields, TopoGeomEvent, TopologyInfo,
};

/// Result of a backend call.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Persistence port for nodes, edges and faces.
///
/// `limit` arguments cap the number of returned records (`None` = all).
pub trait Backend {
    /// Reads metadata of a named topology.
    fn load_topology(&self, name: &str) -> BackendResult<TopologyInfo>;

    // --- Lookup by id ---

    fn get_node_by_id(&self, ids: &[NodeId]) -> BackendResult<Vec<Node>>;
    fn get_edge_by_id(&self, ids: &[EdgeId]) -> BackendResult<Vec<Edge>>;
    fn get_face_by_id(&self, ids: &[FaceId]) -> BackendResult<Vec<Face>>;

    // --- Spatial lookup ---

    /// Nodes whose point falls in `bbox` (boundary included).
    fn get_node_within_box_2d(&self, bbox: &Rect<f64>, limit: Option<usize>)
        -> BackendResult<Vec<Node>>;

    /// Edges whose bounding box intersects `bbox`.
    fn get_edge_within_box_2d(&self, bbox: &Rect<f64>, limit: Option<usize>)
        -> BackendResult<Vec<Edge>>;

    /// Faces whose bounding box intersects `bbox`.
    fn get_face_within_box_2d(&self, bbox: &Rect<f64>, limit: Option<usize>)
        -> BackendResult<Vec<Face>>;

    fn get_node_within_distance_2d(
        &self,
        pt: Coord<f64>,
        dist: f64,
        limit: Option<usize>,
    ) -> BackendResult<Vec<Node>>;

    fn get_edge_within_distance_2d(
        &self,
        pt: Coord<f64>,
        dist: f64,
        limit: Option<usize>,
    ) -> BackendResult<Vec<Edge>>;

    /// Face whose area strictly contains `pt`; `None` means the universe.
    fn get_face_containing_point(&self, pt: Coord<f64>) -> BackendResult<Option<FaceId>>;

    // --- Lookup by relation ---

    /// Edges starting or ending at any of `nodes`.
    fn get_edge_by_node(&self, nodes: &[NodeId]) -> BackendResult<Vec<Edge>>;

    /// Edges with any of `faces` on either side.
    fn get_edge_by_face(&self, faces: &[FaceId]) -> BackendResult<Vec<Edge>>;

    /// Isolated nodes contained in any of `faces`.
    fn get_node_by_face(&self, faces: &[FaceId]) -> BackendResult<Vec<Node>>;

    /// Walks `next_left`/`next_right` links from `start` until it comes back,
    /// returning the ring in traversal order. Errors after `limit` steps.
    fn get_ring_edges(
        &self,
        start: DirectedEdge,
        limit: Option<usize>,
    ) -> BackendResult<Vec<DirectedEdge>>;

    /// Reserves a fresh edge id.
    fn get_next_edge_id(&mut self) -> BackendResult<EdgeId>;

    // --- Writes ---

    /// Inserts nodes, returning the assigned ids in input order.
    fn insert_nodes(&mut self, nodes: &[NewNode]) -> BackendResult<Vec<NodeId>>;

    /// Inserts edges carrying ids obtained from [`Backend::get_next_edge_id`].
    fn insert_edges(&mut self, edges: &[Edge]) -> BackendResult<usize>;

    /// Inserts faces with the given bounding boxes, returning assigned ids.
    fn insert_faces(&mut self, mbrs: &[Rect<f64>]) -> BackendResult<Vec<FaceId>>;

    /// Sets `upd` on every edge matching `sel` and not matching `exclude`.
    fn update_edges(
        &mut self,
        sel: &EdgeFields,
        upd: &EdgeFields,
        exclude: Option<&EdgeFields>,
    ) -> BackendResult<usize>;

    /// Sets `upd` on every node matching `sel` and not matching `exclude`.
    fn update_nodes(
        &mut self,
        sel: &NodeFields,
        upd: &NodeFields,
        exclude: Option<&NodeFields>,
    ) -> BackendResult<usize>;

    /// Replaces the bounding box of each given face.
    fn update_faces_by_id(&mut self, faces: &[Face]) -> BackendResult<usize>;

    fn delete_nodes_by_id(&mut self, ids: &[NodeId]) -> BackendResult<usize>;
    fn delete_edges(&mut self, sel: &EdgeFields) -> BackendResult<usize>;
    fn delete_faces_by_id(&mut self, ids: &[FaceId]) -> BackendResult<usize>;

    // --- Composite geometry bookkeeping ---

    /// Notifies dependents of a structural edit.
    fn update_topo_geom(&mut self, _event: &TopoGeomEvent) -> BackendResult<()> {
        Ok(())
    }

    /// Refuses removal of an edge still referenced by composite geometries.
    /// `face_left`/`face_right` are the faces about to be merged.
    fn check_topo_geom_rem_edge(
        &self,
        _edge: EdgeId,
        _face_left: FaceId,
        _face_right: FaceId,
    ) -> BackendResult<()> {
        Ok(())
    }

    /// Refuses removal of a node joining two edges still referenced by
    /// composite geometries.
    fn check_topo_geom_rem_node(
        &self,
        _node: NodeId,
        _edge1: EdgeId,
        _edge2: EdgeId,
    ) -> BackendResult<()> {
        Ok(())
    }
}
