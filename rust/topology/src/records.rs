// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stored records for nodes, edges and faces, and the field selectors used
//! to query and update them through the backend.

use geo_types::{Coord, LineString, Rect};
use serde::{Deserialize, Serialize};

use crate::keys::{DirectedEdge, EdgeId, FaceId, NodeId};

/// A node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub geom: Coord<f64>,
    /// Face containing an isolated node; `None` once edges are attached.
    pub containing_face: Option<FaceId>,
}

impl Node {
    pub fn is_isolated(&self) -> bool {
        self.containing_face.is_some()
    }
}

/// A node about to be inserted; the backend assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub geom: Coord<f64>,
    pub containing_face: Option<FaceId>,
}

/// An edge record of the winged-edge structure.
///
/// `next_left` is the edge following this one when walking the ring that
/// has `face_left` on its left, starting from this edge's end node.
/// `next_right` is the one following the reversed edge around `face_right`,
/// starting from this edge's start node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub start_node: NodeId,
    pub end_node: NodeId,
    pub next_left: DirectedEdge,
    pub next_right: DirectedEdge,
    pub face_left: FaceId,
    pub face_right: FaceId,
    pub geom: LineString<f64>,
}

impl Edge {
    pub fn is_closed(&self) -> bool {
        self.start_node == self.end_node
    }

    /// Same face on both sides.
    pub fn is_dangling(&self) -> bool {
        self.face_left == self.face_right
    }

    /// True when every `Some` member of `sel` equals this record's value.
    pub fn matches(&self, sel: &EdgeFields) -> bool {
        sel.id.map_or(true, |v| v == self.id)
            && sel.start_node.map_or(true, |v| v == self.start_node)
            && sel.end_node.map_or(true, |v| v == self.end_node)
            && sel.next_left.map_or(true, |v| v == self.next_left)
            && sel.next_right.map_or(true, |v| v == self.next_right)
            && sel.face_left.map_or(true, |v| v == self.face_left)
            && sel.face_right.map_or(true, |v| v == self.face_right)
            && sel.geom.as_ref().map_or(true, |g| *g == self.geom)
    }

    /// Overwrites this record with every `Some` member of `upd`.
    pub fn apply(&mut self, upd: &EdgeFields) {
        if let Some(v) = upd.id {
            self.id = v;
        }
        if let Some(v) = upd.start_node {
            self.start_node = v;
        }
        if let Some(v) = upd.end_node {
            self.end_node = v;
        }
        if let Some(v) = upd.next_left {
            self.next_left = v;
        }
        if let Some(v) = upd.next_right {
            self.next_right = v;
        }
        if let Some(v) = upd.face_left {
            self.face_left = v;
        }
        if let Some(v) = upd.face_right {
            self.face_right = v;
        }
        if let Some(g) = &upd.geom {
            self.geom = g.clone();
        }
    }
}

/// A face record. Face 0 is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: FaceId,
    pub mbr: Rect<f64>,
}

/// Optional edge members, used both as a selector and as new values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeFields {
    pub id: Option<EdgeId>,
    pub start_node: Option<NodeId>,
    pub end_node: Option<NodeId>,
    pub next_left: Option<DirectedEdge>,
    pub next_right: Option<DirectedEdge>,
    pub face_left: Option<FaceId>,
    pub face_right: Option<FaceId>,
    pub geom: Option<LineString<f64>>,
}

impl EdgeFields {
    pub fn id(id: EdgeId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn next_left(v: DirectedEdge) -> Self {
        Self {
            next_left: Some(v),
            ..Default::default()
        }
    }

    pub fn next_right(v: DirectedEdge) -> Self {
        Self {
            next_right: Some(v),
            ..Default::default()
        }
    }

    pub fn face_left(v: FaceId) -> Self {
        Self {
            face_left: Some(v),
            ..Default::default()
        }
    }

    pub fn face_right(v: FaceId) -> Self {
        Self {
            face_right: Some(v),
            ..Default::default()
        }
    }
}

/// Optional node members, used both as a selector and as new values.
///
/// `containing_face: Some(None)` selects (or sets) non-isolated nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeFields {
    pub id: Option<NodeId>,
    pub geom: Option<Coord<f64>>,
    pub containing_face: Option<Option<FaceId>>,
}

impl NodeFields {
    pub fn id(id: NodeId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn containing_face(face: Option<FaceId>) -> Self {
        Self {
            containing_face: Some(face),
            ..Default::default()
        }
    }
}

impl Node {
    pub fn matches(&self, sel: &NodeFields) -> bool {
        sel.id.map_or(true, |v| v == self.id)
            && sel.geom.map_or(true, |v| v == self.geom)
            && sel
                .containing_face
                .map_or(true, |v| v == self.containing_face)
    }

    pub fn apply(&mut self, upd: &NodeFields) {
        if let Some(v) = upd.id {
            self.id = v;
        }
        if let Some(v) = upd.geom {
            self.geom = v;
        }
        if let Some(v) = upd.containing_face {
            self.containing_face = v;
        }
    }
}

/// Per-topology metadata, immutable for the lifetime of a handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyInfo {
    pub name: String,
    pub srid: i32,
    /// Default snapping tolerance; 0 means "derive from coordinates".
    pub precision: f64,
    pub has_z: bool,
}

/// Bookkeeping notification sent to the backend so composite geometries
/// built on top of the primitives can follow structural edits.
///
/// A `None` new face means the corresponding side did not produce one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopoGeomEvent {
    EdgeSplit {
        split: EdgeId,
        new_edge1: EdgeId,
        new_edge2: Option<EdgeId>,
    },
    FaceSplit {
        split: FaceId,
        new_face1: Option<FaceId>,
        new_face2: Option<FaceId>,
    },
    EdgeHeal {
        edge1: EdgeId,
        edge2: EdgeId,
        new_edge: EdgeId,
    },
    FaceHeal {
        face1: FaceId,
        face2: FaceId,
        new_face: FaceId,
    },
}
