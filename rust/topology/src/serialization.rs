// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON serialization for topology arenas.
//!
//! Snapshots carry every stored record plus the id sequences, so a restored
//! arena hands out the same ids the original would have. The node → edges
//! index is rebuilt on load.

use serde::{Deserialize, Serialize};

use crate::arena::TopologyArena;
use crate::error::{Error, Result};
use crate::records::{Edge, Face, Node, TopologyInfo};

/// Serializable representation of a topology arena.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub info: Option<TopologyInfo>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub faces: Vec<Face>,
    pub next_node: i64,
    pub next_edge: i64,
    pub next_face: i64,
}

impl TopologyArena {
    /// Serializes the arena to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = self.to_snapshot();
        serde_json::to_string_pretty(&snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn to_snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            info: self.info.clone(),
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
            faces: self.faces.values().cloned().collect(),
            next_node: self.next_node,
            next_edge: self.next_edge,
            next_face: self.next_face,
        }
    }

    /// Deserializes an arena from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: ArenaSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    fn from_snapshot(snap: ArenaSnapshot) -> Result<Self> {
        let mut arena = TopologyArena::new();
        arena.info = snap.info;

        for n in snap.nodes {
            if arena.nodes.insert(n.id, n).is_some() {
                return Err(Error::Serialization("duplicate node id".into()));
            }
        }
        for f in snap.faces {
            if f.id.is_universe() {
                return Err(Error::Serialization("universal face must not be stored".into()));
            }
            if arena.faces.insert(f.id, f).is_some() {
                return Err(Error::Serialization("duplicate face id".into()));
            }
        }
        for e in snap.edges {
            for n in [e.start_node, e.end_node] {
                if !arena.nodes.contains_key(&n) {
                    return Err(Error::Serialization(format!(
                        "edge {} references missing node {}",
                        e.id, n
                    )));
                }
            }
            arena.link_edge(&e);
            if arena.edges.insert(e.id, e).is_some() {
                return Err(Error::Serialization("duplicate edge id".into()));
            }
        }

        let max_node = arena.nodes.keys().next_back().map_or(0, |id| id.0);
        let max_edge = arena.edges.keys().next_back().map_or(0, |id| id.0);
        let max_face = arena.faces.keys().next_back().map_or(0, |id| id.0);
        arena.next_node = snap.next_node.max(max_node + 1);
        arena.next_edge = snap.next_edge.max(max_edge + 1);
        arena.next_face = snap.next_face.max(max_face + 1);

        tracing::debug!(
            nodes = arena.node_count(),
            edges = arena.edge_count(),
            faces = arena.face_count(),
            "Restored arena snapshot"
        );
        Ok(arena)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::keys::{EdgeId, FaceId, NodeId};
    use crate::records::NewNode;
    use geo_types::{coord, line_string, Rect};

    #[test]
    fn roundtrip_empty_arena() {
        let arena = TopologyArena::new();
        let json = arena.to_json().unwrap();
        let restored = TopologyArena::from_json(&json).unwrap();
        assert_eq!(restored.node_count(), 0);
        assert_eq!(restored.edge_count(), 0);
        assert_eq!(restored.face_count(), 0);
    }

    #[test]
    fn roundtrip_keeps_records_and_sequences() {
        let mut arena = TopologyArena::new();
        let n = arena
            .insert_nodes(&[
                NewNode {
                    geom: coord! { x: 0.0, y: 0.0 },
                    containing_face: None,
                },
                NewNode {
                    geom: coord! { x: 3.0, y: 4.0 },
                    containing_face: None,
                },
            ])
            .unwrap();
        let f = arena
            .insert_faces(&[Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 3.0, y: 4.0 })])
            .unwrap();
        let e = arena.get_next_edge_id().unwrap();
        arena
            .insert_edges(&[Edge {
                id: e,
                start_node: n[0],
                end_node: n[1],
                next_left: e.backward(),
                next_right: e.forward(),
                face_left: f[0],
                face_right: FaceId::UNIVERSE,
                geom: line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)],
            }])
            .unwrap();

        let mut restored = TopologyArena::from_json(&arena.to_json().unwrap()).unwrap();
        assert_eq!(restored.edge(e), arena.edge(e));
        assert_eq!(restored.face(f[0]), arena.face(f[0]));
        assert_eq!(restored.degree(NodeId(1)), 1);
        assert_eq!(restored.get_next_edge_id().unwrap(), EdgeId(2));
    }

    #[test]
    fn dangling_node_reference_is_rejected() {
        let json = r#"{
            "nodes": [],
            "edges": [{
                "id": 1, "start_node": 1, "end_node": 2,
                "next_left": -1, "next_right": 1,
                "face_left": 0, "face_right": 0,
                "geom": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}]
            }],
            "faces": [],
            "next_node": 1, "next_edge": 2, "next_face": 1
        }"#;
        assert!(matches!(
            TopologyArena::from_json(json),
            Err(Error::Serialization(_))
        ));
    }
}
