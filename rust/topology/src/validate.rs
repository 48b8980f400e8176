// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Consistency checks over a whole topology.
//!
//! [`validate_topology`] walks every stored record and reports what breaks
//! the winged-edge invariants: rings that do not close, ring members
//! disagreeing on the face they bound, isolation flags out of sync with
//! incident edges, edge endpoints off their nodes, and references to
//! faces that are not stored.

use geo_types::{Coord, Rect};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::backend::Backend;
use crate::error::Result;
use crate::keys::{DirectedEdge, EdgeId, FaceId, NodeId};
use crate::predicate::GeometryEngine;
use crate::records::Edge;
use crate::topology::Topology;

/// One violated invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Finding {
    /// Following next links from `start` does not come back to it.
    BrokenRing { start: DirectedEdge, reason: String },
    /// A ring member has a different face on the ring side.
    RingFaceMismatch {
        start: DirectedEdge,
        member: DirectedEdge,
        expected: FaceId,
        found: FaceId,
    },
    /// `containing_face` set on a node with edges, or unset on one without.
    IsolationMismatch { node: NodeId, degree: usize },
    /// Edge refers to a node that does not exist.
    MissingNode { edge: EdgeId, node: NodeId },
    /// First or last vertex differs from the node position.
    EndpointMismatch { edge: EdgeId, node: NodeId },
    /// Edge or node refers to a face that is not stored.
    DanglingFaceReference { face: FaceId, edge: Option<EdgeId>, node: Option<NodeId> },
}

/// Findings of [`validate_topology`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub nodes: usize,
    pub edges: usize,
    pub faces: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.findings.is_empty()
    }
}

fn everything() -> Rect<f64> {
    Rect::new(
        Coord {
            x: f64::MIN,
            y: f64::MIN,
        },
        Coord {
            x: f64::MAX,
            y: f64::MAX,
        },
    )
}

/// Node a directed edge arrives at, and the one it leaves from.
fn arrival(edge: &Edge, de: DirectedEdge) -> NodeId {
    if de.is_forward() {
        edge.end_node
    } else {
        edge.start_node
    }
}

fn departure(edge: &Edge, de: DirectedEdge) -> NodeId {
    arrival(edge, de.reversed())
}

/// Face on the left of a directed edge.
fn side_face(edge: &Edge, de: DirectedEdge) -> FaceId {
    if de.is_forward() {
        edge.face_left
    } else {
        edge.face_right
    }
}

fn next_of(edge: &Edge, de: DirectedEdge) -> DirectedEdge {
    if de.is_forward() {
        edge.next_left
    } else {
        edge.next_right
    }
}

/// Walks the ring of `start`, returning the first problem met.
fn check_ring(edges: &FxHashMap<EdgeId, Edge>, start: DirectedEdge) -> Option<Finding> {
    let limit = 2 * edges.len() + 1;
    let first = edges.get(&start.edge)?;
    let face = side_face(first, start);
    let mut cur = start;
    let mut cur_edge = first;
    for _ in 0..limit {
        let next = next_of(cur_edge, cur);
        let Some(next_edge) = edges.get(&next.edge) else {
            return Some(Finding::BrokenRing {
                start,
                reason: format!("{cur} links to missing edge {}", next.edge),
            });
        };
        if arrival(cur_edge, cur) != departure(next_edge, next) {
            return Some(Finding::BrokenRing {
                start,
                reason: format!("{cur} does not end where {next} starts"),
            });
        }
        if next == start {
            return None;
        }
        let found = side_face(next_edge, next);
        if found != face {
            return Some(Finding::RingFaceMismatch {
                start,
                member: next,
                expected: face,
                found,
            });
        }
        cur = next;
        cur_edge = next_edge;
    }
    Some(Finding::BrokenRing {
        start,
        reason: format!("no return after {limit} steps"),
    })
}

/// Checks the invariants of every node, edge and face of `topo`.
pub fn validate_topology<B: Backend, G: GeometryEngine>(
    topo: &Topology<B, G>,
) -> Result<ValidationReport> {
    let world = everything();
    let backend = topo.backend();
    let nodes = backend.get_node_within_box_2d(&world, None)?;
    let edges: FxHashMap<EdgeId, Edge> = backend
        .get_edge_within_box_2d(&world, None)?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();
    let faces: FxHashSet<FaceId> = backend
        .get_face_within_box_2d(&world, None)?
        .into_iter()
        .map(|f| f.id)
        .collect();
    let known_face = |f: FaceId| f.is_universe() || faces.contains(&f);

    let mut report = ValidationReport {
        nodes: nodes.len(),
        edges: edges.len(),
        faces: faces.len(),
        findings: Vec::new(),
    };
    let node_geom: FxHashMap<NodeId, Coord<f64>> = nodes.iter().map(|n| (n.id, n.geom)).collect();
    let mut degree: FxHashMap<NodeId, usize> = FxHashMap::default();

    let mut ids: Vec<&EdgeId> = edges.keys().collect();
    ids.sort_unstable();
    for id in ids {
        let edge = &edges[id];
        for (node, vertex) in [
            (edge.start_node, edge.geom.0.first()),
            (edge.end_node, edge.geom.0.last()),
        ] {
            *degree.entry(node).or_default() += 1;
            match node_geom.get(&node) {
                None => report.findings.push(Finding::MissingNode { edge: edge.id, node }),
                Some(p) if Some(p) != vertex => report
                    .findings
                    .push(Finding::EndpointMismatch { edge: edge.id, node }),
                Some(_) => {}
            }
        }
        for face in [edge.face_left, edge.face_right] {
            if !known_face(face) {
                report.findings.push(Finding::DanglingFaceReference {
                    face,
                    edge: Some(edge.id),
                    node: None,
                });
            }
        }
        for de in [edge.id.forward(), edge.id.backward()] {
            if let Some(finding) = check_ring(&edges, de) {
                report.findings.push(finding);
            }
        }
    }

    for node in &nodes {
        let d = degree.get(&node.id).copied().unwrap_or(0);
        if node.is_isolated() != (d == 0) {
            report
                .findings
                .push(Finding::IsolationMismatch { node: node.id, degree: d });
        }
        if let Some(face) = node.containing_face {
            if !known_face(face) {
                report.findings.push(Finding::DanglingFaceReference {
                    face,
                    edge: None,
                    node: Some(node.id),
                });
            }
        }
    }

    if !report.is_valid() {
        tracing::debug!(findings = report.findings.len(), "Topology validation failed");
    }
    Ok(report)
}
