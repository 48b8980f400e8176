// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for topology operations.

use geo_types::Coord;

use crate::keys::{EdgeId, FaceId, NodeId};

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a [`Backend`](crate::backend::Backend) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Broad class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed something malformed; never retried.
    Input,
    /// The edit would break the planar subdivision.
    Topological,
    /// Stored records contradict each other.
    Corrupted,
    /// The storage layer failed.
    Backend,
}

/// Errors that can occur during topology operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --- Input violations ---
    /// Edge geometry self-intersects.
    #[error("SQL/MM Spatial exception - curve not simple")]
    CurveNotSimple,

    /// A referenced node does not exist.
    #[error("SQL/MM Spatial exception - non-existent node {0}")]
    NonExistentNode(NodeId),

    /// A referenced edge does not exist.
    #[error("SQL/MM Spatial exception - non-existent edge {0}")]
    NonExistentEdge(EdgeId),

    /// A referenced face does not exist.
    #[error("SQL/MM Spatial exception - non-existent face {0}")]
    NonExistentFace(FaceId),

    #[error("SQL/MM Spatial exception - start node not geometry start point")]
    StartNodeMismatch,

    #[error("SQL/MM Spatial exception - end node not geometry end point")]
    EndNodeMismatch,

    /// The operation needs an isolated node.
    #[error("SQL/MM Spatial exception - not isolated node {0}")]
    NotIsolatedNode(NodeId),

    /// Isolated edges cannot start and end at the same node.
    #[error("Closed edges would not be isolated, try AddEdgeNewFaces")]
    ClosedIsolatedEdge,

    #[error("invalid edge: {0}")]
    InvalidEdge(String),

    /// The split point does not lie on the edge interior.
    #[error("could not split edge by point: point not on edge interior")]
    PointNotOnEdge,

    #[error("Cannot heal edge with itself")]
    SameEdge,

    /// Closed edges cannot be healed.
    #[error("Edge {0} is closed, cannot heal to other edges")]
    ClosedEdge(EdgeId),

    #[error("SQL/MM Spatial exception - universal face has no geometry")]
    UniversalFace,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // --- Topological violations ---
    #[error("SQL/MM Spatial exception - coincident node")]
    CoincidentNode,

    /// A point lies on an existing edge.
    #[error("SQL/MM Spatial exception - edge crosses node")]
    EdgeCrossesNode,

    /// The point is not inside the supplied face.
    #[error("SQL/MM Spatial exception - not within face")]
    NotWithinFace,

    #[error("SQL/MM Spatial exception - nodes in different faces")]
    NodesInDifferentFaces,

    /// Candidate geometry passes through a node interior.
    #[error("SQL/MM Spatial exception - geometry crosses a node ({0})")]
    GeometryCrossesNode(NodeId),

    /// Candidate geometry is equal to an existing edge.
    #[error("SQL/MM Spatial exception - coincident edge {0}")]
    CoincidentEdge(EdgeId),

    /// Candidate geometry shares a linear piece with an existing edge interior.
    #[error("SQL/MM Spatial exception - geometry intersects edge {0}")]
    GeometryIntersectsEdge(EdgeId),

    /// Candidate geometry crosses an existing edge interior at a point.
    #[error("SQL/MM Spatial exception - geometry crosses edge {0}")]
    GeometryCrossesEdge(EdgeId),

    #[error("SQL/MM Spatial exception - geometry crosses an edge (endnodes in faces {0} and {1})")]
    EndnodesInDifferentFaces(FaceId, FaceId),

    #[error("Left({left})/right({right}) faces mismatch: invalid topology ?")]
    FacesMismatch { left: FaceId, right: FaceId },

    /// A closed edge changed its winding.
    #[error("Edge twist at node {0}")]
    EdgeTwist(NodeId),

    /// A node would change side of the edge.
    #[error("Edge motion collision at POINT({} {})", .0.x, .0.y)]
    MotionCollision(Coord<f64>),

    #[error("Edge changed disposition around {end} node {node}")]
    DispositionChanged { end: &'static str, node: NodeId },

    /// Heal candidates share a node touched by other edges.
    #[error("SQL/MM Spatial exception - other edges connected ({})", join_ids(.0))]
    OtherEdgesConnected(Vec<EdgeId>),

    #[error("SQL/MM Spatial exception - non-connected edges")]
    NonConnectedEdges,

    /// The edge is not isolated.
    #[error("SQL/MM Spatial exception - not isolated edge {0}")]
    NotIsolatedEdge(EdgeId),

    #[error("Two or more nodes found")]
    AmbiguousNodes,

    #[error("Two or more edges found")]
    AmbiguousEdges,

    #[error("Two or more faces found")]
    AmbiguousFaces,

    // --- Corrupted topology ---
    /// Stored records contradict each other.
    #[error("Corrupted topology: {0}")]
    Corrupted(String),

    // --- Backend ---
    /// Backend failure, carrying the backend's own message.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl Error {
    /// Returns the class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CurveNotSimple
            | Error::NonExistentNode(_)
            | Error::NonExistentEdge(_)
            | Error::NonExistentFace(_)
            | Error::StartNodeMismatch
            | Error::EndNodeMismatch
            | Error::NotIsolatedNode(_)
            | Error::ClosedIsolatedEdge
            | Error::InvalidEdge(_)
            | Error::PointNotOnEdge
            | Error::SameEdge
            | Error::ClosedEdge(_)
            | Error::UniversalFace
            | Error::InvalidInput(_)
            | Error::Serialization(_) => ErrorKind::Input,
            Error::Corrupted(_) => ErrorKind::Corrupted,
            Error::Backend(_) => ErrorKind::Backend,
            _ => ErrorKind::Topological,
        }
    }

    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        Error::Corrupted(msg.into())
    }
}

fn join_ids(ids: &[EdgeId]) -> String {
    ids.iter()
        .map(|e| e.0.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(Error::CurveNotSimple.kind(), ErrorKind::Input);
        assert_eq!(
            Error::GeometryCrossesEdge(EdgeId(1)).kind(),
            ErrorKind::Topological
        );
        assert_eq!(Error::corrupted("x").kind(), ErrorKind::Corrupted);
        assert_eq!(
            Error::from(BackendError::new("disk full")).kind(),
            ErrorKind::Backend
        );
    }

    #[test]
    fn messages_carry_context() {
        let e = Error::OtherEdgesConnected(vec![EdgeId(3), EdgeId(8)]);
        assert_eq!(
            e.to_string(),
            "SQL/MM Spatial exception - other edges connected (3,8)"
        );
        let e = Error::from(BackendError::new("disk full"));
        assert_eq!(e.to_string(), "Backend error: disk full");
        let e = Error::MotionCollision(Coord { x: 1.5, y: 2.0 });
        assert_eq!(e.to_string(), "Edge motion collision at POINT(1.5 2)");
    }
}
