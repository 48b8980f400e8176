// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier types for topology primitives.
//!
//! Nodes, edges and faces are addressed by backend-assigned integer ids,
//! wrapped in newtypes so a node id can never be passed where an edge id is
//! expected. Edge-to-edge links carry a [`DirectedEdge`] instead of a signed
//! integer: the direction is an explicit enum, not a sign convention.

use std::fmt;
use std::ops::Neg;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                $name(v)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a node (a point of the planar graph).
    NodeId,
    "N"
);
id_type!(
    /// Identifier of an edge (a linestring between two nodes).
    EdgeId,
    "E"
);
id_type!(
    /// Identifier of a face (a region bounded by edge rings).
    FaceId,
    "F"
);

impl FaceId {
    /// The unbounded face surrounding every other face.
    pub const UNIVERSE: FaceId = FaceId(0);

    /// Returns true for the universal face.
    pub fn is_universe(self) -> bool {
        self == Self::UNIVERSE
    }
}

impl EdgeId {
    /// This edge traversed from start node to end node.
    pub fn forward(self) -> DirectedEdge {
        DirectedEdge::new(self, Direction::Forward)
    }

    /// This edge traversed from end node to start node.
    pub fn backward(self) -> DirectedEdge {
        DirectedEdge::new(self, Direction::Backward)
    }
}

/// Traversal direction of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// From start node to end node; the left face is on the left.
    Forward,
    /// From end node to start node; the right face is on the left.
    Backward,
}

impl Direction {
    /// Returns the opposite direction.
    pub fn reversed(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// An edge together with a traversal direction.
///
/// Serialized as a signed integer (`+id` forward, `-id` backward) for
/// compatibility with the SQL/MM storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub struct DirectedEdge {
    pub edge: EdgeId,
    pub direction: Direction,
}

impl DirectedEdge {
    pub fn new(edge: EdgeId, direction: Direction) -> Self {
        Self { edge, direction }
    }

    pub fn is_forward(self) -> bool {
        self.direction == Direction::Forward
    }

    /// The same edge walked the other way.
    pub fn reversed(self) -> Self {
        Self::new(self.edge, self.direction.reversed())
    }

    /// Signed integer form: positive when forward.
    pub fn signed(self) -> i64 {
        match self.direction {
            Direction::Forward => self.edge.0,
            Direction::Backward => -self.edge.0,
        }
    }

    /// Parses the signed integer form. Zero is not a valid edge reference.
    pub fn from_signed(v: i64) -> Option<Self> {
        match v {
            0 => None,
            v if v > 0 => Some(EdgeId(v).forward()),
            v => Some(EdgeId(-v).backward()),
        }
    }
}

impl Neg for DirectedEdge {
    type Output = DirectedEdge;

    fn neg(self) -> DirectedEdge {
        self.reversed()
    }
}

impl From<DirectedEdge> for i64 {
    fn from(d: DirectedEdge) -> i64 {
        d.signed()
    }
}

impl TryFrom<i64> for DirectedEdge {
    type Error = String;

    fn try_from(v: i64) -> std::result::Result<Self, Self::Error> {
        DirectedEdge::from_signed(v).ok_or_else(|| "zero is not a directed edge".to_string())
    }
}

impl fmt::Display for DirectedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.signed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_form_round_trips_direction() {
        let d = EdgeId(7).backward();
        assert_eq!(d.signed(), -7);
        assert_eq!(DirectedEdge::from_signed(-7), Some(d));
        assert_eq!(DirectedEdge::from_signed(0), None);
    }

    #[test]
    fn negation_flips_direction_only() {
        let d = EdgeId(3).forward();
        assert_eq!(-d, EdgeId(3).backward());
        assert_eq!(-(-d), d);
        assert_eq!((-d).edge, EdgeId(3));
    }

    #[test]
    fn display_formats() {
        assert_eq!(EdgeId(4).forward().to_string(), "+4");
        assert_eq!(EdgeId(4).backward().to_string(), "-4");
        assert_eq!(NodeId(2).to_string(), "N2");
        assert_eq!(FaceId::UNIVERSE.to_string(), "F0");
    }

    #[test]
    fn directed_edge_serializes_as_signed_integer() {
        let json = serde_json::to_string(&EdgeId(9).backward()).unwrap();
        assert_eq!(json, "-9");
        let back: DirectedEdge = serde_json::from_str("12").unwrap();
        assert_eq!(back, EdgeId(12).forward());
        assert!(serde_json::from_str::<DirectedEdge>("0").is_err());
    }
}
