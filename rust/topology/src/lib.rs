// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Topo-Lite Topology
//!
//! Planar topology engine following the ISO SQL/MM simple topology model.
//!
//! A topology is a planar subdivision made of nodes, edges and faces kept
//! consistent under incremental edits: isolated node and edge insertion,
//! edge insertion closing new faces, edge splitting and healing, geometry
//! changes and edge removal merging faces. Edges form a winged-edge
//! structure: every edge links to the next edge of the ring on each of its
//! sides, so face boundaries are walked without rebuilding the subdivision.
//!
//! Storage is injected through the [`Backend`] trait ([`TopologyArena`] is
//! the in-memory implementation) and computational geometry through the
//! [`GeometryEngine`] trait ([`PlanarEngine`] by default).

mod adjacency;
pub mod arena;
pub mod backend;
mod change;
pub mod config;
mod construction;
mod crossing;
mod edge;
pub mod error;
mod faces;
pub mod geometry;
mod heal;
pub mod ingest;
pub mod keys;
pub mod polygonize;
pub mod predicate;
mod query;
pub mod records;
mod removal;
pub mod serialization;
mod split;
pub mod topology;
pub mod validate;

pub use arena::TopologyArena;
pub use backend::{Backend, BackendResult};
pub use config::TopologyConfig;
pub use error::{BackendError, Error, ErrorKind, Result};
pub use ingest::min_tolerance;
pub use keys::{DirectedEdge, Direction, EdgeId, FaceId, NodeId};
pub use polygonize::build_area;
pub use predicate::{GeometryEngine, LineRelation, PlanarEngine};
pub use records::{
    Edge, EdgeFields, Face, NewNode, Node, NodeFields, TopoGeomEvent, TopologyInfo,
};
pub use serialization::ArenaSnapshot;
pub use topology::Topology;
pub use validate::{validate_topology, Finding, ValidationReport};
