// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The topology handle.
//!
//! A [`Topology`] binds per-topology metadata to an injected [`Backend`] and
//! [`GeometryEngine`]. Edit and query operations are inherent methods spread
//! over the `construction`, `edge`, `split`, `change`, `removal`, `heal`,
//! `query`, `faces` and `ingest` modules.

use crate::backend::Backend;
use crate::config::TopologyConfig;
use crate::error::{Error, Result};
use crate::keys::{DirectedEdge, EdgeId, FaceId, NodeId};
use crate::predicate::{GeometryEngine, PlanarEngine};
use crate::records::{Edge, EdgeFields, Face, Node, NodeFields, TopoGeomEvent, TopologyInfo};

/// A planar topology of nodes, edges and faces.
///
/// # Example
///
/// ```
/// use geo_types::{coord, line_string};
/// use topo_lite_topology::{FaceId, Topology, TopologyArena, TopologyConfig};
///
/// let mut topo = Topology::new(TopologyArena::new(), TopologyConfig::default());
/// let a = topo.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
/// let b = topo.add_iso_node(None, coord! { x: 10.0, y: 0.0 }, false).unwrap();
/// let e = topo
///     .add_iso_edge(a, b, &line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)])
///     .unwrap();
///
/// assert_eq!(topo.backend().edge_count(), 1);
/// assert_eq!(topo.get_edge_by_point(coord! { x: 5.0, y: 0.0 }, 0.0).unwrap(), Some(e));
/// assert_eq!(topo.get_face_by_point(coord! { x: 5.0, y: 5.0 }, 0.0).unwrap(), FaceId::UNIVERSE);
/// ```
#[derive(Debug)]
pub struct Topology<B: Backend, G: GeometryEngine = PlanarEngine> {
    pub(crate) backend: B,
    pub(crate) engine: G,
    info: TopologyInfo,
}

impl<B: Backend> Topology<B> {
    /// Creates a handle over `backend` using the default geometry engine.
    pub fn new(backend: B, config: TopologyConfig) -> Self {
        Self::with_engine(backend, PlanarEngine, config)
    }

    /// Creates a handle reading metadata for `name` from the backend.
    pub fn load(backend: B, name: &str) -> Result<Self> {
        let info = backend.load_topology(name)?;
        tracing::debug!(name = %info.name, srid = info.srid, "Loaded topology");
        Ok(Self::with_engine(backend, PlanarEngine, info.into()))
    }
}

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    pub fn with_engine(backend: B, engine: G, config: TopologyConfig) -> Self {
        Self {
            backend,
            engine,
            info: config.into(),
        }
    }

    pub fn info(&self) -> &TopologyInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn srid(&self) -> i32 {
        self.info.srid
    }

    pub fn precision(&self) -> f64 {
        self.info.precision
    }

    pub fn has_z(&self) -> bool {
        self.info.has_z
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Releases the handle, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn engine(&self) -> &G {
        &self.engine
    }

    // --- Record helpers ---

    pub(crate) fn fetch_node(&self, id: NodeId) -> Result<Node> {
        let mut nodes = self.backend.get_node_by_id(&[id])?;
        match nodes.len() {
            0 => Err(Error::NonExistentNode(id)),
            1 => Ok(nodes.remove(0)),
            n => Err(Error::corrupted(format!("{n} nodes with id {id}"))),
        }
    }

    pub(crate) fn fetch_edge(&self, id: EdgeId) -> Result<Edge> {
        let mut edges = self.backend.get_edge_by_id(&[id])?;
        match edges.len() {
            0 => Err(Error::NonExistentEdge(id)),
            1 => Ok(edges.remove(0)),
            n => Err(Error::corrupted(format!("{n} edges with id {id}"))),
        }
    }

    pub(crate) fn fetch_face(&self, id: FaceId) -> Result<Face> {
        let mut faces = self.backend.get_face_by_id(&[id])?;
        match faces.len() {
            0 => Err(Error::NonExistentFace(id)),
            1 => Ok(faces.remove(0)),
            n => Err(Error::corrupted(format!("{n} faces with id {id}"))),
        }
    }

    /// Updates one edge by id.
    pub(crate) fn update_edge(&mut self, id: EdgeId, upd: EdgeFields) -> Result<()> {
        let n = self.backend.update_edges(&EdgeFields::id(id), &upd, None)?;
        if n != 1 {
            return Err(Error::corrupted(format!(
                "{n} edges updated when expecting 1 (edge {id})"
            )));
        }
        Ok(())
    }

    /// Points the side of `prev` that continues into `next`.
    ///
    /// A forward `prev` has its `next_left` replaced, a backward one its
    /// `next_right`.
    pub(crate) fn link_after(&mut self, prev: DirectedEdge, next: DirectedEdge) -> Result<()> {
        let upd = if prev.is_forward() {
            EdgeFields::next_left(next)
        } else {
            EdgeFields::next_right(next)
        };
        self.update_edge(prev.edge, upd)
    }

    pub(crate) fn set_node_face(&mut self, id: NodeId, face: Option<FaceId>) -> Result<()> {
        self.backend.update_nodes(
            &NodeFields::id(id),
            &NodeFields::containing_face(face),
            None,
        )?;
        Ok(())
    }

    pub(crate) fn notify(&mut self, event: TopoGeomEvent) -> Result<()> {
        tracing::debug!(?event, "Composite geometry bookkeeping");
        self.backend.update_topo_geom(&event)?;
        Ok(())
    }
}
