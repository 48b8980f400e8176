// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point lookups: the node, edge or face found at a location.

use geo_types::Coord;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::geometry::line_distance;
use crate::keys::{EdgeId, FaceId, NodeId};
use crate::predicate::GeometryEngine;
use crate::topology::Topology;

/// Search distance used for the edge fallback of [`Topology::get_face_by_point`]
/// when no tolerance is given, so edge endpoints are still matched.
const FACE_EDGE_SEARCH: f64 = 1e-5;

fn ensure_finite(pt: Coord<f64>) -> Result<()> {
    if pt.x.is_finite() && pt.y.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidInput("empty query point".into()))
    }
}

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// The node within `tol` of `pt`, if any.
    pub fn get_node_by_point(&self, pt: Coord<f64>, tol: f64) -> Result<Option<NodeId>> {
        ensure_finite(pt)?;
        let nodes = self.backend.get_node_within_distance_2d(pt, tol, None)?;
        match nodes.as_slice() {
            [] => Ok(None),
            [n] => Ok(Some(n.id)),
            _ => Err(Error::AmbiguousNodes),
        }
    }

    /// The edge within `tol` of `pt`, if any.
    pub fn get_edge_by_point(&self, pt: Coord<f64>, tol: f64) -> Result<Option<EdgeId>> {
        ensure_finite(pt)?;
        let edges = self.backend.get_edge_within_distance_2d(pt, tol, None)?;
        match edges.as_slice() {
            [] => Ok(None),
            [e] => Ok(Some(e.id)),
            _ => Err(Error::AmbiguousEdges),
        }
    }

    /// The face containing `pt`.
    ///
    /// A point on the boundary of exactly one bounded face, within `tol`,
    /// resolves to that face. Anything else is the universe.
    pub fn get_face_by_point(&self, pt: Coord<f64>, tol: f64) -> Result<FaceId> {
        ensure_finite(pt)?;
        if let Some(face) = self.backend.get_face_containing_point(pt)? {
            return Ok(face);
        }

        let search = if tol == 0.0 { FACE_EDGE_SEARCH } else { tol };
        let mut found = FaceId::UNIVERSE;
        for e in self.backend.get_edge_within_distance_2d(pt, search, None)? {
            if e.is_dangling() {
                tracing::trace!(edge = %e.id, "Skipping dangling edge");
                continue;
            }
            if line_distance(&e.geom, pt) > tol {
                continue;
            }
            let eface = if e.face_left.is_universe() {
                e.face_right
            } else if e.face_right.is_universe() {
                e.face_left
            } else {
                return Err(Error::AmbiguousFaces);
            };
            if !found.is_universe() && found != eface {
                return Err(Error::AmbiguousFaces);
            }
            found = eface;
        }
        Ok(found)
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

    /// Closed square face from (0,0) to (10,10) on a single node.
    fn square(t: &mut Topology<TopologyArena>) -> FaceId {
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        let e = t
            .add_edge_new_faces(
                a,
                a,
                &line_string![
                    (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)
                ],
                false,
            )
            .unwrap();
        t.backend().edge(e).unwrap().face_left
    }

    #[test]
    fn node_lookup() {
        let mut t = topo();
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        t.add_iso_node(None, coord! { x: 1.0, y: 0.0 }, false).unwrap();
        assert_eq!(t.get_node_by_point(coord! { x: 0.0, y: 0.0 }, 0.0).unwrap(), Some(a));
        assert_eq!(t.get_node_by_point(coord! { x: 0.0, y: 0.3 }, 0.1).unwrap(), None);
        assert!(matches!(
            t.get_node_by_point(coord! { x: 0.5, y: 0.0 }, 0.6),
            Err(Error::AmbiguousNodes)
        ));
        assert!(matches!(
            t.get_node_by_point(coord! { x: f64::NAN, y: 0.0 }, 0.0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn face_lookup_inside_and_on_boundary() {
        let mut t = topo();
        let f = square(&mut t);
        assert_eq!(t.get_face_by_point(coord! { x: 5.0, y: 5.0 }, 0.0).unwrap(), f);
        assert_eq!(t.get_face_by_point(coord! { x: 5.0, y: 0.0 }, 0.0).unwrap(), f);
        assert_eq!(
            t.get_face_by_point(coord! { x: 50.0, y: 5.0 }, 0.0).unwrap(),
            FaceId::UNIVERSE
        );
        // near the boundary, outside, within tolerance
        assert_eq!(t.get_face_by_point(coord! { x: 5.0, y: -0.5 }, 1.0).unwrap(), f);
    }

    #[test]
    fn edge_lookup_is_ambiguous_near_shared_node() {
        let mut t = topo();
        let a = t.add_iso_node(None, coord! { x: 0.0, y: 0.0 }, false).unwrap();
        let b = t.add_iso_node(None, coord! { x: 5.0, y: 0.0 }, false).unwrap();
        let c = t.add_iso_node(None, coord! { x: 5.0, y: 5.0 }, false).unwrap();
        let ab = t
            .add_edge_mod_face(a, b, &line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)], false)
            .unwrap();
        t.add_edge_mod_face(b, c, &line_string![(x: 5.0, y: 0.0), (x: 5.0, y: 5.0)], false)
            .unwrap();
        assert_eq!(t.get_edge_by_point(coord! { x: 2.0, y: 0.0 }, 0.0).unwrap(), Some(ab));
        assert!(matches!(
            t.get_edge_by_point(coord! { x: 5.0, y: 0.0 }, 0.0),
            Err(Error::AmbiguousEdges)
        ));
    }
}
