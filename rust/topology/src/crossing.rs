// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rejection of edge geometries that would break planarity.

use geo_types::LineString;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::geometry::line_bbox;
use crate::keys::{EdgeId, NodeId};
use crate::predicate::{GeometryEngine, LineRelation};
use crate::topology::Topology;

impl<B: Backend, G: GeometryEngine> Topology<B, G> {
    /// Fails when `geom` passes through a node other than its own endpoints,
    /// or meets the interior of any edge other than `exclude`.
    pub(crate) fn check_edge_crossing(
        &self,
        start: NodeId,
        end: NodeId,
        geom: &LineString<f64>,
        exclude: Option<EdgeId>,
    ) -> Result<()> {
        let Some(bbox) = line_bbox(geom) else {
            return Err(Error::InvalidEdge("empty geometry".into()));
        };

        for node in self.backend.get_node_within_box_2d(&bbox, None)? {
            if node.id == start || node.id == end {
                continue;
            }
            if self.engine.line_contains_point(geom, node.geom) {
                tracing::debug!(node = %node.id, "Edge geometry crosses a node");
                return Err(Error::GeometryCrossesNode(node.id));
            }
        }

        for edge in self.backend.get_edge_within_box_2d(&bbox, None)? {
            if Some(edge.id) == exclude {
                continue;
            }
            match self.engine.relate_lines(geom, &edge.geom) {
                LineRelation::InteriorsDisjoint => {}
                LineRelation::Equal => return Err(Error::CoincidentEdge(edge.id)),
                LineRelation::Overlaps => return Err(Error::GeometryIntersectsEdge(edge.id)),
                LineRelation::Crosses(at) => {
                    tracing::debug!(edge = %edge.id, x = at.x, y = at.y, "Edge geometry crosses an edge");
                    return Err(Error::GeometryCrossesEdge(edge.id));
                }
            }
        }
        Ok(())
    }
}
