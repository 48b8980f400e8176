// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology configuration loaded from environment variables.

use serde::{Deserialize, Serialize};

use crate::records::TopologyInfo;

/// Metadata a topology handle is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Topology name, used when loading metadata from a backend.
    pub name: String,
    /// Spatial reference id of every geometry.
    pub srid: i32,
    /// Snapping tolerance for ingestion; 0 derives one from coordinates.
    pub precision: f64,
    /// Whether geometries carry Z (kept as metadata only).
    pub has_z: bool,
}

impl TopologyConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            name: std::env::var("TOPO_NAME").unwrap_or_else(|_| "topology".into()),
            srid: std::env::var("TOPO_SRID")
                .unwrap_or_else(|_| "0".into())
                .parse()
                .unwrap_or(0),
            precision: std::env::var("TOPO_PRECISION")
                .unwrap_or_else(|_| "0".into())
                .parse()
                .unwrap_or(0.0),
            has_z: std::env::var("TOPO_HAS_Z")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl From<TopologyConfig> for TopologyInfo {
    fn from(c: TopologyConfig) -> Self {
        TopologyInfo {
            name: c.name,
            srid: c.srid,
            precision: c.precision,
            has_z: c.has_z,
        }
    }
}

impl From<TopologyInfo> for TopologyConfig {
    fn from(i: TopologyInfo) -> Self {
        TopologyConfig {
            name: i.name,
            srid: i.srid,
            precision: i.precision,
            has_z: i.has_z,
        }
    }
}
