//! Inspection export of the synthetic graph.
//!
//! Debugging/visualization artifact only; nothing in training or
//! inference reads it back.

use crate::errors::Result;
use crate::topology::GraphSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: String,
    pub label: String,
    pub cluster: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDocument {
    pub source: String,
    pub target: String,
}

/// Structured description of the graph: per-node identity and cluster,
/// per-edge endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<NodeDocument>,
    pub edges: Vec<EdgeDocument>,
}

impl GraphDocument {
    pub fn from_spec(spec: &GraphSpec) -> Self {
        Self {
            nodes: spec
                .nodes()
                .iter()
                .map(|n| NodeDocument {
                    id: n.id.clone(),
                    label: n.label.clone(),
                    cluster: n.cluster.as_str().to_string(),
                })
                .collect(),
            edges: spec
                .edges()
                .iter()
                .map(|(source, target)| EdgeDocument {
                    source: source.clone(),
                    target: target.clone(),
                })
                .collect(),
        }
    }

    /// Writes the document as pretty-printed JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
