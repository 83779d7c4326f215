//! Persisted model artifact.
//!
//! A single JSON document carrying the learned parameters by name, the
//! cluster-name → label-index mapping in sorted-name order, and the node
//! ordering the model was trained against. Node order and dimensions are
//! validated on load so topology or architecture drift surfaces as a
//! persistence error instead of silent mispredictions.

use crate::model::Gcn;
use chrono::{DateTime, Utc};
use mesh_core::errors::{MeshError, Result};
use mesh_core::topology::GraphSpec;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Current artifact schema version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Layer dimensions needed to rebuild the architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDims {
    pub input: usize,
    pub hidden: usize,
    pub output: usize,
}

/// Named parameter tensors, row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactParams {
    #[serde(rename = "lin1.weight")]
    pub lin1_weight: Vec<Vec<f64>>,
    #[serde(rename = "lin1.bias")]
    pub lin1_bias: Vec<f64>,
    #[serde(rename = "lin2.weight")]
    pub lin2_weight: Vec<Vec<f64>>,
    #[serde(rename = "lin2.bias")]
    pub lin2_bias: Vec<f64>,
}

/// Serialized training output: parameters plus label mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    /// Node ids in model row order
    pub node_order: Vec<String>,
    /// Cluster name to output class index, sorted-name order
    pub cluster_labels: BTreeMap<String, usize>,
    pub dims: ArtifactDims,
    pub params: ArtifactParams,
}

impl ModelArtifact {
    /// Captures a trained model together with the graph it was trained on.
    pub fn from_model(model: &Gcn, spec: &GraphSpec) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            node_order: spec.node_order(),
            cluster_labels: spec.cluster_label_map(),
            dims: ArtifactDims {
                input: model.input_dim(),
                hidden: model.hidden_dim(),
                output: model.output_dim(),
            },
            params: ArtifactParams {
                lin1_weight: matrix_rows(&model.w1),
                lin1_bias: model.b1.iter().copied().collect(),
                lin2_weight: matrix_rows(&model.w2),
                lin2_bias: model.b2.iter().copied().collect(),
            },
        }
    }

    /// Writes the artifact as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_string_pretty(self)?).map_err(|e| {
            MeshError::persistence(format!("failed to write artifact {}: {e}", path.display()))
        })
    }

    /// Reads an artifact from disk.
    ///
    /// A missing or malformed file is a persistence error; callers must
    /// never fall back to fresh random weights.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MeshError::persistence(format!("failed to read artifact {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| MeshError::persistence(format!("malformed artifact: {e}")))
    }

    /// Rebuilds a model, validating schema version, node ordering against
    /// the live topology, architecture dimensions and tensor shapes.
    pub fn into_model(
        self,
        spec: &GraphSpec,
        expected_input: usize,
        expected_hidden: usize,
    ) -> Result<Gcn> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(MeshError::persistence(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if self.node_order != spec.node_order() {
            return Err(MeshError::persistence(
                "artifact node ordering does not match the current topology".to_string(),
            ));
        }
        if self.cluster_labels != spec.cluster_label_map() {
            return Err(MeshError::persistence(
                "artifact cluster labels do not match the current topology".to_string(),
            ));
        }

        let expected = ArtifactDims {
            input: expected_input,
            hidden: expected_hidden,
            output: spec.num_classes(),
        };
        if self.dims != expected {
            return Err(MeshError::persistence(format!(
                "architecture mismatch: artifact {:?}, expected {:?}",
                self.dims, expected
            )));
        }

        let w1 = matrix_from_rows(&self.params.lin1_weight, expected.input, expected.hidden)
            .map_err(|e| MeshError::persistence(format!("lin1.weight: {e}")))?;
        let w2 = matrix_from_rows(&self.params.lin2_weight, expected.hidden, expected.output)
            .map_err(|e| MeshError::persistence(format!("lin2.weight: {e}")))?;

        if self.params.lin1_bias.len() != expected.hidden {
            return Err(MeshError::persistence(format!(
                "lin1.bias: expected {} values, got {}",
                expected.hidden,
                self.params.lin1_bias.len()
            )));
        }
        if self.params.lin2_bias.len() != expected.output {
            return Err(MeshError::persistence(format!(
                "lin2.bias: expected {} values, got {}",
                expected.output,
                self.params.lin2_bias.len()
            )));
        }
        let b1 = DVector::from_vec(self.params.lin1_bias);
        let b2 = DVector::from_vec(self.params.lin2_bias);

        Ok(Gcn::from_parameters(w1, b1, w2, b2))
    }
}

fn matrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..matrix.nrows())
        .map(|i| matrix.row(i).iter().copied().collect())
        .collect()
}

fn matrix_from_rows(
    rows: &[Vec<f64>],
    expected_rows: usize,
    expected_cols: usize,
) -> std::result::Result<DMatrix<f64>, String> {
    if rows.len() != expected_rows {
        return Err(format!(
            "expected {} rows, got {}",
            expected_rows,
            rows.len()
        ));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != expected_cols {
            return Err(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                expected_cols
            ));
        }
    }
    Ok(DMatrix::from_fn(expected_rows, expected_cols, |i, j| {
        rows[i][j]
    }))
}
