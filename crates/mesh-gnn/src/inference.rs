//! One-shot risk inference from a persisted artifact.
//!
//! Rebuilds the same graph, normalized adjacency and synthetic features
//! the trainer used, loads and validates the artifact, then runs a single
//! forward pass. The resulting scorer is immutable, so concurrent callers
//! may read predictions freely; there is no weight hot-reloading.

use crate::artifact::ModelArtifact;
use crate::features::{synthesize, FeatureConfig};
use crate::model::softmax_rows;
use mesh_core::errors::{MeshError, Result};
use mesh_core::normalize::normalize_adjacency;
use mesh_core::topology::GraphSpec;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Qualitative read of prediction confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationalStability {
    High,
    Moderate,
}

impl RelationalStability {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            Self::High
        } else {
            Self::Moderate
        }
    }
}

/// Qualitative read of the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityExposure {
    Low,
    High,
}

impl VolatilityExposure {
    pub fn from_risk(risk_score: f64) -> Self {
        if risk_score < 0.3 {
            Self::Low
        } else {
            Self::High
        }
    }
}

/// Risk/confidence pair for one node, with qualitative bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub node_id: String,
    /// 1 − confidence, rounded to 2 decimals
    pub risk_score: f64,
    /// Max softmax probability across classes, rounded to 2 decimals
    pub confidence: f64,
    pub relational_stability: RelationalStability,
    pub volatility_exposure: VolatilityExposure,
}

/// Read-only scorer over a trained model's class probabilities.
#[derive(Debug)]
pub struct RiskScorer {
    node_ids: Vec<String>,
    probs: DMatrix<f64>,
}

impl RiskScorer {
    /// Loads a persisted artifact and evaluates the model once over the
    /// reconstructed graph. Fails loudly if the artifact is missing,
    /// malformed or does not match the expected architecture.
    pub fn from_artifact<P: AsRef<std::path::Path>>(
        path: P,
        spec: &GraphSpec,
        feature_config: &FeatureConfig,
        hidden_dim: usize,
    ) -> Result<Self> {
        let model = ModelArtifact::load(path)?.into_model(
            spec,
            feature_config.feature_dim,
            hidden_dim,
        )?;

        let a_hat = normalize_adjacency(&spec.adjacency())?;
        let (features, _) = synthesize(spec, feature_config);
        let probs = softmax_rows(&model.forward(&features, &a_hat));

        Ok(Self {
            node_ids: spec.node_order(),
            probs,
        })
    }

    /// Risk/confidence pair for a node by index.
    pub fn predict(&self, node_index: usize) -> Result<RiskAssessment> {
        if node_index >= self.node_ids.len() {
            return Err(MeshError::construction(format!(
                "node index {} out of range (0..{})",
                node_index,
                self.node_ids.len()
            )));
        }

        let row = self.probs.row(node_index);
        let confidence = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let risk_score = round2(1.0 - confidence);

        Ok(RiskAssessment {
            node_id: self.node_ids[node_index].clone(),
            risk_score,
            confidence: round2(confidence),
            relational_stability: RelationalStability::from_confidence(confidence),
            volatility_exposure: VolatilityExposure::from_risk(risk_score),
        })
    }

    /// Prediction for the designated `user` hub node.
    pub fn predict_user(&self) -> Result<RiskAssessment> {
        let index = self
            .node_ids
            .iter()
            .position(|id| id == "user")
            .ok_or_else(|| {
                MeshError::construction("topology has no 'user' node".to_string())
            })?;
        self.predict(index)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Gcn;
    use crate::trainer::{Trainer, TrainingConfig};

    fn train_and_save(dir: &std::path::Path) -> (GraphSpec, FeatureConfig, TrainingConfig) {
        let spec = GraphSpec::credit_mesh().unwrap();
        let feature_config = FeatureConfig::default();
        let training_config = TrainingConfig {
            epochs: 120,
            ..TrainingConfig::default()
        };

        let a_hat = normalize_adjacency(&spec.adjacency()).unwrap();
        let (features, labels) = synthesize(&spec, &feature_config);
        let mut model = Gcn::new(
            feature_config.feature_dim,
            training_config.hidden_dim,
            spec.num_classes(),
            training_config.init_seed,
        );
        Trainer::new(training_config.clone())
            .run(&mut model, &features, &a_hat, &labels)
            .unwrap();

        ModelArtifact::from_model(&model, &spec)
            .save(dir.join("gnn_model.json"))
            .unwrap();
        (spec, feature_config, training_config)
    }

    #[test]
    fn test_risk_is_inverse_of_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let (spec, feature_config, training_config) = train_and_save(dir.path());

        let scorer = RiskScorer::from_artifact(
            dir.path().join("gnn_model.json"),
            &spec,
            &feature_config,
            training_config.hidden_dim,
        )
        .unwrap();

        let assessment = scorer.predict_user().unwrap();
        assert_eq!(assessment.node_id, "user");
        assert!(assessment.confidence >= 0.0 && assessment.confidence <= 1.0);
        assert!(assessment.risk_score >= 0.0 && assessment.risk_score <= 1.0);
        assert!((assessment.risk_score + assessment.confidence - 1.0).abs() < 0.011);
    }

    #[test]
    fn test_bands_follow_thresholds() {
        assert_eq!(
            RelationalStability::from_confidence(0.9),
            RelationalStability::High
        );
        assert_eq!(
            RelationalStability::from_confidence(0.5),
            RelationalStability::Moderate
        );
        assert_eq!(VolatilityExposure::from_risk(0.1), VolatilityExposure::Low);
        assert_eq!(VolatilityExposure::from_risk(0.6), VolatilityExposure::High);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (spec, feature_config, training_config) = train_and_save(dir.path());
        let scorer = RiskScorer::from_artifact(
            dir.path().join("gnn_model.json"),
            &spec,
            &feature_config,
            training_config.hidden_dim,
        )
        .unwrap();
        assert!(scorer.predict(spec.len()).is_err());
    }

    #[test]
    fn test_wrong_hidden_dim_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (spec, feature_config, _) = train_and_save(dir.path());
        let err = RiskScorer::from_artifact(
            dir.path().join("gnn_model.json"),
            &spec,
            &feature_config,
            64,
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::Persistence(_)));
    }
}
