//! # mesh-gnn
//!
//! Graph convolutional network over the fixed credit mesh:
//! - **Features**: seeded per-cluster centers plus Gaussian node noise
//! - **Model**: 2-layer GCN forward pass over the normalized adjacency
//! - **Trainer**: stratified split, cross-entropy, Adam, epoch reporting
//! - **Artifact**: versioned JSON persistence of parameters + label map
//! - **Inference**: artifact reload and per-node risk/confidence scoring
//!
//! ```text
//! GraphSpec ──▶ normalize_adjacency ──▶ Â ─┐
//!      │                                   ├──▶ Gcn::forward ──▶ logits
//!      └──▶ synthesize ──▶ X, labels ──────┘         ▲
//!                             │                      │
//!                             └──▶ Trainer ──────────┴──▶ ModelArtifact
//!                                                              │
//!                                          RiskScorer ◀────────┘
//! ```

pub mod artifact;
pub mod features;
pub mod inference;
pub mod model;
pub mod trainer;

// Re-export commonly used items
pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use features::{synthesize, FeatureConfig};
pub use inference::{RiskAssessment, RiskScorer};
pub use model::{softmax_rows, Gcn};
pub use trainer::{stratified_split, Trainer, TrainingConfig, TrainingReport};
