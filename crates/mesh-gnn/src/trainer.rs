//! Training loop for the credit-mesh GCN.
//!
//! Stratified 60/40 node split, categorical cross-entropy over training
//! rows, explicit backpropagation through the two convolution layers and
//! a hand-rolled Adam optimizer with L2 weight decay. Fixed epoch budget,
//! no early stopping; accuracy is reported at epoch 1 and then every
//! `report_interval` epochs.

use crate::model::{softmax_rows, ForwardTrace, Gcn};
use log::info;
use mesh_core::errors::{MeshError, Result};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub hidden_dim: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    /// Fraction of each class assigned to the training set
    pub train_fraction: f64,
    pub report_interval: usize,
    pub split_seed: u64,
    pub init_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 300,
            hidden_dim: 32,
            learning_rate: 0.01,
            weight_decay: 5e-4,
            train_fraction: 0.6,
            report_interval: 50,
            split_seed: 7,
            init_seed: 42,
        }
    }
}

/// Stratified train/test partition of node indices.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Per-class shuffle-and-cut split.
///
/// Every distinct label contributes at least one training index, so no
/// class is absent from the loss even with very few members.
pub fn stratified_split(labels: &[usize], train_fraction: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);

    // BTreeMap keeps the per-class iteration order independent of hashing
    let mut by_label: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, &label) in labels.iter().enumerate() {
        by_label.entry(label).or_default().push(index);
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_, mut indices) in by_label {
        indices.shuffle(&mut rng);
        let cut = ((train_fraction * indices.len() as f64) as usize)
            .max(1)
            .min(indices.len());
        train.extend_from_slice(&indices[..cut]);
        test.extend_from_slice(&indices[cut..]);
    }

    Split { train, test }
}

/// Metrics captured at a reporting epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
}

/// Outcome of a completed training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: usize,
    pub final_loss: f64,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    /// Argmax accuracy over every node, train and test alike
    pub full_accuracy: f64,
    pub history: Vec<EpochMetrics>,
}

/// Drives the optimization loop over a model and fixed graph inputs.
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fits the model to the labeled nodes.
    ///
    /// Fails with a training error if the loss becomes non-finite; in
    /// that case the model parameters must be considered corrupt and no
    /// artifact should be written from them.
    pub fn run(
        &self,
        model: &mut Gcn,
        features: &DMatrix<f64>,
        a_hat: &DMatrix<f64>,
        labels: &[usize],
    ) -> Result<TrainingReport> {
        let split = stratified_split(labels, self.config.train_fraction, self.config.split_seed);
        let mut optimizer = Adam::new(model, self.config.learning_rate);
        let mut history = Vec::new();
        let mut last_loss = f64::NAN;

        for epoch in 1..=self.config.epochs {
            let trace = model.forward_trace(features, a_hat);
            let probs = softmax_rows(&trace.logits);
            let loss = cross_entropy(&trace.logits, labels, &split.train);

            if !loss.is_finite() {
                return Err(MeshError::training(format!(
                    "loss became non-finite at epoch {epoch}"
                )));
            }
            last_loss = loss;

            let grads = backprop(
                model,
                &trace,
                &probs,
                a_hat,
                labels,
                &split.train,
                self.config.weight_decay,
            );
            optimizer.update(model, &grads);

            if epoch == 1 || epoch % self.config.report_interval == 0 {
                let logits = model.forward(features, a_hat);
                let train_accuracy = accuracy(&logits, labels, &split.train);
                let test_accuracy = accuracy(&logits, labels, &split.test);
                info!(
                    "Epoch {:03}  loss={:.4}  train_acc={:.2}  test_acc={:.2}",
                    epoch, loss, train_accuracy, test_accuracy
                );
                history.push(EpochMetrics {
                    epoch,
                    loss,
                    train_accuracy,
                    test_accuracy,
                });
            }
        }

        let logits = model.forward(features, a_hat);
        let all: Vec<usize> = (0..labels.len()).collect();
        Ok(TrainingReport {
            epochs: self.config.epochs,
            final_loss: last_loss,
            train_accuracy: accuracy(&logits, labels, &split.train),
            test_accuracy: accuracy(&logits, labels, &split.test),
            full_accuracy: accuracy(&logits, labels, &all),
            history,
        })
    }
}

/// Mean categorical cross-entropy over the given rows, computed with
/// log-sum-exp stabilization.
fn cross_entropy(logits: &DMatrix<f64>, labels: &[usize], rows: &[usize]) -> f64 {
    let mut total = 0.0;
    for &row in rows {
        let r = logits.row(row);
        let max = r.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let lse = max + r.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
        total += lse - r[labels[row]];
    }
    total / rows.len() as f64
}

/// Fraction of rows whose argmax logit matches the true label.
fn accuracy(logits: &DMatrix<f64>, labels: &[usize], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let hits = rows
        .iter()
        .filter(|&&row| {
            let r = logits.row(row);
            let mut best = 0;
            for (j, value) in r.iter().enumerate() {
                if *value > r[best] {
                    best = j;
                }
            }
            best == labels[row]
        })
        .count();
    hits as f64 / rows.len() as f64
}

/// Parameter gradients for one optimization step.
struct Gradients {
    w1: DMatrix<f64>,
    b1: DVector<f64>,
    w2: DMatrix<f64>,
    b2: DVector<f64>,
}

/// Backpropagates the masked cross-entropy loss through both layers.
///
/// The softmax/cross-entropy gradient is (p − onehot(y)) / m on training
/// rows and zero elsewhere. Â is symmetric, so propagation gradients
/// multiply by Â itself rather than its transpose.
fn backprop(
    model: &Gcn,
    trace: &ForwardTrace,
    probs: &DMatrix<f64>,
    a_hat: &DMatrix<f64>,
    labels: &[usize],
    train_rows: &[usize],
    weight_decay: f64,
) -> Gradients {
    let (n, classes) = (probs.nrows(), probs.ncols());
    let m = train_rows.len() as f64;

    let mut grad_logits = DMatrix::zeros(n, classes);
    for &row in train_rows {
        for class in 0..classes {
            let target = if labels[row] == class { 1.0 } else { 0.0 };
            grad_logits[(row, class)] = (probs[(row, class)] - target) / m;
        }
    }

    let mut grad_w2 = trace.propagated_hidden.transpose() * &grad_logits;
    let grad_b2 = column_sums(&grad_logits);

    let grad_propagated_hidden = &grad_logits * model.w2.transpose();
    let grad_hidden = a_hat * &grad_propagated_hidden;
    let grad_pre_hidden = grad_hidden.zip_map(&trace.pre_hidden, |g, pre| {
        if pre > 0.0 {
            g
        } else {
            0.0
        }
    });

    let mut grad_w1 = trace.propagated.transpose() * &grad_pre_hidden;
    let grad_b1 = column_sums(&grad_pre_hidden);

    // L2 weight decay on the weight matrices; biases are exempt
    grad_w1 += &model.w1 * weight_decay;
    grad_w2 += &model.w2 * weight_decay;

    Gradients {
        w1: grad_w1,
        b1: grad_b1,
        w2: grad_w2,
        b2: grad_b2,
    }
}

fn column_sums(matrix: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        matrix.ncols(),
        (0..matrix.ncols()).map(|j| matrix.column(j).sum()),
    )
}

/// Adam optimizer state: first/second moment estimates per tensor.
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: usize,
    m_w1: DMatrix<f64>,
    v_w1: DMatrix<f64>,
    m_b1: DVector<f64>,
    v_b1: DVector<f64>,
    m_w2: DMatrix<f64>,
    v_w2: DMatrix<f64>,
    m_b2: DVector<f64>,
    v_b2: DVector<f64>,
}

impl Adam {
    fn new(model: &Gcn, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            m_w1: DMatrix::zeros(model.w1.nrows(), model.w1.ncols()),
            v_w1: DMatrix::zeros(model.w1.nrows(), model.w1.ncols()),
            m_b1: DVector::zeros(model.b1.len()),
            v_b1: DVector::zeros(model.b1.len()),
            m_w2: DMatrix::zeros(model.w2.nrows(), model.w2.ncols()),
            v_w2: DMatrix::zeros(model.w2.nrows(), model.w2.ncols()),
            m_b2: DVector::zeros(model.b2.len()),
            v_b2: DVector::zeros(model.b2.len()),
        }
    }

    fn update(&mut self, model: &mut Gcn, grads: &Gradients) {
        self.step += 1;
        let correction1 = 1.0 - self.beta1.powi(self.step as i32);
        let correction2 = 1.0 - self.beta2.powi(self.step as i32);

        adam_step_tensor(
            model.w1.as_mut_slice(),
            grads.w1.as_slice(),
            self.m_w1.as_mut_slice(),
            self.v_w1.as_mut_slice(),
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            correction1,
            correction2,
        );
        adam_step_tensor(
            model.b1.as_mut_slice(),
            grads.b1.as_slice(),
            self.m_b1.as_mut_slice(),
            self.v_b1.as_mut_slice(),
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            correction1,
            correction2,
        );
        adam_step_tensor(
            model.w2.as_mut_slice(),
            grads.w2.as_slice(),
            self.m_w2.as_mut_slice(),
            self.v_w2.as_mut_slice(),
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            correction1,
            correction2,
        );
        adam_step_tensor(
            model.b2.as_mut_slice(),
            grads.b2.as_slice(),
            self.m_b2.as_mut_slice(),
            self.v_b2.as_mut_slice(),
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            correction1,
            correction2,
        );
    }
}

/// One bias-corrected Adam step over a flat parameter tensor.
#[allow(clippy::too_many_arguments)]
fn adam_step_tensor(
    theta: &mut [f64],
    grad: &[f64],
    m: &mut [f64],
    v: &mut [f64],
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    correction1: f64,
    correction2: f64,
) {
    for i in 0..theta.len() {
        m[i] = beta1 * m[i] + (1.0 - beta1) * grad[i];
        v[i] = beta2 * v[i] + (1.0 - beta2) * grad[i] * grad[i];
        let m_hat = m[i] / correction1;
        let v_hat = v[i] / correction2;
        theta[i] -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{synthesize, FeatureConfig};
    use mesh_core::normalize::normalize_adjacency;
    use mesh_core::topology::GraphSpec;

    #[test]
    fn test_stratified_split_invariants() {
        let spec = GraphSpec::credit_mesh().unwrap();
        let labels = spec.labels();
        let split = stratified_split(&labels, 0.6, 11);

        // exact partition, no overlap
        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        let expected: Vec<usize> = (0..labels.len()).collect();
        assert_eq!(all, expected);

        // every class appears in the training set
        for class in 0..spec.num_classes() {
            assert!(
                split.train.iter().any(|&i| labels[i] == class),
                "class {} missing from training set",
                class
            );
        }
    }

    #[test]
    fn test_split_keeps_singleton_class_in_train() {
        // one class with a single member: it must land in train
        let labels = vec![0, 0, 0, 1];
        let split = stratified_split(&labels, 0.6, 3);
        assert!(split.train.contains(&3));
    }

    #[test]
    fn test_split_is_seed_deterministic() {
        let labels = GraphSpec::credit_mesh().unwrap().labels();
        let a = stratified_split(&labels, 0.6, 5);
        let b = stratified_split(&labels, 0.6, 5);
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn test_training_fits_separable_clusters() {
        let spec = GraphSpec::credit_mesh().unwrap();
        let a_hat = normalize_adjacency(&spec.adjacency()).unwrap();
        let feature_config = FeatureConfig::default();
        let (features, labels) = synthesize(&spec, &feature_config);

        let config = TrainingConfig::default();
        let mut model = Gcn::new(
            feature_config.feature_dim,
            config.hidden_dim,
            spec.num_classes(),
            config.init_seed,
        );
        let report = Trainer::new(config).run(&mut model, &features, &a_hat, &labels).unwrap();

        assert!(report.final_loss.is_finite());
        assert!(
            report.train_accuracy > 0.8,
            "train accuracy too low: {}",
            report.train_accuracy
        );
        // epoch 1 plus every 50th of 300
        assert_eq!(report.history.len(), 7);
        assert_eq!(report.history[0].epoch, 1);
        assert_eq!(report.history.last().unwrap().epoch, 300);
    }

    #[test]
    fn test_non_finite_loss_is_reported() {
        let spec = GraphSpec::credit_mesh().unwrap();
        let a_hat = normalize_adjacency(&spec.adjacency()).unwrap();
        let labels = spec.labels();
        let features = DMatrix::from_element(spec.len(), 16, f64::NAN);

        let config = TrainingConfig::default();
        let mut model = Gcn::new(16, config.hidden_dim, spec.num_classes(), config.init_seed);
        let err = Trainer::new(config)
            .run(&mut model, &features, &a_hat, &labels)
            .unwrap_err();
        assert!(matches!(err, MeshError::Training(_)));
    }
}
