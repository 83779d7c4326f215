//! Two-layer graph convolutional network.
//!
//! Forward pass over a fixed normalized adjacency Â:
//! logits = Â · relu(Â · X · W1 + b1) · W2 + b2
//!
//! The forward pass is stateless and side-effect-free; parameters are
//! mutated only by the trainer's optimization step.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Two-layer GCN parameters: input→hidden and hidden→output affine maps.
#[derive(Debug)]
pub struct Gcn {
    pub(crate) w1: DMatrix<f64>,
    pub(crate) b1: DVector<f64>,
    pub(crate) w2: DMatrix<f64>,
    pub(crate) b2: DVector<f64>,
}

/// Intermediate activations kept for backpropagation.
pub(crate) struct ForwardTrace {
    /// Â · X
    pub propagated: DMatrix<f64>,
    /// Â · X · W1 + b1, pre-activation
    pub pre_hidden: DMatrix<f64>,
    /// Â · relu(pre_hidden)
    pub propagated_hidden: DMatrix<f64>,
    /// N × C class scores
    pub logits: DMatrix<f64>,
}

impl Gcn {
    /// Creates a model with per-layer uniform U(-1/√fan_in, 1/√fan_in)
    /// initialization drawn from a seeded RNG.
    pub fn new(in_dim: usize, hidden_dim: usize, out_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let bound1 = 1.0 / (in_dim as f64).sqrt();
        let w1 = DMatrix::from_fn(in_dim, hidden_dim, |_, _| rng.gen_range(-bound1..bound1));
        let b1 = DVector::from_fn(hidden_dim, |_, _| rng.gen_range(-bound1..bound1));

        let bound2 = 1.0 / (hidden_dim as f64).sqrt();
        let w2 = DMatrix::from_fn(hidden_dim, out_dim, |_, _| rng.gen_range(-bound2..bound2));
        let b2 = DVector::from_fn(out_dim, |_, _| rng.gen_range(-bound2..bound2));

        Self { w1, b1, w2, b2 }
    }

    /// Rebuilds a model from explicit parameter tensors (artifact loading).
    pub(crate) fn from_parameters(
        w1: DMatrix<f64>,
        b1: DVector<f64>,
        w2: DMatrix<f64>,
        b2: DVector<f64>,
    ) -> Self {
        Self { w1, b1, w2, b2 }
    }

    pub fn input_dim(&self) -> usize {
        self.w1.nrows()
    }

    pub fn hidden_dim(&self) -> usize {
        self.w1.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.w2.ncols()
    }

    /// Forward pass: propagate, transform, relu, propagate, transform.
    ///
    /// Returns the N×C logits matrix.
    pub fn forward(&self, features: &DMatrix<f64>, a_hat: &DMatrix<f64>) -> DMatrix<f64> {
        self.forward_trace(features, a_hat).logits
    }

    /// Forward pass keeping intermediate activations for the trainer.
    pub(crate) fn forward_trace(
        &self,
        features: &DMatrix<f64>,
        a_hat: &DMatrix<f64>,
    ) -> ForwardTrace {
        let propagated = a_hat * features;

        let mut pre_hidden = &propagated * &self.w1;
        add_row_bias(&mut pre_hidden, &self.b1);

        let hidden = pre_hidden.map(|v| v.max(0.0));
        let propagated_hidden = a_hat * hidden;

        let mut logits = &propagated_hidden * &self.w2;
        add_row_bias(&mut logits, &self.b2);

        ForwardTrace {
            propagated,
            pre_hidden,
            propagated_hidden,
            logits,
        }
    }
}

/// Adds a bias vector to every row of the matrix.
fn add_row_bias(matrix: &mut DMatrix<f64>, bias: &DVector<f64>) {
    for mut row in matrix.row_iter_mut() {
        for (j, value) in row.iter_mut().enumerate() {
            *value += bias[j];
        }
    }
}

/// Row-wise softmax with max-subtraction for numerical stability.
pub fn softmax_rows(logits: &DMatrix<f64>) -> DMatrix<f64> {
    let mut probs = logits.clone();
    for mut row in probs.row_iter_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for value in row.iter_mut() {
            *value = (*value - max).exp();
            sum += *value;
        }
        for value in row.iter_mut() {
            *value /= sum;
        }
    }
    probs
}
