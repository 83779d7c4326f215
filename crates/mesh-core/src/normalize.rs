//! Symmetric adjacency normalization for spectral graph convolution.
//!
//! Â = D^(-1/2) · (A + I) · D^(-1/2), where D is the degree matrix of
//! the self-looped adjacency. Computed once per process and reused
//! read-only by every forward pass.

use crate::errors::{MeshError, Result};
use nalgebra::{DMatrix, DVector};

/// Inverse square root of a degree value, with zero substituted for any
/// non-finite result. Guards isolated nodes (degree zero).
pub fn inverse_sqrt_degree(degree: f64) -> f64 {
    let value = degree.powf(-0.5);
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Computes the symmetric-normalized self-looped adjacency matrix.
///
/// Pure and deterministic: the same input yields bit-identical output.
/// Fails if any non-finite value survives the degree guard, which would
/// indicate a malformed adjacency matrix rather than a recoverable
/// condition.
pub fn normalize_adjacency(adjacency: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = adjacency.nrows();
    if adjacency.ncols() != n {
        return Err(MeshError::normalization(format!(
            "adjacency must be square, got {}x{}",
            adjacency.nrows(),
            adjacency.ncols()
        )));
    }

    let a_hat = adjacency + DMatrix::identity(n, n);

    let d_inv_sqrt = DVector::from_iterator(
        n,
        (0..n).map(|i| inverse_sqrt_degree(a_hat.row(i).sum())),
    );
    let d_mat = DMatrix::from_diagonal(&d_inv_sqrt);

    let normalized = &d_mat * &a_hat * &d_mat;

    if normalized.iter().any(|v| !v.is_finite()) {
        return Err(MeshError::normalization(
            "non-finite value in normalized adjacency".to_string(),
        ));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::GraphSpec;

    #[test]
    fn test_normalization_deterministic() {
        let a = GraphSpec::credit_mesh().unwrap().adjacency();
        let first = normalize_adjacency(&a).unwrap();
        let second = normalize_adjacency(&a).unwrap();
        // bit-identical, not merely approximately equal
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalized_is_symmetric_and_finite() {
        let a = GraphSpec::credit_mesh().unwrap().adjacency();
        let normalized = normalize_adjacency(&a).unwrap();
        for i in 0..normalized.nrows() {
            for j in 0..normalized.ncols() {
                assert!(normalized[(i, j)].is_finite());
                assert!((normalized[(i, j)] - normalized[(j, i)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_isolated_node_self_loop_weight() {
        // A node with no edges still gets a self-loop: degree 1, weight 1.
        let a = DMatrix::zeros(3, 3);
        let normalized = normalize_adjacency(&a).unwrap();
        for i in 0..3 {
            assert_eq!(normalized[(i, i)], 1.0);
        }
    }

    #[test]
    fn test_degree_zero_guard() {
        assert_eq!(inverse_sqrt_degree(0.0), 0.0);
        assert_eq!(inverse_sqrt_degree(4.0), 0.5);
    }

    #[test]
    fn test_rejects_non_square() {
        let a = DMatrix::zeros(2, 3);
        assert!(normalize_adjacency(&a).is_err());
    }

    #[test]
    fn test_hub_entry_value() {
        // user (degree 25 + self-loop = 26) to income_gig (degree 2 + 1 = 3):
        // entry = 1/sqrt(26 * 3)
        let spec = GraphSpec::credit_mesh().unwrap();
        let normalized = normalize_adjacency(&spec.adjacency()).unwrap();
        let user = spec.index_of("user").unwrap();
        let gig = spec.index_of("income_gig").unwrap();
        let expected = 1.0 / (26.0f64 * 3.0).sqrt();
        assert!((normalized[(user, gig)] - expected).abs() < 1e-12);
    }
}
