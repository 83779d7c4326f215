//! Error types for the credit mesh pipeline.

use thiserror::Error;

/// Unified error type for all mesh operations.
///
/// Construction and normalization failures indicate a broken fixed
/// topology and are fatal at startup; persistence failures are
/// recoverable at the serving boundary.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Malformed fixed topology (edge references an unknown node, self-loop)
    #[error("Graph construction error: {0}")]
    Construction(String),

    /// Non-finite values survived adjacency normalization
    #[error("Normalization error: {0}")]
    Normalization(String),

    /// Training diverged (loss became non-finite)
    #[error("Training error: {0}")]
    Training(String),

    /// Artifact missing, corrupt, or shape-mismatched on load
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O errors (artifact reading/writing, export dumps)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MeshError {
    /// Creates a construction error.
    pub fn construction(message: impl Into<String>) -> Self {
        MeshError::Construction(message.into())
    }

    /// Creates a normalization error.
    pub fn normalization(message: impl Into<String>) -> Self {
        MeshError::Normalization(message.into())
    }

    /// Creates a training error.
    pub fn training(message: impl Into<String>) -> Self {
        MeshError::Training(message.into())
    }

    /// Creates a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        MeshError::Persistence(message.into())
    }

    /// Checks whether the serving boundary may recover from this error.
    ///
    /// Construction and normalization failures mean the compiled-in
    /// topology is wrong; there is nothing a caller can do but abort.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MeshError::Persistence(_) | MeshError::Io(_) | MeshError::Serialization(_)
        )
    }
}

/// Result type alias for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let construction = MeshError::construction("edge references unknown node");
        assert!(matches!(construction, MeshError::Construction(_)));

        let persistence = MeshError::persistence("artifact missing");
        assert!(matches!(persistence, MeshError::Persistence(_)));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(MeshError::persistence("corrupt artifact").is_recoverable());
        assert!(!MeshError::construction("bad edge").is_recoverable());
        assert!(!MeshError::training("loss is NaN").is_recoverable());
    }
}
