//! # mesh-core
//!
//! Core types for the credit-mesh GCN pipeline:
//! - **Topology**: the fixed financial relationship graph (typed nodes,
//!   undirected edges, dense adjacency)
//! - **Normalization**: symmetric self-looped degree normalization for
//!   spectral propagation
//! - **Errors**: unified error handling with `MeshError`
//! - **Export**: structured graph description for inspection
//!
//! Everything here is synchronous, single-threaded and deterministic;
//! `GraphSpec` and the normalized adjacency are built once per process
//! and shared read-only.

pub mod errors;
pub mod export;
pub mod normalize;
pub mod topology;

// Re-export commonly used items
pub use errors::{MeshError, Result};
pub use export::GraphDocument;
pub use normalize::normalize_adjacency;
pub use topology::{Cluster, GraphSpec, NodeSpec};
