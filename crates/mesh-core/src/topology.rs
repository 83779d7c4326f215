//! Fixed credit-mesh topology: typed nodes, undirected edges, adjacency.
//!
//! The graph is a compile-time constant: a `user` hub connected to every
//! other node, five 5-node cluster chains (income, obligation, spending,
//! savings, peer) and four cross-cluster links. `GraphSpec` is built once
//! from the tables and passed by reference to the normalizer, the feature
//! generator and the model, so training and inference always derive the
//! same node ordering.

use crate::errors::{MeshError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Semantic cluster a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    User,
    Income,
    Obligation,
    Spending,
    Savings,
    Peer,
}

impl Cluster {
    /// All clusters in lexicographic name order.
    ///
    /// This order defines the model's output class indices and must match
    /// the `cluster_labels` map stored in persisted artifacts.
    pub const ALL: [Cluster; 6] = [
        Cluster::Income,
        Cluster::Obligation,
        Cluster::Peer,
        Cluster::Savings,
        Cluster::Spending,
        Cluster::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::User => "user",
            Cluster::Income => "income",
            Cluster::Obligation => "obligation",
            Cluster::Spending => "spending",
            Cluster::Savings => "savings",
            Cluster::Peer => "peer",
        }
    }

    /// Index of this cluster in [`Cluster::ALL`].
    pub fn label_index(&self) -> usize {
        Cluster::ALL.iter().position(|c| c == self).unwrap_or(0)
    }
}

/// One node of the fixed topology. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique identifier, e.g. `income_salary`
    pub id: String,
    /// Display label, e.g. `SALARY_SOURCE`
    pub label: String,
    /// Cluster tag
    pub cluster: Cluster,
}

/// Static node table. Index order here is the node index everywhere.
const NODE_TABLE: &[(&str, &str, Cluster)] = &[
    ("user", "USER_CORE", Cluster::User),
    // income cluster
    ("income_gig", "GIG_PLATFORM", Cluster::Income),
    ("income_employer", "EMPLOYER_NODE", Cluster::Income),
    ("income_salary", "SALARY_SOURCE", Cluster::Income),
    ("income_freelance", "FREELANCE_CLIENT", Cluster::Income),
    ("income_recurring", "RECURRING_INCOME_SOURCE", Cluster::Income),
    // obligation cluster
    ("obl_landlord", "LANDLORD_NODE", Cluster::Obligation),
    ("obl_utility", "UTILITY_PROVIDER", Cluster::Obligation),
    ("obl_emi", "EMI_PROVIDER", Cluster::Obligation),
    ("obl_insurance", "INSURANCE_PROVIDER", Cluster::Obligation),
    ("obl_subs", "SUBSCRIPTION_PROVIDER", Cluster::Obligation),
    // spending cluster
    ("spend_grocery", "GROCERY_MERCHANT", Cluster::Spending),
    ("spend_ecom", "E_COMMERCE", Cluster::Spending),
    ("spend_fuel", "FUEL_STATION", Cluster::Spending),
    ("spend_disc", "DISCRETIONARY_SPENDING", Cluster::Spending),
    ("spend_highvol", "HIGH_VOLATILITY_MERCHANT", Cluster::Spending),
    // savings cluster
    ("save_account", "SAVINGS_ACCOUNT", Cluster::Savings),
    ("save_rd", "RECURRING_DEPOSIT", Cluster::Savings),
    ("save_micro", "MICRO_INVESTMENT", Cluster::Savings),
    ("save_gold", "GOLD_SAVINGS", Cluster::Savings),
    ("save_emergency", "EMERGENCY_FUND", Cluster::Savings),
    // peer network
    ("peer_in", "P2P_TRANSFER_IN", Cluster::Peer),
    ("peer_out", "P2P_TRANSFER_OUT", Cluster::Peer),
    ("peer_family", "FAMILY_SUPPORT_NODE", Cluster::Peer),
    ("peer_loan_from", "LOAN_FROM_PEER", Cluster::Peer),
    ("peer_loan_to", "LOAN_TO_PEER", Cluster::Peer),
];

/// Static edge table: intra-cluster chains plus cross-cluster links.
/// Hub edges (user to every other node) are generated in `credit_mesh`.
const EDGE_TABLE: &[(&str, &str)] = &[
    // income chain
    ("income_gig", "income_employer"),
    ("income_employer", "income_salary"),
    ("income_salary", "income_freelance"),
    ("income_freelance", "income_recurring"),
    // obligation chain
    ("obl_landlord", "obl_utility"),
    ("obl_utility", "obl_emi"),
    ("obl_emi", "obl_insurance"),
    ("obl_insurance", "obl_subs"),
    // spending chain
    ("spend_grocery", "spend_ecom"),
    ("spend_ecom", "spend_fuel"),
    ("spend_fuel", "spend_disc"),
    ("spend_disc", "spend_highvol"),
    // savings chain
    ("save_account", "save_rd"),
    ("save_rd", "save_micro"),
    ("save_micro", "save_gold"),
    ("save_gold", "save_emergency"),
    // peer chain
    ("peer_in", "peer_out"),
    ("peer_out", "peer_family"),
    ("peer_family", "peer_loan_from"),
    ("peer_loan_from", "peer_loan_to"),
    // cross-cluster links
    ("income_salary", "save_account"),
    ("income_salary", "spend_grocery"),
    ("spend_ecom", "peer_out"),
    ("obl_emi", "save_rd"),
];

/// Immutable graph description: ordered nodes, undirected edges, id lookup.
#[derive(Debug, Clone)]
pub struct GraphSpec {
    nodes: Vec<NodeSpec>,
    edges: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl GraphSpec {
    /// Builds a graph from explicit node and edge lists.
    ///
    /// Every edge endpoint must reference a node in the list and no edge
    /// may be a self-loop; a violation is a programming error in the
    /// topology tables and fails construction.
    pub fn new(nodes: Vec<NodeSpec>, edges: Vec<(String, String)>) -> Result<Self> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(MeshError::construction(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }

        for (source, target) in &edges {
            if !index.contains_key(source.as_str()) {
                return Err(MeshError::construction(format!(
                    "edge ({source}, {target}) references unknown node '{source}'"
                )));
            }
            if !index.contains_key(target.as_str()) {
                return Err(MeshError::construction(format!(
                    "edge ({source}, {target}) references unknown node '{target}'"
                )));
            }
            if source == target {
                return Err(MeshError::construction(format!(
                    "self-loop on node '{source}'"
                )));
            }
        }

        Ok(Self {
            nodes,
            edges,
            index,
        })
    }

    /// Builds the fixed credit-mesh topology: the `user` hub connected to
    /// every other node, five cluster chains and four cross-cluster links.
    pub fn credit_mesh() -> Result<Self> {
        let nodes: Vec<NodeSpec> = NODE_TABLE
            .iter()
            .map(|(id, label, cluster)| NodeSpec {
                id: (*id).to_string(),
                label: (*label).to_string(),
                cluster: *cluster,
            })
            .collect();

        let mut edges: Vec<(String, String)> = NODE_TABLE
            .iter()
            .skip(1)
            .map(|(id, _, _)| ("user".to_string(), (*id).to_string()))
            .collect();
        edges.extend(
            EDGE_TABLE
                .iter()
                .map(|(s, t)| ((*s).to_string(), (*t).to_string())),
        );

        Self::new(nodes, edges)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    pub fn node(&self, index: usize) -> &NodeSpec {
        &self.nodes[index]
    }

    /// Index of the node with the given id, if present.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Node ids in index order.
    pub fn node_order(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Per-node class label: the cluster's index in sorted name order.
    pub fn labels(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .map(|n| n.cluster.label_index())
            .collect()
    }

    /// Cluster name to label index, in sorted name order.
    pub fn cluster_label_map(&self) -> BTreeMap<String, usize> {
        Cluster::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), c.label_index()))
            .collect()
    }

    /// Number of distinct clusters (the model's output class count).
    pub fn num_classes(&self) -> usize {
        Cluster::ALL.len()
    }

    /// Dense binary adjacency matrix: symmetric, zero diagonal, both
    /// directed entries set for each undirected edge.
    pub fn adjacency(&self) -> DMatrix<f64> {
        let n = self.nodes.len();
        let mut adjacency = DMatrix::zeros(n, n);
        for (source, target) in &self.edges {
            let i = self.index[source.as_str()];
            let j = self.index[target.as_str()];
            adjacency[(i, j)] = 1.0;
            adjacency[(j, i)] = 1.0;
        }
        adjacency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_mesh_dimensions() {
        let spec = GraphSpec::credit_mesh().unwrap();
        assert_eq!(spec.len(), 26);
        // 25 hub edges + 20 chain edges + 4 cross-cluster links
        assert_eq!(spec.edges().len(), 49);
        assert_eq!(spec.index_of("user"), Some(0));
        assert_eq!(spec.num_classes(), 6);
    }

    #[test]
    fn test_adjacency_symmetric_zero_diagonal() {
        let spec = GraphSpec::credit_mesh().unwrap();
        let a = spec.adjacency();
        for i in 0..spec.len() {
            assert_eq!(a[(i, i)], 0.0, "diagonal must be zero at {}", i);
            for j in 0..spec.len() {
                assert_eq!(a[(i, j)], a[(j, i)], "asymmetry at ({}, {})", i, j);
            }
        }
    }

    #[test]
    fn test_user_is_hub() {
        let spec = GraphSpec::credit_mesh().unwrap();
        let a = spec.adjacency();
        let user = spec.index_of("user").unwrap();
        let degree: f64 = a.row(user).iter().sum();
        assert_eq!(degree, (spec.len() - 1) as f64);
    }

    #[test]
    fn test_unknown_edge_endpoint_rejected() {
        let nodes = vec![NodeSpec {
            id: "user".to_string(),
            label: "USER_CORE".to_string(),
            cluster: Cluster::User,
        }];
        let edges = vec![("user".to_string(), "ghost".to_string())];
        let err = GraphSpec::new(nodes, edges).unwrap_err();
        assert!(matches!(err, MeshError::Construction(_)));
    }

    #[test]
    fn test_self_loop_rejected() {
        let nodes = vec![NodeSpec {
            id: "user".to_string(),
            label: "USER_CORE".to_string(),
            cluster: Cluster::User,
        }];
        let edges = vec![("user".to_string(), "user".to_string())];
        let err = GraphSpec::new(nodes, edges).unwrap_err();
        assert!(matches!(err, MeshError::Construction(_)));
    }

    #[test]
    fn test_label_order_is_lexicographic() {
        let spec = GraphSpec::credit_mesh().unwrap();
        let map = spec.cluster_label_map();
        let names: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["income", "obligation", "peer", "savings", "spending", "user"]
        );
        assert_eq!(map["income"], 0);
        assert_eq!(map["user"], 5);
    }

    #[test]
    fn test_labels_match_clusters() {
        let spec = GraphSpec::credit_mesh().unwrap();
        let labels = spec.labels();
        assert_eq!(labels.len(), spec.len());
        assert_eq!(labels[0], Cluster::User.label_index());
        let distinct: std::collections::HashSet<usize> = labels.iter().copied().collect();
        assert_eq!(distinct.len(), spec.num_classes());
    }
}
