//! Credit-mesh GCN training.
//!
//! Builds the fixed relationship graph, synthesizes clustered node
//! features, trains the 2-layer GCN and persists the artifact alongside
//! the graph description and a training results dump.

use anyhow::{Context, Result};
use mesh_core::{normalize_adjacency, GraphDocument, GraphSpec};
use mesh_gnn::{FeatureConfig, Gcn, ModelArtifact, RiskScorer, Trainer, TrainingConfig};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 3 {
        eprintln!("Usage: {} [output_dir] [epochs]", args[0]);
        eprintln!("Example: {} artifacts 300", args[0]);
        std::process::exit(1);
    }

    let output_dir = args.get(1).cloned().unwrap_or_else(|| "artifacts".to_string());

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let mut training_config = TrainingConfig::default();
    if let Some(epochs) = args.get(2) {
        training_config.epochs = epochs
            .parse()
            .with_context(|| format!("invalid epoch count '{}'", epochs))?;
    }
    let feature_config = FeatureConfig::default();

    log::info!("Credit-mesh GCN training");
    log::info!("  Output: {}", output_dir);
    log::info!("  Epochs: {}", training_config.epochs);

    let spec = GraphSpec::credit_mesh()?;
    log::info!(
        "Built graph: {} nodes, {} edges, {} clusters",
        spec.len(),
        spec.edges().len(),
        spec.num_classes()
    );

    let a_hat = normalize_adjacency(&spec.adjacency())?;
    let (features, labels) = mesh_gnn::synthesize(&spec, &feature_config);

    let mut model = Gcn::new(
        feature_config.feature_dim,
        training_config.hidden_dim,
        spec.num_classes(),
        training_config.init_seed,
    );

    let start_time = std::time::Instant::now();
    let report = Trainer::new(training_config.clone()).run(&mut model, &features, &a_hat, &labels)?;
    log::info!(
        "Final node classification accuracy (all nodes): {:.3}",
        report.full_accuracy
    );

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir))?;
    let output = std::path::Path::new(&output_dir);

    let artifact_path = output.join("gnn_model.json");
    ModelArtifact::from_model(&model, &spec).save(&artifact_path)?;
    log::info!("Model saved to {:?}", artifact_path);

    let graph_path = output.join("synthetic_graph.json");
    GraphDocument::from_spec(&spec).write_json(&graph_path)?;
    log::info!("Graph description saved to {:?}", graph_path);

    let results = serde_json::json!({
        "training_config": training_config,
        "feature_config": feature_config,
        "history": report.history,
        "final": {
            "loss": report.final_loss,
            "train_accuracy": report.train_accuracy,
            "test_accuracy": report.test_accuracy,
            "full_accuracy": report.full_accuracy,
        },
        "completion_time": chrono::Utc::now(),
    });
    let results_path = output.join("training_results.json");
    std::fs::write(&results_path, serde_json::to_string_pretty(&results)?)
        .context("failed to save training results")?;
    log::info!("Results saved to {:?}", results_path);

    // reload the artifact the way the serving side will
    let scorer = RiskScorer::from_artifact(
        &artifact_path,
        &spec,
        &feature_config,
        training_config.hidden_dim,
    )?;
    let assessment = scorer.predict_user()?;
    log::info!(
        "User node check: risk={:.2} confidence={:.2}",
        assessment.risk_score,
        assessment.confidence
    );

    log::info!(
        "Training completed in {:.1}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
