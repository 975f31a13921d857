// Rust guideline compliant 2026-02-23

//! Risk-labeling entry point.
//!
//! Three subcommands share one binary:
//!
//! - `label`: CSV in, RFM-augmented CSV out, optional `SQLite` run record.
//! - `score`: one transaction through `RiskScorer<DemoFeatures, DemoRiskModel>`.
//! - `evaluate`: classification metrics from a CSV of labels and probabilities.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info cargo run --bin risk_labeling -- label -i data.csv -o labeled.csv
//! RUST_LOG=info cargo run --bin risk_labeling -- label -i data.csv -o labeled.csv --sqlite sqlite:labels.db
//! cargo run --bin risk_labeling -- score --customer-id c1 --amount 250 --timestamp 2025-12-01T10:00:00Z
//! cargo run --bin risk_labeling -- evaluate -i scores.csv
//! ```

mod adapters;
mod cli;

use adapters::csv_table;
use adapters::demo_features::DemoFeatures;
use adapters::demo_model::DemoRiskModel;
use adapters::sqlite_store::SqliteLabelStore;
use anyhow::Context as _;
use clap::Parser as _;
use cli::{Cli, Command, EvaluateArgs, LabelArgs, ScoreArgs};
use domain::{LabelRun, LabelStore as _, ScoringRequest, TransactionTable};
use rfm::RfmConfig;
use scorer::RiskScorer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Label(args) => run_label(&args).await,
        Command::Score(args) => run_score(args).await,
        Command::Evaluate(args) => run_evaluate(&args),
    }
}

async fn run_label(args: &LabelArgs) -> anyhow::Result<()> {
    let mut builder = RfmConfig::builder()
        .id_col(&args.id_col)
        .amount_col(&args.amount_col)
        .datetime_col(&args.datetime_col)
        .n_clusters(args.clusters)
        .random_state(args.seed)
        .max_iter(args.max_iter)
        .tolerance(args.tolerance);
    if let Some(snapshot) = args.snapshot_date {
        builder = builder.snapshot_date(snapshot);
    }
    let config = builder.build().context("failed to build rfm config")?;

    let table = csv_table::read_table(&args.input)?;
    tracing::info!("main.label: input={} rows={}", args.input.display(), table.len());
    let labeled = rfm::add_rfm_target(table, &config).context("failed to label transactions")?;

    if let Some(url) = &args.sqlite {
        let store = SqliteLabelStore::new(url)
            .await
            .with_context(|| format!("failed to open SQLite store {url}"))?;
        let run = LabelRun { run_id: uuid::Uuid::new_v4(), summary: labeled.summary() };
        store
            .write_run(&run, labeled.customers())
            .await
            .context("failed to persist label run")?;
        println!("run_id: {}", run.run_id);
    }

    let summary = labeled.summary();
    let flagged = labeled.customers().iter().filter(|s| s.is_high_risk).count();
    let customers = labeled.customers().len();
    let out = labeled.into_augmented_table()?;
    csv_table::write_table(&args.output, &out)?;

    println!("snapshot date:     {}", summary.snapshot_date);
    println!("clusters:          {}", summary.n_clusters);
    println!("high-risk cluster: {}", summary.high_risk_cluster);
    println!("seed:              {}", summary.random_state);
    println!("high-risk customers: {flagged} of {customers}");
    println!("wrote {} rows to {}", out.len(), args.output.display());
    Ok(())
}

async fn run_score(args: ScoreArgs) -> anyhow::Result<()> {
    let scorer = RiskScorer::new(DemoFeatures, DemoRiskModel).context("failed to build scorer")?;
    let info = scorer.model_info();
    let request = ScoringRequest {
        transaction_id: args.transaction_id,
        customer_id: args.customer_id,
        amount: args.amount,
        timestamp: args.timestamp,
    };
    let score = scorer.score(&request).await.context("failed to score transaction")?;
    println!("model:            {} v{}", info.name, info.version);
    println!("transaction:      {}", score.transaction_id);
    println!("risk_probability: {:.6}", score.risk_probability);
    Ok(())
}

fn run_evaluate(args: &EvaluateArgs) -> anyhow::Result<()> {
    let table = csv_table::read_table(&args.input)?;
    let (y_true, y_proba) = label_columns(&table, &args.label_col, &args.proba_col)?;
    let m = evaluation::compute_metrics(&y_true, &y_proba, args.threshold)
        .context("failed to compute metrics")?;
    println!("samples:   {}", y_true.len());
    println!("accuracy:  {:.4}", m.accuracy);
    println!("precision: {:.4}", m.precision);
    println!("recall:    {:.4}", m.recall);
    println!("f1:        {:.4}", m.f1);
    println!("roc_auc:   {:.4}", m.roc_auc);
    Ok(())
}

/// Parse the 0/1 label column and the probability column of `table`.
fn label_columns(
    table: &TransactionTable,
    label_col: &str,
    proba_col: &str,
) -> anyhow::Result<(Vec<u8>, Vec<f64>)> {
    let label_idx = table
        .column_index(label_col)
        .with_context(|| format!("missing column {label_col}"))?;
    let proba_idx = table
        .column_index(proba_col)
        .with_context(|| format!("missing column {proba_col}"))?;

    let mut y_true = Vec::with_capacity(table.len());
    let mut y_proba = Vec::with_capacity(table.len());
    for (row, cells) in table.rows().iter().enumerate() {
        let label = cells[label_idx].trim();
        y_true.push(
            label
                .parse::<u8>()
                .with_context(|| format!("row {row}: bad label {label:?}"))?,
        );
        let proba = cells[proba_idx].trim();
        y_proba.push(
            proba
                .parse::<f64>()
                .with_context(|| format!("row {row}: bad probability {proba:?}"))?,
        );
    }
    Ok((y_true, y_proba))
}
