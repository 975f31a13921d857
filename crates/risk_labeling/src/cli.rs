// Rust guideline compliant 2026-02-23

//! Command-line interface definitions.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};

/// RFM proxy risk labeling, single-transaction scoring and model evaluation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Label every transaction row with its customer's RFM segment and risk flag
    Label(LabelArgs),
    /// Score one transaction with the demo feature engineer and model
    Score(ScoreArgs),
    /// Compute classification metrics from a labels + probabilities CSV
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct LabelArgs {
    /// Input transactions CSV
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output CSV with Recency, Frequency, Monetary and is_high_risk appended
    #[arg(short, long)]
    pub output: PathBuf,

    /// Customer identifier column
    #[arg(long, default_value = "CustomerId")]
    pub id_col: String,

    /// Transaction amount column
    #[arg(long, default_value = "Amount")]
    pub amount_col: String,

    /// Transaction timestamp column
    #[arg(long, default_value = "TransactionStartTime")]
    pub datetime_col: String,

    /// Reference date for Recency; defaults to the latest transaction + 1 day
    #[arg(long, value_parser = parse_snapshot)]
    pub snapshot_date: Option<NaiveDateTime>,

    /// Number of customer segments
    #[arg(short = 'k', long, default_value = "3")]
    pub clusters: usize,

    /// Seed for k-means initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum k-means iterations
    #[arg(long, default_value = "300")]
    pub max_iter: usize,

    /// Stop k-means once centroids move less than this
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Also persist per-customer segments to this SQLite URL, e.g. sqlite:labels.db
    #[arg(long)]
    pub sqlite: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Transaction identifier echoed in the output
    #[arg(long, default_value = "tx-0")]
    pub transaction_id: String,

    /// Customer identifier
    #[arg(long)]
    pub customer_id: String,

    /// Transaction amount; negative for refunds
    #[arg(long, allow_negative_numbers = true)]
    pub amount: f64,

    /// Transaction timestamp, e.g. 2025-12-01T10:00:00Z
    #[arg(long)]
    pub timestamp: String,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// CSV holding true labels and predicted probabilities
    #[arg(short, long)]
    pub input: PathBuf,

    /// Column with the 0/1 ground truth
    #[arg(long, default_value = "is_high_risk")]
    pub label_col: String,

    /// Column with the predicted probability of class 1
    #[arg(long, default_value = "risk_probability")]
    pub proba_col: String,

    /// Probability at or above which a prediction is positive
    #[arg(long, default_value_t = evaluation::DEFAULT_THRESHOLD)]
    pub threshold: f64,
}

fn parse_snapshot(raw: &str) -> Result<NaiveDateTime, String> {
    rfm::aggregate::parse_timestamp(raw).ok_or_else(|| format!("unrecognized date: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_defaults() {
        let cli = Cli::try_parse_from(["risk_labeling", "label", "-i", "in.csv", "-o", "out.csv"]).unwrap();
        let Command::Label(args) = cli.command else {
            panic!("expected label subcommand");
        };
        assert_eq!(args.id_col, "CustomerId");
        assert_eq!(args.amount_col, "Amount");
        assert_eq!(args.datetime_col, "TransactionStartTime");
        assert_eq!(args.clusters, 3);
        assert_eq!(args.seed, 42);
        assert!(args.snapshot_date.is_none());
        assert!(args.sqlite.is_none());
    }

    #[test]
    fn label_snapshot_is_parsed() {
        let cli = Cli::try_parse_from([
            "risk_labeling",
            "label",
            "-i",
            "in.csv",
            "-o",
            "out.csv",
            "--snapshot-date",
            "2025-12-31",
            "-k",
            "4",
        ])
        .unwrap();
        let Command::Label(args) = cli.command else {
            panic!("expected label subcommand");
        };
        assert_eq!(args.snapshot_date.unwrap().to_string(), "2025-12-31 00:00:00");
        assert_eq!(args.clusters, 4);
    }

    #[test]
    fn bad_snapshot_is_rejected() {
        let result = Cli::try_parse_from([
            "risk_labeling",
            "label",
            "-i",
            "in.csv",
            "-o",
            "out.csv",
            "--snapshot-date",
            "someday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn score_accepts_negative_amount() {
        let cli = Cli::try_parse_from([
            "risk_labeling",
            "score",
            "--customer-id",
            "c1",
            "--amount",
            "-25.5",
            "--timestamp",
            "2025-12-01T10:00:00Z",
        ])
        .unwrap();
        let Command::Score(args) = cli.command else {
            panic!("expected score subcommand");
        };
        assert!((args.amount + 25.5).abs() < f64::EPSILON);
    }

    #[test]
    fn evaluate_default_threshold() {
        let cli = Cli::try_parse_from(["risk_labeling", "evaluate", "-i", "scores.csv"]).unwrap();
        let Command::Evaluate(args) = cli.command else {
            panic!("expected evaluate subcommand");
        };
        assert!((args.threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(args.label_col, "is_high_risk");
    }
}
