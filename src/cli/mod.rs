//! Command-line interface for spanrec.
//!
//! Provides commands for reconciling span batches, validating offsets,
//! probing pairwise similarity, and showing the resolved configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::hashing::DEFAULT_DIMENSIONS;
use crate::config::{load_config, ResolvedClassifier, ResolvedConfig};
use crate::core::{anchor_text, normalize, shares_token, validate_span, OverlapDetector};

pub mod io;

use io::{parse_spans, read_input, render_spans, write_output};

/// spanrec - Reconcile overlapping labelled text spans
#[derive(Parser, Debug)]
#[command(name = "spanrec")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .spanrec/config.yaml in this or a parent directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full reconciliation pipeline over a JSONL span batch
    Reconcile {
        /// Input JSONL file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output JSONL file (writes to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field holding the document identifier
        #[arg(long)]
        key_field: Option<String>,

        /// Cosine similarity threshold for overlap
        #[arg(long)]
        threshold: Option<f64>,

        /// kNN reference set used to relabel cross-label conflicts
        #[arg(long)]
        classifier: Option<PathBuf>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check span offsets against their source text
    Validate {
        /// Input JSONL file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show how two texts score against the overlap gates
    Similarity {
        /// First text
        a: String,

        /// Second text
        b: String,

        /// Cosine similarity threshold
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;

        match self.command {
            Commands::Reconcile {
                input,
                output,
                key_field,
                threshold,
                classifier,
                report,
            } => {
                reconcile(
                    config,
                    ReconcileArgs {
                        input,
                        output,
                        key_field,
                        threshold,
                        classifier,
                        report,
                    },
                )
                .await
            }
            Commands::Validate { input } => validate(input).await,
            Commands::Similarity { a, b, threshold } => {
                similarity(&config, &a, &b, threshold)
            }
            Commands::Config => show_config(&config),
        }
    }
}

struct ReconcileArgs {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    key_field: Option<String>,
    threshold: Option<f64>,
    classifier: Option<PathBuf>,
    report: Option<PathBuf>,
}

async fn reconcile(mut config: ResolvedConfig, args: ReconcileArgs) -> Result<()> {
    config.apply_overrides(args.key_field, args.threshold)?;
    if let Some(reference_file) = args.classifier {
        let dimensions = config
            .classifier
            .as_ref()
            .map(|c| c.dimensions)
            .unwrap_or(DEFAULT_DIMENSIONS);
        config.classifier = Some(ResolvedClassifier {
            reference_file,
            dimensions,
        });
    }

    let content = read_input(args.input.as_deref()).await?;
    let spans = parse_spans(&content)?;

    let engine = config.build_engine()?;
    let result = engine.run(spans);
    result.report.log();

    write_output(args.output.as_deref(), &render_spans(&result.spans)?).await?;

    if let Some(path) = args.report {
        let json = serde_json::to_string_pretty(&result.report)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    Ok(())
}

async fn validate(input: Option<PathBuf>) -> Result<()> {
    let content = read_input(input.as_deref()).await?;
    let spans = parse_spans(&content)?;

    let mut malformed = 0;
    for (row, span) in spans.iter().enumerate() {
        if let Err(e) = validate_span(span) {
            malformed += 1;
            let (start, end) = span.offsets().unwrap_or((0, 0));
            let context = anchor_text(&span.source_text, start.max(0) as usize, end.max(0) as usize, 80);
            println!("row {}: [{}] {}", row, span.label, e);
            println!("  context: {}", context);
        }
    }

    println!();
    println!("{} spans, {} malformed", spans.len(), malformed);
    Ok(())
}

fn similarity(config: &ResolvedConfig, a: &str, b: &str, threshold: Option<f64>) -> Result<()> {
    let threshold = threshold.unwrap_or(config.similarity_threshold);
    let detector = OverlapDetector::new(threshold);

    let norm_a = normalize(a);
    let norm_b = normalize(b);
    let shared = shares_token(&norm_a, &norm_b);
    let score = detector.similarity(a, b);

    println!("a (normalized): {}", norm_a);
    println!("b (normalized): {}", norm_b);
    println!("shared token:   {}", if shared { "yes" } else { "no" });
    println!("cosine:         {:.4}", score);
    println!(
        "content match:  {} (threshold {})",
        if shared && score > threshold { "yes" } else { "no" },
        threshold
    );
    Ok(())
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
