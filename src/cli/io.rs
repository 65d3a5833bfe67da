//! JSON Lines input/output for span batches.
//!
//! Reads from a file or stdin and writes to a file or stdout. One span
//! record per line; blank lines are skipped.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::domain::Span;

/// Read the whole input from a file, or stdin when no path is given
pub async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Write output to a file, or stdout when no path is given
pub async fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write output file: {}", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(content.as_bytes()).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}

/// Parse JSONL span records
pub fn parse_spans(content: &str) -> Result<Vec<Span>> {
    let mut spans = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let span: Span = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse span on line {}", idx + 1))?;
        spans.push(span);
    }

    Ok(spans)
}

/// Render spans as JSONL
pub fn render_spans(spans: &[Span]) -> Result<String> {
    let mut out = String::new();
    for span in spans {
        out.push_str(&serde_json::to_string(span).context("Failed to serialize span")?);
        out.push('\n');
    }
    Ok(out)
}
