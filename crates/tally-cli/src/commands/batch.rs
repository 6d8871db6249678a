//! Batch processing command for multiple bills.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use tally_core::models::stage::FinalizeOutput;
use tally_core::{AmountPipeline, RequiredRole, StageOutcome};

use super::{build_pipeline, is_image_path, load_config, PipelineOptions};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching .txt files or images
    #[arg(required = true)]
    input: String,

    /// Directory for per-file JSON results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// JSON label file used instead of the configured label service
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    outcome: Option<StageOutcome<FinalizeOutput>>,
    error: Option<String>,
    processing_time_ms: u64,
}

impl ProcessResult {
    fn status(&self) -> &'static str {
        match &self.outcome {
            Some(StageOutcome::Completed(_)) => "ok",
            Some(StageOutcome::Halted(_)) => "no_amounts_found",
            None => "error",
        }
    }

    fn amount(&self, role: RequiredRole) -> String {
        self.outcome
            .as_ref()
            .and_then(|o| o.output())
            .and_then(|o| o.amounts.iter().find(|a| a.role == role))
            .map(|a| a.value.to_string())
            .unwrap_or_default()
    }
}

fn is_supported(path: &Path) -> bool {
    let is_text = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    is_text || is_image_path(path)
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<ExitCode> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = build_pipeline(
        &config,
        PipelineOptions {
            ocr: files.iter().any(|p| is_image_path(p)),
            model_dir: args.model_dir.as_deref(),
            labels: args.labels.as_deref(),
        },
    )?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = process_single_file(&path, &pipeline).await;
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) => results.push(ProcessResult {
                path,
                outcome: Some(outcome),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if !args.continue_on_error {
                    pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                results.push(ProcessResult {
                    path,
                    outcome: None,
                    error: Some(error_msg),
                    processing_time_ms,
                });
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            let Some(outcome) = &result.outcome else {
                continue;
            };
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("bill");
            let output_path = output_dir.join(format!("{}.json", output_name));
            fs::write(&output_path, serde_json::to_string_pretty(outcome)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let found = results.iter().filter(|r| r.status() == "ok").count();
    let halted = results.iter().filter(|r| r.status() == "no_amounts_found").count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} with amounts, {} without, {} failed",
        style(found).green(),
        style(halted).yellow(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn process_single_file(
    path: &Path,
    pipeline: &AmountPipeline,
) -> anyhow::Result<StageOutcome<FinalizeOutput>> {
    if is_image_path(path) {
        let image = image::open(path)?;
        if !pipeline.has_recognizer() {
            warn!("No OCR engine loaded, {} will yield no text", path.display());
        }
        Ok(pipeline.run_full(None, Some(&image)).await?)
    } else {
        let text = fs::read_to_string(path)?;
        Ok(pipeline.run_full(Some(&text), None).await?)
    }
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let processed_at = chrono::Utc::now().to_rfc3339();
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "currency",
        "total",
        "paid",
        "due",
        "reason",
        "processing_time_ms",
        "processed_at",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let currency = result
            .outcome
            .as_ref()
            .and_then(|o| o.output())
            .map(|o| o.currency.code())
            .unwrap_or("");
        let reason = result
            .outcome
            .as_ref()
            .and_then(|o| o.guardrail())
            .map(|g| g.reason.as_str())
            .unwrap_or("");

        wtr.write_record([
            filename,
            result.status(),
            currency,
            &result.amount(RequiredRole::TotalBill),
            &result.amount(RequiredRole::Paid),
            &result.amount(RequiredRole::Due),
            reason,
            &result.processing_time_ms.to_string(),
            &processed_at,
            result.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
