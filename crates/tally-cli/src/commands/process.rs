//! Process command - run the full pipeline on one document.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use tally_core::models::stage::FinalizeOutput;
use tally_core::StageOutcome;

use super::{
    build_pipeline, is_image_path, load_config, read_text_input, render_outcome,
    PipelineOptions, INTERNAL_ERROR_JSON,
};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file: text, or an image to OCR ("-" reads text from stdin)
    input: Option<PathBuf>,

    /// Inline document text (appended after any OCR text)
    #[arg(short, long)]
    text: Option<String>,

    /// Image to OCR
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// JSON label file used instead of the configured label service
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<ExitCode> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut text_parts = Vec::new();
    let mut image_path = args.image.clone();

    if let Some(input) = &args.input {
        if is_image_path(input) {
            if image_path.is_some() {
                anyhow::bail!("Both INPUT and --image name an image; pass only one");
            }
            image_path = Some(input.clone());
        } else {
            text_parts.push(read_text_input(input)?);
        }
    }
    if let Some(text) = &args.text {
        text_parts.push(text.clone());
    }

    if text_parts.is_empty() && image_path.is_none() {
        anyhow::bail!("Nothing to process: pass INPUT, --text or --image");
    }

    let image = match &image_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Input file not found: {}", path.display());
            }
            info!("Loading image {}", path.display());
            Some(image::open(path)?)
        }
        None => None,
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Loading collaborators...");

    let pipeline = build_pipeline(
        &config,
        PipelineOptions {
            ocr: image.is_some(),
            model_dir: args.model_dir.as_deref(),
            labels: args.labels.as_deref(),
        },
    )?;

    pb.set_message("Extracting amounts...");
    let text = (!text_parts.is_empty()).then(|| text_parts.join("\n"));
    let result = pipeline.run_full(text.as_deref(), image.as_ref()).await;
    pb.finish_and_clear();

    let (content, code) = match result {
        Ok(outcome) => match args.format {
            OutputFormat::Json => render_outcome(&outcome)?,
            OutputFormat::Text => {
                let (_, code) = render_outcome(&outcome)?;
                (format_text(&outcome), code)
            }
        },
        Err(e) => {
            error!("Pipeline failed: {}", e);
            (INTERNAL_ERROR_JSON.to_string(), ExitCode::FAILURE)
        }
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &content)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", content);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(code)
}

fn format_text(outcome: &StageOutcome<FinalizeOutput>) -> String {
    let output = match outcome {
        StageOutcome::Completed(output) => output,
        StageOutcome::Halted(guardrail) => {
            return format!("No amounts found: {}\n", guardrail.reason);
        }
    };

    let mut text = format!("Currency: {}\n\n", output.currency.code());
    for amount in &output.amounts {
        text.push_str(&format!("{:<6} {}\n", amount.role.canonical_label(), amount.value));
        text.push_str(&format!("       {}\n", amount.source));
    }
    text
}
