//! Stage command - run one pipeline stage on a JSON request.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, ValueEnum};
use serde::de::DeserializeOwned;
use tracing::info;

use tally_core::models::stage::{ClassifyRequest, ExtractRequest, FinalizeRequest, NormalizeRequest};

use super::{build_pipeline, load_config, read_text_input, render_outcome, PipelineOptions};

/// Arguments for the stage command.
#[derive(Args)]
pub struct StageArgs {
    /// Stage to run
    #[arg(value_enum)]
    stage: Stage,

    /// JSON request file ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    request: PathBuf,

    /// Image to OCR (extract stage only)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// JSON label file used instead of the configured label service
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Stage {
    Extract,
    Normalize,
    Classify,
    Finalize,
}

fn parse_request<T: DeserializeOwned>(raw: &str) -> anyhow::Result<T> {
    // An empty body is treated as an empty request
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid request: {}", e))
}

pub async fn run(args: StageArgs, config_path: Option<&str>) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;
    let raw = read_text_input(&args.request)?;

    if args.image.is_some() && !matches!(args.stage, Stage::Extract) {
        anyhow::bail!("--image only applies to the extract stage");
    }

    let image = match &args.image {
        Some(path) => Some(image::open(path)?),
        None => None,
    };

    let pipeline = build_pipeline(
        &config,
        PipelineOptions {
            ocr: image.is_some(),
            model_dir: args.model_dir.as_deref(),
            labels: args.labels.as_deref(),
        },
    )?;

    info!("Running {:?} stage", args.stage);

    let (json, code) = match args.stage {
        Stage::Extract => {
            let request: ExtractRequest = parse_request(&raw)?;
            render_outcome(&pipeline.extract(request.text.as_deref(), image.as_ref()).await)?
        }
        Stage::Normalize => {
            let request: NormalizeRequest = parse_request(&raw)?;
            render_outcome(&pipeline.normalize(&request.raw_tokens))?
        }
        Stage::Classify => {
            let request: ClassifyRequest = parse_request(&raw)?;
            let outcome = pipeline
                .classify(&request.normalized_amounts, &request.raw_text, &request.raw_tokens)
                .await;
            render_outcome(&outcome)?
        }
        Stage::Finalize => {
            let request: FinalizeRequest = parse_request(&raw)?;
            render_outcome(&pipeline.finalize(&request.amounts, request.currency, &request.raw_text))?
        }
    };

    println!("{}", json);
    Ok(code)
}
