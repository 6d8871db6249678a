//! CLI subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod process;
pub mod stage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use tally_core::labels::StaticLabelService;
use tally_core::models::TallyConfig;
use tally_core::{AmountPipeline, PureOcrEngine, StageOutcome};

use crate::labeler::HttpLabelService;

/// Exit status for runs that ended on a guardrail.
pub const GUARDRAIL_EXIT: u8 = 2;

/// Printed in place of a result when a stage faults unexpectedly.
pub const INTERNAL_ERROR_JSON: &str = r#"{"error":"internal_error"}"#;

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("config.json")
}

/// Load the explicit config file, else the default one if present, else
/// built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TallyConfig> {
    if let Some(path) = config_path {
        return TallyConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config at {}", default_path.display());
        return Ok(TallyConfig::from_file(&default_path)?);
    }

    Ok(TallyConfig::default())
}

/// Collaborators a command wants attached to its pipeline.
#[derive(Default)]
pub struct PipelineOptions<'a> {
    /// Load the OCR engine.
    pub ocr: bool,
    pub model_dir: Option<&'a Path>,
    /// Static label file, used instead of the configured HTTP service.
    pub labels: Option<&'a Path>,
}

/// Build a pipeline and attach whichever collaborators are available.
///
/// A missing OCR model or label service is logged and left out; the
/// pipeline then runs on text and context heuristics alone.
pub fn build_pipeline(config: &TallyConfig, options: PipelineOptions<'_>) -> anyhow::Result<AmountPipeline> {
    let mut pipeline = AmountPipeline::new(config);

    if options.ocr {
        let model_dir = options
            .model_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.models.model_dir.clone());
        match PureOcrEngine::from_dir(&model_dir, config) {
            Ok(engine) => pipeline = pipeline.with_recognizer(Arc::new(engine)),
            Err(e) => warn!("OCR unavailable, images will yield no text: {}", e),
        }
    }

    if let Some(path) = options.labels {
        let service = StaticLabelService::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load labels: {}", e))?;
        pipeline = pipeline.with_label_service(Arc::new(service));
    } else {
        match HttpLabelService::from_config(&config.labeling) {
            Ok(Some(service)) => pipeline = pipeline.with_label_service(Arc::new(service)),
            Ok(None) => {}
            Err(e) => warn!("Label service unavailable: {}", e),
        }
    }

    Ok(pipeline)
}

pub fn is_image_path(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    matches!(
        ext.as_str(),
        "png" | "jpg" | "jpeg" | "webp" | "tiff" | "tif" | "bmp"
    )
}

/// Read text from a file, or from stdin when the path is `-`.
pub fn read_text_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))
}

/// Serialize a stage outcome and pick the matching exit status.
pub fn render_outcome<T: Serialize>(outcome: &StageOutcome<T>) -> anyhow::Result<(String, ExitCode)> {
    let json = serde_json::to_string_pretty(outcome)?;
    let code = if outcome.is_guardrail() {
        ExitCode::from(GUARDRAIL_EXIT)
    } else {
        ExitCode::SUCCESS
    };
    Ok((json, code))
}
