//! Configuration structures for the amount pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TallyError};

/// Main configuration for the tally pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Model configuration.
    pub models: ModelConfig,

    /// Token extraction and classification configuration.
    pub extraction: ExtractionConfig,

    /// External label service configuration.
    pub labeling: LabelingConfig,
}

/// OCR collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Upper bound on a single recognition call, in seconds.
    pub timeout_secs: u64,

    /// Regions recognised below this confidence are dropped (0.0 - 1.0).
    pub min_confidence: f32,

    /// Keep `[UNK]` markers emitted by the recognizer.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 35,
            min_confidence: 0.0,
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Model file locations for the native OCR engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

/// Tokenizer, classifier and finalizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Use tokens from financial lines when any are found.
    pub prefer_financial_lines: bool,

    /// Characters of left context inspected first when classifying.
    pub context_before_chars: usize,

    /// Characters on each side inspected when the left context is silent.
    pub context_window_chars: usize,

    /// Characters on each side kept in provenance snippets.
    pub snippet_window_chars: usize,

    /// Scan for explicit "Label: amount" patterns when no required role is found.
    pub explicit_label_fallback: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            prefer_financial_lines: true,
            context_before_chars: 30,
            context_window_chars: 50,
            snippet_window_chars: 30,
            explicit_label_fallback: true,
        }
    }
}

/// External label service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Ask the external service for labels.
    pub enabled: bool,

    /// Service endpoint URL.
    pub endpoint: Option<String>,

    /// Model name passed to the service.
    pub model: String,

    /// Environment variable holding a bearer token for the service.
    pub api_key_env: String,

    /// Upper bound on a single labeling call, in seconds.
    pub timeout_secs: u64,

    /// External labels override context labels for the same value.
    pub prefer_external: bool,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            model: "llama3.1".to_string(),
            api_key_env: "TALLY_LABEL_API_KEY".to_string(),
            timeout_secs: 10,
            prefer_external: true,
        }
    }
}

impl LabelingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TallyConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| TallyError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| TallyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TallyConfig =
            serde_json::from_str(r#"{"ocr": {"timeout_secs": 5}}"#).unwrap();
        assert_eq!(config.ocr.timeout(), Duration::from_secs(5));
        assert_eq!(config.extraction.context_before_chars, 30);
        assert!(config.labeling.prefer_external);
        assert!(!config.labeling.enabled);
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let dir = std::env::temp_dir().join(format!("tally-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = TallyConfig::default();
        config.labeling.endpoint = Some("http://localhost:11434/api/generate".to_string());
        config.save(&path).unwrap();

        let loaded = TallyConfig::from_file(&path).unwrap();
        assert_eq!(loaded.labeling.endpoint, config.labeling.endpoint);
        assert_eq!(loaded.ocr.timeout_secs, 35);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_errors_are_typed() {
        let dir = std::env::temp_dir().join(format!("tally-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = TallyConfig::from_file(&dir.join("missing.json"));
        assert!(matches!(missing, Err(TallyError::Io(_))));

        let path = dir.join("broken.json");
        std::fs::write(&path, r#"{"ocr": {"timeout_secs": "soon"}}"#).unwrap();
        match TallyConfig::from_file(&path) {
            Err(TallyError::Config(message)) => assert!(message.contains("broken.json")),
            other => panic!("expected a config error, got {:?}", other),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
