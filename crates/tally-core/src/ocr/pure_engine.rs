//! Native OCR using `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::{reading_order_text, TextRecognizer, TextRegion};
use crate::error::OcrError;
use crate::models::config::{OcrConfig, TallyConfig};

/// Recognizer backed by detection and recognition models on disk.
#[derive(Clone)]
pub struct PureOcrEngine {
    engine: Arc<pure_onnx_ocr::engine::OcrEngine>,
    config: OcrConfig,
}

impl PureOcrEngine {
    /// Load the models named in `config` from `model_dir`.
    pub fn from_dir(model_dir: &Path, config: &TallyConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&config.models.detection_model);
        let rec_path = model_dir.join(&config.models.recognition_model);
        let dict_path = model_dir.join(&config.models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing {}", path.display())));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine: Arc::new(engine),
            config: config.ocr.clone(),
        })
    }

    /// Load from the configured model directory.
    pub fn from_config(config: &TallyConfig) -> Result<Self, OcrError> {
        Self::from_dir(&config.models.model_dir, config)
    }

    /// Recognize text regions, dropping those below the confidence floor.
    pub fn regions(&self, image: &DynamicImage) -> Result<Vec<TextRegion>, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        debug!("Running OCR on {}x{} image", width, height);

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let regions: Vec<TextRegion> = results
            .iter()
            .filter(|r| r.confidence >= self.config.min_confidence)
            .map(|r| TextRegion {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                },
                confidence: r.confidence,
            })
            .collect();

        info!(
            "OCR kept {} of {} regions in {}ms",
            regions.len(),
            results.len(),
            start.elapsed().as_millis()
        );

        Ok(regions)
    }
}

#[async_trait]
impl TextRecognizer for PureOcrEngine {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let engine = self.clone();
        let image = image.clone();

        let mut regions = tokio::task::spawn_blocking(move || engine.regions(&image))
            .await
            .map_err(|e| OcrError::Recognition(format!("OCR task failed: {}", e)))??;

        Ok(reading_order_text(&mut regions))
    }
}

/// First four exterior points of a polygon as `[x1, y1, ..., x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
