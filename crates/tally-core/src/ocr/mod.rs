//! OCR collaborator interface.
//!
//! The pipeline only needs `image -> text`. Recognition is bounded by a
//! deadline and any failure is treated as "no text produced".

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OcrError;
use crate::extraction::rules::patterns::OCR_LINE_NOISE;

/// Turns an image into raw text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Engine name for logging.
    fn name(&self) -> &str;

    /// Recognize all text in the image, lines separated by `\n`.
    async fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// A recognized line of text with its quadrilateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRegion {
    /// Corner coordinates (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],
    pub text: String,
    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextRegion {
    /// Top-left corner of the axis-aligned bounding rectangle.
    pub fn top_left(&self) -> (f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];
        (
            xs.iter().cloned().fold(f32::INFINITY, f32::min),
            ys.iter().cloned().fold(f32::INFINITY, f32::min),
        )
    }
}

/// Sort regions top-to-bottom, then left-to-right within a 20px row, and
/// join their text with newlines.
pub fn reading_order_text(regions: &mut [TextRegion]) -> String {
    regions.sort_by(|a, b| {
        let (ax, ay) = a.top_left();
        let (bx, by) = b.top_left();
        let row_a = (ay / 20.0) as i32;
        let row_b = (by / 20.0) as i32;
        row_a
            .cmp(&row_b)
            .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
    });

    regions
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip trailing whitespace and leading stray symbols from each line.
/// Currency signs at the start of a line are kept.
pub fn clean_ocr_text(text: &str) -> String {
    let trimmed: Vec<&str> = text.lines().map(str::trim_end).collect();
    OCR_LINE_NOISE
        .replace_all(&trimmed.join("\n"), "")
        .trim_end()
        .to_string()
}

/// Run a recognizer under a deadline. Failures and timeouts yield `None`.
pub async fn recognize_with_deadline(
    recognizer: &dyn TextRecognizer,
    image: &DynamicImage,
    deadline: Duration,
) -> Option<String> {
    match tokio::time::timeout(deadline, recognizer.recognize(image)).await {
        Ok(Ok(text)) => {
            debug!("{} recognized {} characters", recognizer.name(), text.len());
            Some(text)
        }
        Ok(Err(e)) => {
            warn!("OCR with {} failed, continuing without image text: {}", recognizer.name(), e);
            None
        }
        Err(_) => {
            let e = OcrError::Timeout(deadline);
            warn!("OCR with {} failed, continuing without image text: {}", recognizer.name(), e);
            None
        }
    }
}
