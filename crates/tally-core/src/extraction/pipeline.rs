//! Pipeline orchestration: Extract → Normalize → Classify → Finalize.
//!
//! Every stage is exposed on its own and returns a [`StageOutcome`]. The
//! fused [`AmountPipeline::run_full`] walks an explicit state machine and
//! stops at the first guardrail.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, error, info, warn};

use super::classifier::{ClassifierOptions, ContextClassifier};
use super::confidence::mean_confidence;
use super::finalizer::Finalizer;
use super::normalizer::Normalizer;
use super::rules::detect_currency_hint;
use super::tokenizer::Tokenizer;
use crate::error::{Result, TallyError};
use crate::labels::LabelService;
use crate::models::stage::{
    ClassifyOutput, ExtractOutput, FinalizeOutput, NormalizeOutput, StageOutcome,
};
use crate::models::{ClassifiedAmount, CurrencyHint, Guardrail, TallyConfig};
use crate::ocr::{clean_ocr_text, recognize_with_deadline, TextRecognizer};

/// Token count at which the extract confidence saturates.
const TOKEN_SATURATION: f64 = 5.0;

/// Where a fused run currently stands.
#[derive(Debug)]
enum PipelineState {
    Extracted(ExtractOutput),
    Normalized {
        extracted: ExtractOutput,
        normalized: NormalizeOutput,
    },
    Classified {
        extracted: ExtractOutput,
        classified: ClassifyOutput,
    },
    Finalized(FinalizeOutput),
    Failed(Guardrail),
}

impl PipelineState {
    fn name(&self) -> &'static str {
        match self {
            PipelineState::Extracted(_) => "extracted",
            PipelineState::Normalized { .. } => "normalized",
            PipelineState::Classified { .. } => "classified",
            PipelineState::Finalized(_) => "finalized",
            PipelineState::Failed(_) => "failed",
        }
    }
}

/// Lift a stage outcome into the next state, or into `Failed`.
fn advance<T>(outcome: StageOutcome<T>, next: impl FnOnce(T) -> PipelineState) -> PipelineState {
    match outcome {
        StageOutcome::Completed(output) => next(output),
        StageOutcome::Halted(guardrail) => PipelineState::Failed(guardrail),
    }
}

/// The amount extraction pipeline.
#[derive(Clone)]
pub struct AmountPipeline {
    config: TallyConfig,
    tokenizer: Tokenizer,
    normalizer: Normalizer,
    classifier: ContextClassifier,
    finalizer: Finalizer,
    recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl AmountPipeline {
    /// Build a pipeline from configuration. OCR and external labels stay
    /// disabled until their collaborators are attached.
    pub fn new(config: &TallyConfig) -> Self {
        Self {
            config: config.clone(),
            tokenizer: Tokenizer::new().with_financial_lines(config.extraction.prefer_financial_lines),
            normalizer: Normalizer::new(),
            classifier: ContextClassifier::new(ClassifierOptions::from_config(config)),
            finalizer: Finalizer::new()
                .with_explicit_fallback(config.extraction.explicit_label_fallback),
            recognizer: None,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_label_service(mut self, service: Arc<dyn LabelService>) -> Self {
        self.classifier = self.classifier.with_label_service(service);
        self
    }

    pub fn config(&self) -> &TallyConfig {
        &self.config
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Stage 1: acquire text (OCR first, then `text`) and pull raw tokens.
    pub async fn extract(
        &self,
        text: Option<&str>,
        image: Option<&DynamicImage>,
    ) -> StageOutcome<ExtractOutput> {
        let ocr_text = match (image, &self.recognizer) {
            (Some(image), Some(recognizer)) => {
                recognize_with_deadline(recognizer.as_ref(), image, self.config.ocr.timeout())
                    .await
                    .map(|t| clean_ocr_text(&t))
            }
            (Some(_), None) => {
                warn!("Image supplied but no OCR engine is configured");
                None
            }
            _ => None,
        };

        let mut raw_text = String::new();
        if let Some(ocr_text) = ocr_text.filter(|t| !t.is_empty()) {
            raw_text.push_str(&ocr_text);
            raw_text.push('\n');
        }
        if let Some(text) = text {
            raw_text.push_str(text);
        }

        self.extract_text(raw_text)
    }

    /// Stage 1 on text that is already acquired.
    pub fn extract_text(&self, raw_text: String) -> StageOutcome<ExtractOutput> {
        if raw_text.trim().is_empty() {
            return StageOutcome::halted("document too noisy");
        }

        let tokens = self.tokenizer.extract_tokens(&raw_text);
        if tokens.is_empty() {
            debug!("No numeric tokens in {} characters of text", raw_text.len());
            return StageOutcome::halted("document too noisy");
        }

        let currency_hint = detect_currency_hint(&raw_text);
        let token_score = (tokens.len() as f64 / TOKEN_SATURATION).min(1.0);
        let currency_score = if currency_hint.is_known() { 1.0 } else { 0.5 };
        let confidence = mean_confidence(&[token_score, currency_score]);

        info!(
            "Extracted {} tokens, currency {}",
            tokens.len(),
            currency_hint.code()
        );

        StageOutcome::Completed(ExtractOutput {
            raw_tokens: tokens.into_iter().map(|t| t.text).collect(),
            currency_hint,
            confidence,
            raw_text,
        })
    }

    /// Stage 2.
    pub fn normalize(&self, raw_tokens: &[String]) -> StageOutcome<NormalizeOutput> {
        self.normalizer.normalize(raw_tokens)
    }

    /// Stage 3.
    pub async fn classify(
        &self,
        normalized_amounts: &[f64],
        raw_text: &str,
        raw_tokens: &[String],
    ) -> StageOutcome<ClassifyOutput> {
        self.classifier
            .classify(normalized_amounts, raw_text, raw_tokens)
            .await
    }

    /// Stage 4.
    pub fn finalize(
        &self,
        amounts: &[ClassifiedAmount],
        currency: CurrencyHint,
        raw_text: &str,
    ) -> StageOutcome<FinalizeOutput> {
        self.finalizer.finalize(amounts, currency, raw_text)
    }

    /// All four stages. A panic in any stage surfaces as
    /// [`TallyError::Internal`]; guardrails come back as `Ok(Halted)`.
    pub async fn run_full(
        &self,
        text: Option<&str>,
        image: Option<&DynamicImage>,
    ) -> Result<StageOutcome<FinalizeOutput>> {
        let pipeline = self.clone();
        let text = text.map(str::to_owned);
        let image = image.cloned();

        let task = tokio::spawn(async move {
            pipeline.run_stages(text.as_deref(), image.as_ref()).await
        });

        task.await.map_err(|e| {
            error!("Pipeline aborted: {}", e);
            TallyError::Internal(if e.is_panic() {
                "stage panicked".to_string()
            } else {
                e.to_string()
            })
        })
    }

    async fn run_stages(
        &self,
        text: Option<&str>,
        image: Option<&DynamicImage>,
    ) -> StageOutcome<FinalizeOutput> {
        let mut state = advance(self.extract(text, image).await, PipelineState::Extracted);

        loop {
            debug!("Pipeline state: {}", state.name());
            state = match state {
                PipelineState::Extracted(extracted) => {
                    let outcome = self.normalize(&extracted.raw_tokens);
                    advance(outcome, |normalized| PipelineState::Normalized {
                        extracted,
                        normalized,
                    })
                }
                PipelineState::Normalized {
                    extracted,
                    normalized,
                } => {
                    let outcome = self
                        .classify(
                            &normalized.normalized_amounts,
                            &extracted.raw_text,
                            &extracted.raw_tokens,
                        )
                        .await;
                    advance(outcome, |classified| PipelineState::Classified {
                        extracted,
                        classified,
                    })
                }
                PipelineState::Classified {
                    extracted,
                    classified,
                } => {
                    let outcome = self.finalize(
                        &classified.amounts,
                        extracted.currency_hint,
                        &extracted.raw_text,
                    );
                    advance(outcome, PipelineState::Finalized)
                }
                PipelineState::Finalized(output) => return StageOutcome::Completed(output),
                PipelineState::Failed(guardrail) => {
                    info!("Pipeline halted: {}", guardrail.reason);
                    return StageOutcome::Halted(guardrail);
                }
            };
        }
    }
}

impl std::fmt::Debug for AmountPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmountPipeline")
            .field("classifier", &self.classifier)
            .field("recognizer", &self.recognizer.as_ref().map(|r| r.name().to_string()))
            .finish()
    }
}
