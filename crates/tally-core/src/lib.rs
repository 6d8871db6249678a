//! Core library for extracting bill amounts from OCR text.
//!
//! This crate provides:
//! - Rule-table tokenization of candidate amounts
//! - Numeric normalization with OCR digit correction
//! - Context-window role classification (total, paid, due, discount, tax)
//! - Finalization with per-role deduplication and provenance
//! - A staged pipeline with guardrail short-circuiting
//! - Collaborator interfaces for OCR and external labeling

pub mod error;
pub mod extraction;
pub mod labels;
pub mod models;
pub mod ocr;

pub use error::{LabelError, OcrError, Result, TallyError};
pub use extraction::{AmountPipeline, ContextClassifier, Finalizer, Normalizer, Tokenizer};
pub use labels::{parse_label_response, LabelMap, LabelService, StaticLabelService};
pub use models::stage::{
    ClassifyOutput, ClassifyRequest, ExtractOutput, ExtractRequest, FinalizeOutput,
    FinalizeRequest, NormalizeOutput, NormalizeRequest,
};
pub use models::{
    AmountType, ClassifiedAmount, CurrencyHint, FinalAmount, Guardrail, RequiredRole,
    StageOutcome, TallyConfig,
};
pub use ocr::{clean_ocr_text, TextRecognizer};

#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
