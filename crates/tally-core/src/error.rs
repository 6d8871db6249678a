//! Error types for the tally-core library.
//!
//! Guardrail outcomes ("no amounts found") are not errors; they travel as
//! [`crate::models::stage::StageOutcome::Halted`]. The types here cover
//! configuration failures and internal faults; collaborator failures use
//! [`OcrError`] and [`LabelError`] and are absorbed by the pipeline.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the tally library.
#[derive(Error, Debug)]
pub enum TallyError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected fault inside a pipeline stage.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised by an OCR collaborator.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Recognition did not finish before the deadline.
    #[error("recognition timed out after {0:?}")]
    Timeout(Duration),

    /// No recognizer is configured for this process.
    #[error("no OCR engine available")]
    Unavailable,
}

/// Errors raised by an external label service.
#[derive(Error, Debug)]
pub enum LabelError {
    /// The service is not configured or refused the request.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The request could not be delivered or answered.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The answer did not contain a usable label list.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The service did not answer before the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for the tally library.
pub type Result<T> = std::result::Result<T, TallyError>;
