//! Stage inputs, outputs and the guardrail result threaded between them.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::amount::{ClassifiedAmount, CurrencyHint, FinalAmount};

/// Status carried by every guardrail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailStatus {
    NoAmountsFound,
}

/// A terminal "could not proceed" result reported by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardrail {
    pub status: GuardrailStatus,
    pub reason: String,
}

impl Guardrail {
    pub fn no_amounts_found(reason: impl Into<String>) -> Self {
        Self {
            status: GuardrailStatus::NoAmountsFound,
            reason: reason.into(),
        }
    }
}

/// Result of a single pipeline stage.
///
/// Serializes as `{"guardrail": false, "output": ...}` or
/// `{"guardrail": true, "status": ..., "reason": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Completed(T),
    Halted(Guardrail),
}

impl<T> StageOutcome<T> {
    pub fn halted(reason: impl Into<String>) -> Self {
        StageOutcome::Halted(Guardrail::no_amounts_found(reason))
    }

    pub fn is_guardrail(&self) -> bool {
        matches!(self, StageOutcome::Halted(_))
    }

    pub fn output(&self) -> Option<&T> {
        match self {
            StageOutcome::Completed(output) => Some(output),
            StageOutcome::Halted(_) => None,
        }
    }

    pub fn guardrail(&self) -> Option<&Guardrail> {
        match self {
            StageOutcome::Completed(_) => None,
            StageOutcome::Halted(guardrail) => Some(guardrail),
        }
    }

    pub fn into_output(self) -> Option<T> {
        match self {
            StageOutcome::Completed(output) => Some(output),
            StageOutcome::Halted(_) => None,
        }
    }
}

impl<T: Serialize> Serialize for StageOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StageOutcome::Completed(output) => {
                let mut state = serializer.serialize_struct("StageOutcome", 2)?;
                state.serialize_field("guardrail", &false)?;
                state.serialize_field("output", output)?;
                state.end()
            }
            StageOutcome::Halted(guardrail) => {
                let mut state = serializer.serialize_struct("StageOutcome", 3)?;
                state.serialize_field("guardrail", &true)?;
                state.serialize_field("status", &guardrail.status)?;
                state.serialize_field("reason", &guardrail.reason)?;
                state.end()
            }
        }
    }
}

/// Output of the extract stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractOutput {
    pub raw_tokens: Vec<String>,
    pub currency_hint: CurrencyHint,
    pub confidence: f64,
    /// Combined document text the tokens were taken from.
    #[serde(skip_serializing)]
    pub raw_text: String,
}

/// Output of the normalize stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeOutput {
    pub normalized_amounts: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub percentages: Vec<f64>,
    pub normalization_confidence: f64,
}

/// Output of the classify stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifyOutput {
    pub amounts: Vec<ClassifiedAmount>,
    pub confidence: f64,
}

/// Whether the finalizer produced a usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Ok,
}

/// Output of the finalize stage and of the fused pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizeOutput {
    pub currency: CurrencyHint,
    pub amounts: Vec<FinalAmount>,
    pub status: FinalStatus,
}

/// Request body for the extract stage. Images are supplied out of band.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractRequest {
    pub text: Option<String>,
}

/// Request body for the normalize stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NormalizeRequest {
    pub raw_tokens: Vec<String>,
}

/// Request body for the classify stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClassifyRequest {
    pub normalized_amounts: Vec<f64>,
    pub raw_text: String,
    pub raw_tokens: Vec<String>,
}

/// Request body for the finalize stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FinalizeRequest {
    pub amounts: Vec<ClassifiedAmount>,
    pub currency: CurrencyHint,
    pub raw_text: String,
}
