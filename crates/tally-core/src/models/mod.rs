//! Data models and configuration.

pub mod amount;
pub mod config;
pub mod stage;

pub use amount::{
    format_value, AmountKind, AmountType, ClassifiedAmount, CurrencyHint, FinalAmount,
    NormalizedAmount, RawToken, RequiredRole, TokenKind,
};
pub use config::TallyConfig;
pub use stage::{Guardrail, GuardrailStatus, StageOutcome};
