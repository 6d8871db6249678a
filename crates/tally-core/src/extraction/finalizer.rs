//! Final deduplication by role and provenance rendering.

use regex::RegexBuilder;
use tracing::{debug, info};

use super::rules::extract_explicit_amounts;
use crate::models::stage::{FinalStatus, FinalizeOutput, StageOutcome};
use crate::models::{format_value, ClassifiedAmount, CurrencyHint, FinalAmount, RequiredRole};

/// Reduces classified amounts to at most one amount per required role.
#[derive(Debug, Clone)]
pub struct Finalizer {
    explicit_fallback: bool,
}

impl Finalizer {
    pub fn new() -> Self {
        Self {
            explicit_fallback: true,
        }
    }

    /// Set whether the explicit-label scan runs when no required role
    /// survives filtering.
    pub fn with_explicit_fallback(mut self, enabled: bool) -> Self {
        self.explicit_fallback = enabled;
        self
    }

    /// Keep the first amount per required role, in input order, and attach
    /// a provenance string to each.
    pub fn finalize(
        &self,
        amounts: &[ClassifiedAmount],
        currency: CurrencyHint,
        raw_text: &str,
    ) -> StageOutcome<FinalizeOutput> {
        let mut finals = first_per_role(
            amounts
                .iter()
                .filter_map(|a| a.amount_type.required_role().map(|role| (role, a.value))),
            currency,
            raw_text,
        );

        if finals.is_empty() && self.explicit_fallback {
            let explicit = extract_explicit_amounts(raw_text);
            if !explicit.is_empty() {
                info!("No required role classified, using {} explicit labels", explicit.len());
            }
            finals = first_per_role(
                explicit.iter().map(|e| (e.role, e.value())),
                currency,
                raw_text,
            );
        }

        if finals.is_empty() {
            return StageOutcome::halted("no required labels detected");
        }

        debug!("Finalized {} amounts", finals.len());
        StageOutcome::Completed(FinalizeOutput {
            currency,
            amounts: finals,
            status: FinalStatus::Ok,
        })
    }
}

impl Default for Finalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn first_per_role(
    candidates: impl Iterator<Item = (RequiredRole, f64)>,
    currency: CurrencyHint,
    raw_text: &str,
) -> Vec<FinalAmount> {
    let mut finals: Vec<FinalAmount> = Vec::new();
    for (role, value) in candidates {
        if finals.iter().any(|f| f.role == role) {
            continue;
        }
        finals.push(FinalAmount {
            role,
            value,
            source: build_provenance(role, value, raw_text, currency),
        });
    }
    finals
}

/// Provenance for a final amount.
///
/// Looks for `Label[:] [currency]value` in the raw text (case-insensitive)
/// and quotes it when found; otherwise renders the canonical form. Only
/// totals carry the currency prefix.
pub fn build_provenance(
    role: RequiredRole,
    value: f64,
    raw_text: &str,
    currency: CurrencyHint,
) -> String {
    let label = role.canonical_label();
    let prefix = match role {
        RequiredRole::TotalBill => currency.display_prefix(),
        _ => "",
    };
    let value = format_value(value);

    let pattern = format!(
        r"\b{}\s*:?\s*{}{}\b",
        regex::escape(label),
        regex::escape(prefix),
        regex::escape(&value)
    );

    let authentic = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
        .and_then(|re| re.find(raw_text).map(|m| m.as_str().to_string()));

    match authentic {
        Some(found) => format!("text: '{}'", found.replace('\'', "\\'")),
        None => format!("text: '{}: {}{}'", label, prefix, value),
    }
}
