//! Explicit "Label: amount" extraction used when classification finds no
//! required role.

use regex::Regex;

use super::patterns::{EXPLICIT_DUE, EXPLICIT_PAID, EXPLICIT_TOTAL};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::RequiredRole;

/// An amount found next to an explicit role label.
#[derive(Debug, Clone)]
pub struct ExplicitAmount {
    pub role: RequiredRole,
    pub found: ExtractionMatch<f64>,
}

impl ExplicitAmount {
    pub fn value(&self) -> f64 {
        self.found.value
    }
}

/// Extractor for explicitly labeled total, paid and due amounts.
pub struct ExplicitLabelExtractor;

impl ExplicitLabelExtractor {
    pub fn new() -> Self {
        Self
    }

    fn patterns() -> [(RequiredRole, &'static Regex); 3] {
        [
            (RequiredRole::TotalBill, &*EXPLICIT_TOTAL),
            (RequiredRole::Paid, &*EXPLICIT_PAID),
            (RequiredRole::Due, &*EXPLICIT_DUE),
        ]
    }

    /// First parseable match of one role's pattern.
    fn first_match(role: RequiredRole, pattern: &Regex, text: &str) -> Option<ExplicitAmount> {
        pattern.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            let value: f64 = caps.get(3)?.as_str().replace(',', "").parse().ok()?;
            if !value.is_finite() {
                return None;
            }
            Some(ExplicitAmount {
                role,
                found: ExtractionMatch::new(value, whole.as_str())
                    .with_position(whole.start(), whole.end()),
            })
        })
    }
}

impl Default for ExplicitLabelExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ExplicitLabelExtractor {
    type Output = ExplicitAmount;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// At most one amount per role, in total, paid, due order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        if text.is_empty() {
            return Vec::new();
        }

        Self::patterns()
            .into_iter()
            .filter_map(|(role, pattern)| Self::first_match(role, pattern, text))
            .collect()
    }
}

/// Extract explicitly labeled amounts from text.
pub fn extract_explicit_amounts(text: &str) -> Vec<ExplicitAmount> {
    ExplicitLabelExtractor::new().extract_all(text)
}
