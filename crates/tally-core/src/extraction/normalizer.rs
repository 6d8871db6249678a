//! Numeric normalization of raw tokens, with OCR digit correction.

use tracing::{debug, info};

use super::confidence::mean_confidence;
use super::rules::ocr_digits::correct_ocr_digits;
use super::rules::patterns::CURRENCY_STRIP;
use crate::models::stage::{NormalizeOutput, StageOutcome};
use crate::models::{AmountKind, NormalizedAmount};

/// Outcome of normalizing a single token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedToken {
    /// Parsed as written.
    Direct(f64),
    /// Parsed only after OCR digit correction.
    Corrected(f64),
    /// A percentage; never treated as an amount.
    Percent(f64),
    /// Nothing numeric could be recovered.
    Unparseable,
}

impl NormalizedToken {
    /// Weight this outcome contributes to the normalization confidence.
    pub fn confidence_weight(&self) -> f64 {
        match self {
            NormalizedToken::Direct(_) => 0.95,
            NormalizedToken::Corrected(_) => 0.75,
            NormalizedToken::Percent(_) => 0.6,
            NormalizedToken::Unparseable => 0.2,
        }
    }

    /// The recovered number, tagged as an amount or a percentage.
    pub fn normalized(&self) -> Option<NormalizedAmount> {
        match self {
            NormalizedToken::Direct(value) | NormalizedToken::Corrected(value) => {
                Some(NormalizedAmount::amount(*value))
            }
            NormalizedToken::Percent(value) => Some(NormalizedAmount::percent(*value)),
            NormalizedToken::Unparseable => None,
        }
    }
}

/// Parse a string made only of ASCII digits and dots.
fn parse_plain_number(s: &str) -> Option<f64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn digits_and_dots(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}

/// Normalize a single token.
pub fn normalize_token(token: &str) -> NormalizedToken {
    if token.contains('%') {
        let digits = digits_and_dots(token);
        // A bare percent sign reads as 0%
        if digits.is_empty() {
            return NormalizedToken::Percent(0.0);
        }
        return match parse_plain_number(&digits) {
            Some(value) => NormalizedToken::Percent(value),
            None => NormalizedToken::Unparseable,
        };
    }

    let stripped: String = CURRENCY_STRIP
        .replace_all(token, "")
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if let Some(value) = parse_plain_number(&stripped) {
        return NormalizedToken::Direct(value);
    }

    let (corrected, _) = correct_ocr_digits(&stripped);
    match parse_plain_number(&digits_and_dots(&corrected)) {
        Some(value) => NormalizedToken::Corrected(value),
        None => NormalizedToken::Unparseable,
    }
}

/// Parse a token as a money amount, with OCR correction when needed.
pub fn parse_amount(token: &str) -> Option<f64> {
    normalize_token(token)
        .normalized()
        .filter(|n| n.kind == AmountKind::Amount)
        .map(|n| n.value)
}

/// Converts raw tokens into numeric amounts.
#[derive(Debug, Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize tokens in order, keeping amounts and scoring every token.
    pub fn normalize(&self, tokens: &[String]) -> StageOutcome<NormalizeOutput> {
        if tokens.is_empty() {
            return StageOutcome::halted("no numeric tokens");
        }

        let mut normalized_amounts = Vec::new();
        let mut percentages = Vec::new();
        let mut weights = Vec::with_capacity(tokens.len());

        for token in tokens {
            let outcome = normalize_token(token);
            weights.push(outcome.confidence_weight());

            match outcome.normalized() {
                Some(NormalizedAmount { value, kind: AmountKind::Amount }) => {
                    normalized_amounts.push(value)
                }
                Some(NormalizedAmount { value, kind: AmountKind::Percent }) => {
                    percentages.push(value)
                }
                None => debug!("Dropping unparseable token {:?}", token),
            }
        }

        if normalized_amounts.is_empty() {
            return StageOutcome::halted("normalized nothing");
        }

        let normalization_confidence = mean_confidence(&weights);
        info!(
            "Normalized {} of {} tokens (confidence {:.2})",
            normalized_amounts.len(),
            tokens.len(),
            normalization_confidence
        );

        StageOutcome::Completed(NormalizeOutput {
            normalized_amounts,
            percentages,
            normalization_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_direct_parse() {
        assert_eq!(normalize_token("Rs. 1,500"), NormalizedToken::Direct(1500.0));
        assert_eq!(normalize_token("$120.50"), NormalizedToken::Direct(120.5));
        assert_eq!(normalize_token("₹ 2,00,000"), NormalizedToken::Direct(200000.0));
        assert_eq!(normalize_token("INR 75"), NormalizedToken::Direct(75.0));
        assert_eq!(normalize_token("120"), NormalizedToken::Direct(120.0));
    }

    #[test]
    fn test_ocr_correction_lowers_confidence() {
        let corrected = normalize_token("l2O");
        let clean = normalize_token("120");
        assert_eq!(corrected, NormalizedToken::Corrected(120.0));
        assert_eq!(corrected.confidence_weight(), 0.75);
        assert_eq!(clean.confidence_weight(), 0.95);
        assert_eq!(normalize_token("Rs. 1,5OO"), NormalizedToken::Corrected(1500.0));
    }

    #[test]
    fn test_percent_and_failures() {
        assert_eq!(normalize_token("18%"), NormalizedToken::Percent(18.0));
        assert_eq!(normalize_token("1.2.3"), NormalizedToken::Unparseable);
        assert_eq!(normalize_token("xyz"), NormalizedToken::Unparseable);
        assert_eq!(normalize_token("--"), NormalizedToken::Unparseable);
    }

    #[test]
    fn test_bare_percent_sign_is_zero_percent() {
        let token = normalize_token("%");
        assert_eq!(token, NormalizedToken::Percent(0.0));
        assert_eq!(token.confidence_weight(), 0.6);
        assert_eq!(token.normalized(), Some(NormalizedAmount::percent(0.0)));
        assert_eq!(parse_amount("%"), None);
    }

    #[test]
    fn test_normalized_tags_kind() {
        assert_eq!(
            normalize_token("l2O").normalized(),
            Some(NormalizedAmount::amount(120.0))
        );
        assert_eq!(
            normalize_token("18%").normalized().map(|n| n.kind),
            Some(AmountKind::Percent)
        );
        assert_eq!(normalize_token("xyz").normalized(), None);
        assert_eq!(parse_amount("18%"), None);
        assert_eq!(parse_amount("$120.50"), Some(120.5));
    }

    #[test]
    fn test_percent_excluded_but_scored() {
        let outcome = Normalizer::new().normalize(&tokens(&["500", "18%"]));
        let output = outcome.output().unwrap();
        assert_eq!(output.normalized_amounts, vec![500.0]);
        assert_eq!(output.percentages, vec![18.0]);
        assert!((output.normalization_confidence - 0.775).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_tokens_lower_confidence() {
        let outcome = Normalizer::new().normalize(&tokens(&["100", "1.2.3"]));
        let output = outcome.output().unwrap();
        assert_eq!(output.normalized_amounts, vec![100.0]);
        assert!((output.normalization_confidence - 0.575).abs() < 1e-9);
    }

    #[test]
    fn test_values_are_not_rounded() {
        let outcome = Normalizer::new().normalize(&tokens(&["0.333"]));
        assert_eq!(outcome.output().unwrap().normalized_amounts, vec![0.333]);
    }

    #[test]
    fn test_guardrails() {
        let empty = Normalizer::new().normalize(&[]);
        assert_eq!(empty.guardrail().unwrap().reason, "no numeric tokens");

        let nothing = Normalizer::new().normalize(&tokens(&["18%", "--", "%"]));
        assert_eq!(nothing.guardrail().unwrap().reason, "normalized nothing");
    }
}
