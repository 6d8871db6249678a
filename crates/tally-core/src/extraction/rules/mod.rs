//! Rule tables and pattern helpers for amount extraction.

pub mod boundary;
pub mod currency;
pub mod explicit;
pub mod keywords;
pub mod ocr_digits;
pub mod patterns;
pub mod tokens;

pub use boundary::{find_number_token, window_around, window_before};
pub use currency::detect_currency_hint;
pub use explicit::{extract_explicit_amounts, ExplicitAmount, ExplicitLabelExtractor};
pub use keywords::match_role;
pub use ocr_digits::{correct_ocr_digits, is_confusable, OCR_DIGIT_TABLE};
pub use tokens::{RuleSet, TokenRule, FINANCIAL_LINE_RULES, UNRESTRICTED_RULES};

/// Trait for rule-based extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the first occurrence from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A matched value with its provenance.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
