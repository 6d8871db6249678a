//! Candidate numeric token extraction.

use tracing::debug;

use super::rules::patterns::{CURRENCY_MARKER, FINANCIAL_KEYWORDS};
use super::rules::tokens::{clean_token, refine_kind, RuleSet, FINANCIAL_LINE_RULESET, UNRESTRICTED_RULESET};
use super::rules::FieldExtractor;
use crate::models::RawToken;

/// Scans text for substrings that look like amounts.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    /// Use financial-line tokens when any are found.
    prefer_financial_lines: bool,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            prefer_financial_lines: true,
        }
    }

    /// Set whether financial-line mode is tried first.
    pub fn with_financial_lines(mut self, prefer: bool) -> Self {
        self.prefer_financial_lines = prefer;
        self
    }

    /// Extract tokens, preferring financial lines and falling back to the
    /// whole text.
    pub fn extract_tokens(&self, text: &str) -> Vec<RawToken> {
        if self.prefer_financial_lines {
            let tokens = self.financial_line_tokens(text);
            if !tokens.is_empty() {
                debug!("Found {} tokens on financial lines", tokens.len());
                return tokens;
            }
        }

        let tokens = self.unrestricted_tokens(text);
        debug!("Found {} tokens in unrestricted mode", tokens.len());
        tokens
    }

    /// Tokens from lines holding a financial keyword or a currency marker.
    pub fn financial_line_tokens(&self, text: &str) -> Vec<RawToken> {
        let mut tokens = Vec::new();
        let mut offset = 0;

        for raw_line in text.split('\n') {
            let line_start = offset;
            offset += raw_line.len() + 1;

            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            if line.trim().is_empty() {
                continue;
            }
            if !FINANCIAL_KEYWORDS.is_match(line) && !CURRENCY_MARKER.is_match(line) {
                continue;
            }

            tokens.extend(scan(&FINANCIAL_LINE_RULESET, line, line_start));
        }

        tokens
    }

    /// Tokens from anywhere in the text, OCR-confusable letters included.
    pub fn unrestricted_tokens(&self, text: &str) -> Vec<RawToken> {
        // Same byte length, so spans still index into the original text
        let flattened: String = text
            .chars()
            .map(|c| if matches!(c, '\r' | '\n' | '|') { ' ' } else { c })
            .collect();

        scan(&UNRESTRICTED_RULESET, &flattened, 0)
    }
}

fn scan(ruleset: &RuleSet, text: &str, base: usize) -> Vec<RawToken> {
    ruleset
        .matches(text)
        .filter_map(|(kind, m)| {
            let cleaned = clean_token(m.as_str(), kind)?;
            let kind = refine_kind(kind, &cleaned);
            Some(RawToken::new(cleaned, kind, base + m.start(), base + m.end()))
        })
        .collect()
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for Tokenizer {
    type Output = RawToken;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_tokens(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.extract_tokens(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenKind;
    use pretty_assertions::assert_eq;

    fn texts(tokens: &[RawToken]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_financial_lines_only() {
        let text = "ACME Stores\nPhone 98765 43210\nGrand Total: Rs. 1,500\nPaid: Rs. 1,000\nBalance Due: Rs. 500";
        let tokens = Tokenizer::new().extract_tokens(text);
        assert_eq!(texts(&tokens), vec!["Rs. 1,500", "Rs. 1,000", "Rs. 500"]);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::CurrencyCode));
    }

    #[test]
    fn test_spans_point_into_source() {
        let text = "Item\r\nTotal: $120.50\r\n";
        let tokens = Tokenizer::new().extract_tokens(text);
        assert_eq!(tokens.len(), 1);
        let (start, end) = tokens[0].span;
        assert_eq!(&text[start..end], "$120.50");
        assert_eq!(tokens[0].kind, TokenKind::CurrencySymbol);
    }

    #[test]
    fn test_percent_kept_on_financial_lines() {
        let tokens = Tokenizer::new().extract_tokens("Subtotal 500\nGST 18%: 90");
        assert_eq!(texts(&tokens), vec!["500", "18%", "90"]);
    }

    #[test]
    fn test_falls_back_to_unrestricted_mode() {
        let tokens = Tokenizer::new().extract_tokens("Sum l2O\nref S0|7");
        assert_eq!(texts(&tokens), vec!["l2O", "S0", "7"]);
        assert_eq!(tokens[0].kind, TokenKind::OcrSuspect);
    }

    #[test]
    fn test_unrestricted_plain_digits() {
        let tokens = Tokenizer::new().unrestricted_tokens("Thanks. 42 items, 7.");
        assert_eq!(texts(&tokens), vec!["42", "7"]);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Plain));
    }

    #[test]
    fn test_no_tokens() {
        assert!(Tokenizer::new().extract_tokens("hello world").is_empty());
        assert!(Tokenizer::new().extract_tokens("").is_empty());
    }

    #[test]
    fn test_financial_lines_can_be_disabled() {
        let text = "Total: 100\nref 7";
        let tokens = Tokenizer::new().with_financial_lines(false).extract_tokens(text);
        assert_eq!(texts(&tokens), vec!["100", "7"]);
    }
}
