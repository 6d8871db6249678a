//! Declarative token rule tables.
//!
//! Each table is an ordered list of pattern → token-kind rules. A table is
//! compiled into a single leftmost-first alternation, so earlier rules win
//! when two rules could match at the same position.

use lazy_static::lazy_static;
use regex::{Match, Regex};

use super::ocr_digits::is_confusable;
use crate::models::TokenKind;

/// A single tokenizer rule.
#[derive(Debug, Clone, Copy)]
pub struct TokenRule {
    pub kind: TokenKind,
    pub pattern: &'static str,
}

/// Rules applied inside lines that look financial.
pub const FINANCIAL_LINE_RULES: &[TokenRule] = &[
    TokenRule {
        kind: TokenKind::CurrencySymbol,
        pattern: r"[₹$€]\s*[0-9,]+(?:\.[0-9]{1,2})?",
    },
    TokenRule {
        kind: TokenKind::CurrencyCode,
        pattern: r"\b(?:Rs\.?|INR)\s*[0-9,]+(?:\.[0-9]{1,2})?",
    },
    TokenRule {
        kind: TokenKind::Plain,
        pattern: r"\b[0-9][0-9,]*(?:\.[0-9]{1,2})?%?",
    },
];

/// Rules applied to the whole text when no financial line yields a token.
pub const UNRESTRICTED_RULES: &[TokenRule] = &[
    TokenRule {
        kind: TokenKind::CurrencySymbol,
        pattern: r"[₹$€]\s*[0-9,]+(?:\.[0-9]{1,2})?",
    },
    TokenRule {
        kind: TokenKind::CurrencyCode,
        pattern: r"\b(?:Rs\.?|INR)\s*[0-9,]+(?:\.[0-9]{1,2})?",
    },
    TokenRule {
        kind: TokenKind::OcrSuspect,
        // Trailing O/o/l only before a digit or at the end of a word, so
        // unit suffixes like "lbs" stay outside the token
        pattern: r"[0-9OoDIlZSBTAGQ.,]*[0-9](?:[0-9.,]|[Ool]+[0-9])*(?:[Ool]+\b)?%?",
    },
];

lazy_static! {
    pub static ref FINANCIAL_LINE_RULESET: RuleSet = RuleSet::compile(FINANCIAL_LINE_RULES).unwrap();
    pub static ref UNRESTRICTED_RULESET: RuleSet = RuleSet::compile(UNRESTRICTED_RULES).unwrap();
}

/// A rule table compiled into one alternation.
#[derive(Debug)]
pub struct RuleSet {
    regex: Regex,
    groups: Vec<(String, TokenKind)>,
}

impl RuleSet {
    /// Compile rules into a single regex with one named group per rule.
    pub fn compile(rules: &[TokenRule]) -> Result<Self, regex::Error> {
        let groups: Vec<(String, TokenKind)> = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (format!("rule{}", i), rule.kind))
            .collect();

        let alternation = rules
            .iter()
            .zip(&groups)
            .map(|(rule, (name, _))| format!("(?P<{}>{})", name, rule.pattern))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            regex: Regex::new(&alternation)?,
            groups,
        })
    }

    /// Iterate over matches together with the kind of the rule that won.
    pub fn matches<'t>(&'t self, text: &'t str) -> impl Iterator<Item = (TokenKind, Match<'t>)> + 't {
        self.regex.captures_iter(text).filter_map(move |caps| {
            self.groups
                .iter()
                .find_map(|(name, kind)| caps.name(name).map(|m| (*kind, m)))
        })
    }
}

/// Characters stripped from the end of every token.
fn is_trailing_noise(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '"' | '\'')
}

fn is_edge_noise(c: char) -> bool {
    c.is_whitespace() || matches!(c, ':' | '"' | '\'')
}

/// Clean a raw match: drop surrounding quotes and colons, characters that
/// cannot start a number, and trailing punctuation.
///
/// Returns `None` when nothing numeric is left.
pub fn clean_token(raw: &str, kind: TokenKind) -> Option<String> {
    let mut token = raw.trim_matches(is_edge_noise);

    if kind == TokenKind::OcrSuspect {
        token = token.trim_start_matches(|c: char| !c.is_ascii_digit() && !is_confusable(c));
    }

    let token = token.trim_end_matches(is_trailing_noise);

    if token.chars().any(|c| c.is_ascii_digit()) {
        Some(token.to_string())
    } else {
        None
    }
}

/// Narrow an `OcrSuspect` match to `Plain` when it holds no letters.
pub fn refine_kind(kind: TokenKind, token: &str) -> TokenKind {
    if kind == TokenKind::OcrSuspect && !token.chars().any(|c| c.is_alphabetic() || c == '|') {
        TokenKind::Plain
    } else {
        kind
    }
}
