//! Amount data models shared by every pipeline stage.

use serde::{Deserialize, Serialize};

/// How a raw token was recognised by the tokenizer rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Prefixed by a currency sign (₹, $, €).
    CurrencySymbol,
    /// Prefixed by a currency code (Rs, Rs., INR).
    CurrencyCode,
    /// Digits with optional grouping, decimals or a trailing percent.
    Plain,
    /// Digit run containing letters that OCR commonly confuses with digits.
    OcrSuspect,
}

/// A substring of the source text suspected to encode a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    /// Cleaned token text.
    pub text: String,
    /// Rule that produced the token.
    pub kind: TokenKind,
    /// Byte span of the uncleaned match in the scanned text.
    pub span: (usize, usize),
}

impl RawToken {
    pub fn new(text: impl Into<String>, kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            span: (start, end),
        }
    }
}

/// Whether a normalized number is a money amount or a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountKind {
    Amount,
    Percent,
}

/// A numeric value recovered from a raw token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAmount {
    pub value: f64,
    pub kind: AmountKind,
}

impl NormalizedAmount {
    pub fn amount(value: f64) -> Self {
        Self {
            value,
            kind: AmountKind::Amount,
        }
    }

    pub fn percent(value: f64) -> Self {
        Self {
            value,
            kind: AmountKind::Percent,
        }
    }
}

/// Semantic role assigned to an amount.
///
/// Unrecognised role strings (from an external labeler or a request body)
/// deserialize as [`AmountType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountType {
    TotalBill,
    Paid,
    Due,
    Discount,
    Tax,
    #[serde(other)]
    Unknown,
}

impl AmountType {
    /// Parse a role label, mapping anything unrecognised to `Unknown`.
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "total_bill" => AmountType::TotalBill,
            "paid" => AmountType::Paid,
            "due" => AmountType::Due,
            "discount" => AmountType::Discount,
            "tax" => AmountType::Tax,
            _ => AmountType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AmountType::TotalBill => "total_bill",
            AmountType::Paid => "paid",
            AmountType::Due => "due",
            AmountType::Discount => "discount",
            AmountType::Tax => "tax",
            AmountType::Unknown => "unknown",
        }
    }

    /// Weight this label contributes to the classification confidence.
    pub fn confidence_weight(&self) -> f64 {
        match self {
            AmountType::TotalBill => 0.90,
            AmountType::Paid => 0.88,
            AmountType::Due => 0.86,
            AmountType::Tax => 0.80,
            AmountType::Discount => 0.75,
            AmountType::Unknown => 0.70,
        }
    }

    /// The required role this label maps to, if any.
    pub fn required_role(&self) -> Option<RequiredRole> {
        match self {
            AmountType::TotalBill => Some(RequiredRole::TotalBill),
            AmountType::Paid => Some(RequiredRole::Paid),
            AmountType::Due => Some(RequiredRole::Due),
            _ => None,
        }
    }
}

/// One of the three roles the finalizer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredRole {
    TotalBill,
    Paid,
    Due,
}

impl RequiredRole {
    /// Human-facing label used in provenance strings.
    pub fn canonical_label(&self) -> &'static str {
        match self {
            RequiredRole::TotalBill => "Total",
            RequiredRole::Paid => "Paid",
            RequiredRole::Due => "Due",
        }
    }
}

impl From<RequiredRole> for AmountType {
    fn from(role: RequiredRole) -> Self {
        match role {
            RequiredRole::TotalBill => AmountType::TotalBill,
            RequiredRole::Paid => AmountType::Paid,
            RequiredRole::Due => AmountType::Due,
        }
    }
}

/// An amount labeled by the context classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedAmount {
    #[serde(rename = "type")]
    pub amount_type: AmountType,

    pub value: f64,

    /// Provenance excerpt; kept in-process, omitted from stage output.
    #[serde(default, skip_serializing)]
    pub source: String,
}

impl ClassifiedAmount {
    pub fn new(amount_type: AmountType, value: f64, source: impl Into<String>) -> Self {
        Self {
            amount_type,
            value,
            source: source.into(),
        }
    }
}

/// A canonical, deduplicated amount for one required role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAmount {
    #[serde(rename = "type")]
    pub role: RequiredRole,

    pub value: f64,

    pub source: String,
}

/// Currency detected in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyHint {
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[default]
    #[serde(rename = "UNKNOWN", other)]
    Unknown,
}

impl CurrencyHint {
    pub fn code(&self) -> &'static str {
        match self {
            CurrencyHint::Inr => "INR",
            CurrencyHint::Usd => "USD",
            CurrencyHint::Eur => "EUR",
            CurrencyHint::Unknown => "UNKNOWN",
        }
    }

    /// Prefix placed before a total in provenance strings.
    pub fn display_prefix(&self) -> &'static str {
        match self {
            CurrencyHint::Inr => "INR ",
            CurrencyHint::Usd => "$",
            CurrencyHint::Eur => "€",
            CurrencyHint::Unknown => "",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != CurrencyHint::Unknown
    }
}

/// Render a value the way it is written in provenance strings
/// (`1500` rather than `1500.0`).
pub fn format_value(value: f64) -> String {
    format!("{}", value)
}
