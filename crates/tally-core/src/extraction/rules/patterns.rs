//! Common regex patterns for bill amount extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Lines worth tokenizing in financial-line mode
    pub static ref FINANCIAL_KEYWORDS: Regex = Regex::new(
        r"(?i)(total|amount|paid|due|balance|subtotal|grand\s*total|discount|invoice|tax|gst|vat)"
    ).unwrap();

    pub static ref CURRENCY_MARKER: Regex = Regex::new(
        r"(?i)₹|\$|€|\bRs\.?\b|\bINR\b"
    ).unwrap();

    // Currency hint markers
    pub static ref INR_MARKER: Regex = Regex::new(
        r"(?i)₹|\bRs\b|\bINR\b"
    ).unwrap();

    pub static ref USD_MARKER: Regex = Regex::new(
        r"(?i)\$|\bUSD\b"
    ).unwrap();

    pub static ref EUR_MARKER: Regex = Regex::new(
        r"(?i)€|\bEUR\b"
    ).unwrap();

    // Removed from a token before parsing
    pub static ref CURRENCY_STRIP: Regex = Regex::new(
        r"(?i)₹|\$|€|Rs\.?|INR\.?"
    ).unwrap();

    // Stray symbols OCR leaves at the start of a line (currency signs survive)
    pub static ref OCR_LINE_NOISE: Regex = Regex::new(
        r"(?m)^[^a-zA-Z0-9₹$€\n]+"
    ).unwrap();

    // Role keyword families, checked in this order
    pub static ref DUE_FAMILY: Regex = Regex::new(
        r"\b(due|balance|outstanding|remaining)\b"
    ).unwrap();

    pub static ref PAID_FAMILY: Regex = Regex::new(
        r"\b(paid|payment|received)\b"
    ).unwrap();

    pub static ref DISCOUNT_FAMILY: Regex = Regex::new(
        r"\b(discount|rebate|offer)\b"
    ).unwrap();

    pub static ref TAX_FAMILY: Regex = Regex::new(
        r"\b(tax|gst|vat)\b"
    ).unwrap();

    pub static ref TOTAL_FAMILY: Regex = Regex::new(
        r"\b(total|amount|bill|subtotal|grand total)\b"
    ).unwrap();

    // Explicit "Label: amount" patterns
    pub static ref EXPLICIT_TOTAL: Regex = Regex::new(
        r"(?i)(total|grand\s*total|amount\s*due)\s*[:\-]?\s*(₹|\$|€|Rs\.?|INR)?\s*([0-9][\d,]*(?:\.[0-9]{1,2})?)"
    ).unwrap();

    pub static ref EXPLICIT_PAID: Regex = Regex::new(
        r"(?i)(paid|payment\s*received)\s*[:\-]?\s*(₹|\$|€|Rs\.?|INR)?\s*([0-9][\d,]*(?:\.[0-9]{1,2})?)"
    ).unwrap();

    pub static ref EXPLICIT_DUE: Regex = Regex::new(
        r"(?i)(due|balance|outstanding|remaining)\s*[:\-]?\s*(₹|\$|€|Rs\.?|INR)?\s*([0-9][\d,]*(?:\.[0-9]{1,2})?)"
    ).unwrap();
}
