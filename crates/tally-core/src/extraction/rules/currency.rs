//! Currency hint detection.

use super::patterns::{EUR_MARKER, INR_MARKER, USD_MARKER};
use crate::models::CurrencyHint;

/// Detect the document currency from markers anywhere in the text.
///
/// Rupee markers take precedence over `$`, which takes precedence over `€`.
pub fn detect_currency_hint(text: &str) -> CurrencyHint {
    if INR_MARKER.is_match(text) {
        CurrencyHint::Inr
    } else if USD_MARKER.is_match(text) {
        CurrencyHint::Usd
    } else if EUR_MARKER.is_match(text) {
        CurrencyHint::Eur
    } else {
        CurrencyHint::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_currency_hint() {
        assert_eq!(detect_currency_hint("Total: ₹ 500"), CurrencyHint::Inr);
        assert_eq!(detect_currency_hint("Paid: Rs. 100 ($2)"), CurrencyHint::Inr);
        assert_eq!(detect_currency_hint("Amount INR 900"), CurrencyHint::Inr);
        assert_eq!(detect_currency_hint("Total: $120.50"), CurrencyHint::Usd);
        assert_eq!(detect_currency_hint("Total 40 EUR"), CurrencyHint::Eur);
        assert_eq!(detect_currency_hint("Summe: €40"), CurrencyHint::Eur);
        assert_eq!(detect_currency_hint("Total 40"), CurrencyHint::Unknown);
    }

    #[test]
    fn test_words_containing_rs_are_not_rupees() {
        assert_eq!(detect_currency_hint("Yours truly. Total 40"), CurrencyHint::Unknown);
        assert_eq!(detect_currency_hint("Hers. Total 40"), CurrencyHint::Unknown);
    }
}
