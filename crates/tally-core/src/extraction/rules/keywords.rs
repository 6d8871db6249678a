//! Keyword families that decide an amount's role from its context.

use regex::Regex;

use super::patterns::{DISCOUNT_FAMILY, DUE_FAMILY, PAID_FAMILY, TAX_FAMILY, TOTAL_FAMILY};
use crate::models::AmountType;

/// Role families in precedence order; the first family found wins.
pub fn role_families() -> [(AmountType, &'static Regex); 5] {
    [
        (AmountType::Due, &*DUE_FAMILY),
        (AmountType::Paid, &*PAID_FAMILY),
        (AmountType::Discount, &*DISCOUNT_FAMILY),
        (AmountType::Tax, &*TAX_FAMILY),
        (AmountType::TotalBill, &*TOTAL_FAMILY),
    ]
}

/// Match a lowercased context window against the role families.
pub fn match_role(window: &str) -> Option<AmountType> {
    role_families()
        .into_iter()
        .find(|(_, family)| family.is_match(window))
        .map(|(role, _)| role)
}
