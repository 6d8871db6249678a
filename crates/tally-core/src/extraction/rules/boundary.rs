//! Boundary-safe token search and character windows around a match.

/// Find `needle` in `haystack` where neither neighbouring character is an
/// ASCII digit, so "23" is not found inside "1234".
///
/// Returns the byte offset of the first acceptable occurrence.
pub fn find_number_token(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }

    let mut from = 0;
    while from <= haystack.len() {
        let idx = from + haystack[from..].find(needle)?;
        let end = idx + needle.len();

        let prev_is_digit = haystack[..idx]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit());
        let next_is_digit = haystack[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());

        if !prev_is_digit && !next_is_digit {
            return Some(idx);
        }

        // Advance by one character so overlapping occurrences are still tried
        from = idx + haystack[idx..].chars().next().map_or(1, char::len_utf8);
    }

    None
}

/// Byte offset `count` characters before `idx`, clamped to the start.
fn step_back(text: &str, idx: usize, count: usize) -> usize {
    if count == 0 {
        return idx;
    }
    text[..idx]
        .char_indices()
        .rev()
        .nth(count - 1)
        .map_or(0, |(i, _)| i)
}

/// Byte offset `count` characters after `idx`, clamped to the end.
fn step_forward(text: &str, idx: usize, count: usize) -> usize {
    text[idx..]
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(i, _)| idx + i)
}

/// Up to `chars` characters immediately before byte offset `idx`.
pub fn window_before(text: &str, idx: usize, chars: usize) -> &str {
    &text[step_back(text, idx, chars)..idx]
}

/// The match at `idx..idx + len` padded with up to `chars` characters on
/// each side.
pub fn window_around(text: &str, idx: usize, len: usize, chars: usize) -> &str {
    let start = step_back(text, idx, chars);
    let end = step_forward(text, idx + len, chars);
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rejects_digit_adjacent_matches() {
        assert_eq!(find_number_token("Invoice 1234 issued", "23"), None);
        assert_eq!(find_number_token("Due: 23 only", "23"), Some(5));
    }

    #[test]
    fn test_skips_to_later_clean_occurrence() {
        let text = "ref 1500, total 500";
        assert_eq!(find_number_token(text, "500"), Some(16));
    }

    #[test]
    fn test_match_at_text_edges() {
        assert_eq!(find_number_token("500", "500"), Some(0));
        assert_eq!(find_number_token("", "5"), None);
        assert_eq!(find_number_token("abc", ""), None);
    }

    #[test]
    fn test_multibyte_neighbours() {
        let text = "₹500 and ₹₹50";
        assert_eq!(find_number_token(text, "500"), Some(3));
        assert_eq!(find_number_token(text, "50"), Some(text.len() - 2));
    }

    #[test]
    fn test_windows() {
        let text = "Paid: ₹ 1,000 thanks";
        let idx = text.find("1,000").unwrap();
        assert_eq!(window_before(text, idx, 4), ": ₹ ");
        assert_eq!(window_before(text, idx, 100), "Paid: ₹ ");
        assert_eq!(window_around(text, idx, 5, 2), "₹ 1,000 t");
        assert_eq!(window_around(text, idx, 5, 100), text);
    }
}
