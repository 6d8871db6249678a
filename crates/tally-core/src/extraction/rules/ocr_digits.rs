//! Correction table for characters OCR confuses with digits.

/// Visually confusable characters and the digit they stand for.
pub const OCR_DIGIT_TABLE: &[(char, char)] = &[
    ('O', '0'),
    ('o', '0'),
    ('D', '0'),
    ('I', '1'),
    ('l', '1'),
    ('i', '1'),
    ('|', '1'),
    ('Z', '2'),
    ('A', '4'),
    ('a', '4'),
    ('G', '6'),
    ('T', '7'),
    ('t', '7'),
    ('B', '8'),
    ('g', '9'),
    ('Q', '9'),
    ('q', '9'),
    ('S', '5'),
    ('s', '5'),
];

/// The digit a confusable character stands for.
pub fn digit_for(c: char) -> Option<char> {
    OCR_DIGIT_TABLE
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, digit)| *digit)
}

pub fn is_confusable(c: char) -> bool {
    digit_for(c).is_some()
}

/// Replace every confusable character with its digit.
///
/// Returns the corrected text and whether anything changed.
pub fn correct_ocr_digits(token: &str) -> (String, bool) {
    let mut changed = false;
    let corrected = token
        .chars()
        .map(|c| match digit_for(c) {
            Some(digit) => {
                changed = true;
                digit
            }
            None => c,
        })
        .collect();
    (corrected, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_ocr_digits() {
        assert_eq!(correct_ocr_digits("l2O"), ("120".to_string(), true));
        assert_eq!(correct_ocr_digits("S0.B|"), ("50.81".to_string(), true));
        assert_eq!(correct_ocr_digits("120.50"), ("120.50".to_string(), false));
    }

    #[test]
    fn test_lookalike_letters() {
        assert_eq!(digit_for('g'), Some('9'));
        assert_eq!(digit_for('G'), Some('6'));
        assert_eq!(digit_for('x'), None);
        assert!(is_confusable('Z'));
        assert!(!is_confusable('R'));
    }
}
