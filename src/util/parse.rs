/// Reads the leading decimal integer of `input`, the way form fields are
/// interpreted: surrounding whitespace is skipped, an optional sign is
/// accepted, and parsing stops at the first non-digit. Returns `None` when no
/// digits are found or the value does not fit in an `i64`.
pub fn leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude: i64 = digits.parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parses a strictly positive integer parameter. Anything else (empty,
/// non-numeric, zero, negative) yields `None` so the parameter stays unset.
pub fn positive_integer(input: &str) -> Option<u32> {
    leading_int(input)
        .filter(|value| *value > 0)
        .and_then(|value| u32::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_digits_are_read() {
        assert_eq!(leading_int("  42"), Some(42));
        assert_eq!(leading_int("12abc"), Some(12));
        assert_eq!(leading_int("-3"), Some(-3));
        assert_eq!(leading_int("abc"), None);
        assert_eq!(leading_int(""), None);
        assert_eq!(leading_int("-"), None);
    }

    #[test]
    fn only_positive_values_are_accepted() {
        assert_eq!(positive_integer("100"), Some(100));
        assert_eq!(positive_integer("0"), None);
        assert_eq!(positive_integer("-5"), None);
        assert_eq!(positive_integer("ten"), None);
        assert_eq!(positive_integer("99999999999"), None);
    }
}
