//! Engagement count normalization.
//!
//! The automation driver reports likes/comments/shares the way the app
//! renders them: `"1.2K"`, `"3M"`, `"500"`, sometimes with surrounding text
//! ("View all 1,204 comments"). Counts are normalized to integers before
//! they are stored or passed to the analysis engine.
//!
//! Suffix table: K = 1e3, M = 1e6, B = 1e9. Parsing an already-normalized
//! integer string returns the same integer.

/// Parse an engagement count as rendered by the app into an integer.
///
/// Reads the first number in the string, accepting a decimal fraction,
/// comma thousands separators, and an optional K/M/B suffix directly after
/// the number (case-insensitive, whitespace allowed). Anything without a
/// recognizable number yields 0.
pub fn parse_count(raw: &str) -> u64 {
    let bytes = raw.as_bytes();

    let start = match bytes.iter().position(|b| b.is_ascii_digit()) {
        Some(idx) => idx,
        None => return 0,
    };

    // Consume digits, one decimal point, and commas acting as thousands
    // separators (a comma must be followed by a digit to be part of the
    // number).
    let mut number = String::new();
    let mut seen_dot = false;
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        if b.is_ascii_digit() {
            number.push(b as char);
        } else if b == b'.' && !seen_dot {
            seen_dot = true;
            number.push('.');
        } else if b == b',' && bytes.get(end + 1).is_some_and(|n| n.is_ascii_digit()) {
            // separator, skip
        } else {
            break;
        }
        end += 1;
    }

    let value: f64 = match number.trim_end_matches('.').parse() {
        Ok(v) => v,
        Err(_) => return 0,
    };

    // Optional magnitude suffix directly after the number
    let suffix = raw[end..].trim_start().chars().next();
    let multiplier = match suffix {
        Some('k') | Some('K') => 1_000_f64,
        Some('m') | Some('M') => 1_000_000_f64,
        Some('b') | Some('B') => 1_000_000_000_f64,
        _ => 1_f64,
    };

    (value * multiplier).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_integers_pass_through() {
        assert_eq!(parse_count("500"), 500);
        assert_eq!(parse_count("0"), 0);
        assert_eq!(parse_count("1204"), 1204);
    }

    #[test]
    fn suffixes_scale() {
        assert_eq!(parse_count("1.2K"), 1200);
        assert_eq!(parse_count("3M"), 3_000_000);
        assert_eq!(parse_count("2.5B"), 2_500_000_000);
        assert_eq!(parse_count("7k"), 7_000);
    }

    #[test]
    fn reparse_is_idempotent() {
        for raw in ["1.2K", "3M", "500", "0"] {
            let once = parse_count(raw);
            assert_eq!(parse_count(&once.to_string()), once);
        }
    }

    #[test]
    fn comma_separators_and_surrounding_text() {
        assert_eq!(parse_count("View all 1,204 comments"), 1204);
        assert_eq!(parse_count("Likes: 12"), 12);
        assert_eq!(parse_count("1.5K likes"), 1500);
    }

    #[test]
    fn garbage_yields_zero() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("no numbers here"), 0);
        assert_eq!(parse_count("..."), 0);
    }
}
