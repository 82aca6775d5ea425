use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]+)(?:\.([0-9]+))?$").unwrap());

const BILLION: u64 = 1_000_000_000;
const MILLION: u64 = 1_000_000;

/// First whitespace token that is a year strictly between 1900 and 2100.
pub fn extract_year(text: &str) -> Option<i32> {
    let year = text
        .split_whitespace()
        .filter_map(|word| word.parse::<i32>().ok())
        .find(|y| *y > 1900 && *y < 2100);

    match year {
        Some(y) => debug!(text, year = y, "Extracted year"),
        None => warn!(text, "Failed to extract year"),
    }
    year
}

/// Dollar amount from infobox or table text, e.g. "$2.923 billion[4]".
///
/// Everything before the first `$` and from the first `[` onward is dropped.
/// "million"/"billion" scale the numeral in front of them, which may carry a
/// decimal part. Without a unit the remainder must be a plain integer.
pub fn extract_money(text: &str) -> Option<u64> {
    let mut cleaned = text;
    if let Some(idx) = cleaned.find('$') {
        cleaned = &cleaned[idx..];
    }
    if let Some(idx) = cleaned.find('[') {
        cleaned = &cleaned[..idx];
    }

    let cleaned = cleaned
        .replace(['$', ',', ' ', '\u{a0}'], "")
        .to_lowercase();

    let amount = if let Some(idx) = cleaned.find("billion") {
        scale_amount(&cleaned[..idx], BILLION)
    } else if let Some(idx) = cleaned.find("million") {
        scale_amount(&cleaned[..idx], MILLION)
    } else {
        cleaned.trim().parse::<u64>().ok()
    };

    match amount {
        Some(a) => debug!(text, amount = a, "Extracted money amount"),
        None => warn!(text, cleaned_text = %cleaned, "Failed to extract money amount"),
    }
    amount
}

/// Running time in minutes: first token that is a plain integer.
pub fn extract_running_time(text: &str) -> Option<u32> {
    let minutes = text
        .split_whitespace()
        .find_map(|word| word.parse::<u32>().ok());

    match minutes {
        Some(m) => debug!(text, minutes = m, "Extracted running time"),
        None => warn!(text, "Failed to extract running time"),
    }
    minutes
}

/// `numeral * unit` in integer arithmetic. Fraction digits finer than one
/// dollar are truncated.
fn scale_amount(numeral: &str, unit: u64) -> Option<u64> {
    let caps = AMOUNT_RE.captures(numeral.trim())?;
    let whole: u64 = caps[1].parse().ok()?;
    let mut total = whole.checked_mul(unit)?;

    if let Some(frac) = caps.get(2) {
        let mut place = unit;
        for digit in frac.as_str().bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            total = total.checked_add(u64::from(digit - b'0') * place)?;
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_first_in_range_token() {
        assert_eq!(extract_year("Released 14 March 1999 (age 25)"), Some(1999));
        assert_eq!(extract_year("March 1, 2015"), Some(2015));
    }

    #[test]
    fn year_bounds_are_exclusive() {
        assert_eq!(extract_year("14 25"), None);
        assert_eq!(extract_year("1900 2100"), None);
        assert_eq!(extract_year("1900 1901"), Some(1901));
    }

    #[test]
    fn money_citation_is_ignored() {
        assert_eq!(extract_money("$1.5 billion[a]"), Some(1_500_000_000));
        assert_eq!(extract_money("$1.5 billion[2.7 billion]"), Some(1_500_000_000));
        assert_eq!(extract_money("$700,000,000[1]"), Some(700_000_000));
    }

    #[test]
    fn money_plain_integer() {
        assert_eq!(extract_money("1000000"), Some(1_000_000));
    }

    #[test]
    fn money_units() {
        assert_eq!(extract_money("$650 million"), Some(650_000_000));
        assert_eq!(extract_money("$2 Billion"), Some(2_000_000_000));
        assert_eq!(extract_money("$2.35 billion"), Some(2_350_000_000));
        assert_eq!(extract_money("$2.923 billion[4]"), Some(2_923_000_000));
        assert_eq!(extract_money("US$356.5 million"), Some(356_500_000));
    }

    #[test]
    fn money_text_before_dollar_is_dropped() {
        assert_eq!(extract_money("est. $1,000"), Some(1_000));
    }

    #[test]
    fn money_failures() {
        assert_eq!(extract_money(""), None);
        assert_eq!(extract_money("unknown"), None);
        assert_eq!(extract_money("$1.1–1.2 billion"), None);
        assert_eq!(extract_money("$1,234.56"), None);
    }

    #[test]
    fn money_overflow_is_rejected() {
        assert_eq!(extract_money("$99999999999999 billion"), None);
    }

    #[test]
    fn running_time() {
        assert_eq!(extract_running_time("162 minutes"), Some(162));
        assert_eq!(extract_running_time("unknown"), None);
        assert_eq!(extract_running_time(""), None);
    }
}
