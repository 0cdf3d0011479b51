//! Compiled patterns for numeric and structural title spans.

use once_cell::sync::Lazy;
use regex::Regex;

/// Dimension spans: `19 X 21 Inches`, `30x40 cm`, `2 x 3 x 4 ft`.
pub static DIMENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d+(?:\.\d+)?\s*(?:x|×)\s*\d+(?:\.\d+)?(?:\s*(?:x|×)\s*\d+(?:\.\d+)?)?\s*(?:inches|inch|cm|mm|meters?|metres?|ft|feet|in)\b",
    )
    .expect("dimension pattern")
});

/// Pack-count spans: `120 Bags (30 Bags X 4 Rolls)`, `6 Pcs`, `Pack of 4`.
pub static COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:pack|set)\s+of\s+\d+|\d+\s*(?:bags?|pcs?|pieces?|rolls?|sheets?|units?|packs?|tablets?|capsules?|count)(?:\s*\(\s*\d+[^)]*\))?)",
    )
    .expect("count pattern")
});

/// Capacity spans: `1.5 L`, `500 ml`, `10 kg`.
pub static CAPACITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:litres?|liters?|l|ml|kg|g|grams?|oz|gallons?)\b")
        .expect("capacity pattern")
});

/// Parenthetical groups, treated as single tokens.
pub static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]*)\)").expect("parenthetical pattern"));

/// `for X` compatibility phrases: `for Easy Dispensing`, `for Kitchen`.
pub static FOR_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfor\s+([a-z][a-z0-9 /&-]{2,40})").expect("for-phrase pattern")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_matches_with_units() {
        let m = DIMENSION.find("Medium 19 X 21 Inches").unwrap();
        assert_eq!(m.as_str(), "19 X 21 Inches");
        assert!(DIMENSION.is_match("30x40 cm"));
        assert!(DIMENSION.is_match("2 x 3 x 4 ft"));
        assert!(!DIMENSION.is_match("19 x garbage"));
    }

    #[test]
    fn count_matches_with_inner_breakdown() {
        let text = "120 Bags (30 Bags X 4 Rolls)";
        let m = COUNT.find(text).unwrap();
        assert_eq!(m.as_str(), text);
        assert!(COUNT.is_match("Pack of 6"));
        assert!(COUNT.is_match("6 Pcs"));
    }

    #[test]
    fn capacity_matches_common_units() {
        assert!(CAPACITY.is_match("1.5 L bottle"));
        assert!(CAPACITY.is_match("500ml"));
        assert!(!CAPACITY.is_match("large size"));
    }

    #[test]
    fn for_phrase_captures_target() {
        let caps = FOR_PHRASE.captures("Perforated Box for Easy Dispensing").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "Easy Dispensing");
    }
}
