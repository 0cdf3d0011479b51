//! Attribute vocabulary shared by extraction, candidate typing, and
//! truth-conflict sanitization.

use curator_protocol::TokenType;

const SIZES: &[&str] = &[
    "small", "medium", "large", "x-large", "xl", "xxl", "xs", "mini", "jumbo", "compact",
];

const COLORS: &[&str] = &[
    "black", "white", "red", "blue", "green", "grey", "gray", "brown", "yellow", "pink",
    "orange", "purple", "silver", "gold", "golden", "beige", "maroon", "navy", "transparent",
    "clear", "multicolor",
];

const MATERIALS: &[&str] = &[
    "plastic",
    "steel",
    "stainless steel",
    "cotton",
    "bamboo",
    "paper",
    "silicone",
    "rubber",
    "glass",
    "ceramic",
    "leather",
    "biodegradable",
    "compostable",
    "oxo-biodegradable",
];

const FRAGRANCES: &[&str] = &[
    "lavender", "rose", "jasmine", "lemon", "citrus", "sandalwood", "vanilla", "ocean", "mint",
    "scented", "unscented", "fragrance",
];

const QUALITY_MARKERS: &[&str] = &[
    "premium",
    "heavy duty",
    "extra strong",
    "durable",
    "leakproof",
    "leak-proof",
    "eco-friendly",
    "reusable",
    "disposable",
    "perforated",
];

/// Multiword product compounds recognized as a single PRODUCT token.
const COMPOUNDS: &[&str] = &[
    "garbage bags",
    "garbage bag",
    "trash bags",
    "trash bag",
    "dustbin bags",
    "dustbin bag",
    "bin liners",
    "bin liner",
    "storage box",
    "storage boxes",
    "lunch box",
    "water bottle",
    "shopping bags",
    "ziplock bags",
];

/// Classify a full phrase as a known attribute value.
#[must_use]
pub fn attribute_value(phrase: &str) -> Option<(TokenType, String)> {
    let folded = phrase.trim().to_lowercase();
    if folded.is_empty() {
        return None;
    }
    for (table, token_type) in [
        (SIZES, TokenType::Size),
        (COLORS, TokenType::Color),
        (MATERIALS, TokenType::Material),
        (FRAGRANCES, TokenType::Fragrance),
        (QUALITY_MARKERS, TokenType::QualityMarker),
    ] {
        if table.contains(&folded.as_str()) {
            return Some((token_type, folded));
        }
    }
    None
}

/// Classify a single word. Used when scanning retrieved keywords for values
/// that conflict with truth.
#[must_use]
pub fn attribute_of_word(word: &str) -> Option<TokenType> {
    let folded = word.trim().to_lowercase();
    if SIZES.contains(&folded.as_str()) {
        Some(TokenType::Size)
    } else if COLORS.contains(&folded.as_str()) {
        Some(TokenType::Color)
    } else if MATERIALS.contains(&folded.as_str()) {
        Some(TokenType::Material)
    } else if FRAGRANCES.contains(&folded.as_str()) {
        Some(TokenType::Fragrance)
    } else {
        None
    }
}

/// Find the first known product compound inside a lowercased segment,
/// longest match first. Returns (byte_start, byte_end) into `folded`.
#[must_use]
pub fn find_compound(folded: &str) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for compound in COMPOUNDS {
        if let Some(start) = folded.find(compound) {
            let end = start + compound.len();
            let longer = best.is_none_or(|(s, e)| (end - start) > (e - s));
            if is_word_boundary(folded, start, end) && longer {
                best = Some((start, end));
            }
        }
    }
    best
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = start == 0
        || text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
    let after_ok = end == text.len()
        || text[end..].chars().next().is_none_or(|c| !c.is_alphanumeric());
    before_ok && after_ok
}
