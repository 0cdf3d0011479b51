use crate::patterns;
use crate::vocab;
use curator_protocol::{ConceptToken, TokenId, TokenOrigin, TokenType};
use serde::{Deserialize, Serialize};

/// A span the extractor could not classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub span: String,
    pub message: String,
}

/// Best-effort parse of a raw title. Extraction never fails.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub tokens: Vec<ConceptToken>,
    pub warnings: Vec<ParseWarning>,
}

impl Extraction {
    /// Next free token id after extraction.
    #[must_use]
    pub fn next_id(&self) -> u32 {
        self.tokens.iter().map(|t| t.id.0 + 1).max().unwrap_or(1)
    }
}

/// Parse a raw listing title into typed concept tokens.
pub fn extract(raw_title: &str) -> Extraction {
    let mut extraction = Extraction::default();
    let mut next_id = 1u32;

    for (index, segment) in split_segments(raw_title).into_iter().enumerate() {
        tokenize_segment(&segment, index == 0, &mut next_id, &mut extraction);
    }

    log::debug!(
        "extracted {} tokens ({} warnings) from title of {} chars",
        extraction.tokens.len(),
        extraction.warnings.len(),
        raw_title.len()
    );
    extraction
}

/// Split on `|`, `;`, `,` and ` - ` outside parentheses.
fn split_segments(title: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let chars: Vec<char> = title.chars().collect();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '|' | ';' | ',' if depth == 0 => {
                segments.push(std::mem::take(&mut current));
            }
            '-' if depth == 0
                && i > 0
                && chars[i - 1] == ' '
                && chars.get(i + 1) == Some(&' ') =>
            {
                segments.push(std::mem::take(&mut current));
                i += 1; // skip the trailing space
            }
            _ => current.push(c),
        }
        i += 1;
    }
    segments.push(current);

    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn tokenize_segment(segment: &str, first: bool, next_id: &mut u32, out: &mut Extraction) {
    let mut rest = segment.to_string();

    // Numeric spans first; the count pattern may swallow a parenthetical
    // breakdown that must stay inside the same token.
    for (pattern, token_type) in [
        (&patterns::COUNT, TokenType::Count),
        (&patterns::DIMENSION, TokenType::Dimension),
        (&patterns::CAPACITY, TokenType::Capacity),
    ] {
        while let Some((range, surface)) = pattern
            .find(&rest)
            .map(|m| (m.range(), m.as_str().trim().to_string()))
        {
            push_token(out, next_id, surface, token_type, false);
            rest.replace_range(range, " ");
        }
    }

    // Parenthetical groups become single tokens.
    while let Some((range, inner)) = patterns::PARENTHETICAL
        .captures(&rest)
        .map(|caps| {
            let whole = caps.get(0).expect("match");
            let inner = caps.get(1).expect("group").as_str().trim().to_string();
            (whole.range(), inner)
        })
    {
        if !inner.is_empty() {
            let token_type = classify_parenthetical(&inner);
            push_token(out, next_id, inner, token_type, false);
        }
        rest.replace_range(range, " ");
    }

    let rest = collapse_ws(&rest);
    if rest.is_empty() {
        return;
    }

    // A whole remaining span that is a known attribute value.
    if let Some((token_type, _)) = vocab::attribute_value(&rest) {
        push_token(out, next_id, rest, token_type, false);
        return;
    }

    let mut rest = rest;

    // Compatibility phrases.
    if let Some((range, surface)) = patterns::FOR_PHRASE
        .find(&rest)
        .map(|m| (m.range(), m.as_str().trim().to_string()))
    {
        push_token(out, next_id, surface, TokenType::UseCase, false);
        rest.replace_range(range, " ");
        rest = collapse_ws(&rest);
    }

    // Known product compounds, longest first, repeated. Byte offsets come
    // from the lowercased copy; `get` guards non-ASCII case folds that
    // shift byte boundaries.
    loop {
        let folded = rest.to_lowercase();
        let Some((start, end)) = vocab::find_compound(&folded) else {
            break;
        };
        let Some(surface) = rest.get(start..end).map(str::to_string) else {
            break;
        };
        push_token(out, next_id, surface, TokenType::Product, false);
        rest.replace_range(start..end, " ");
        rest = collapse_ws(&rest);
    }

    classify_leftover_words(&rest, first, next_id, out);
}

/// Word-by-word classification of whatever is left in a segment. Runs of
/// unknown words collapse into one span: a leading run of the first segment
/// is taken as the brand, everything else becomes OTHER.
fn classify_leftover_words(rest: &str, first: bool, next_id: &mut u32, out: &mut Extraction) {
    let mut unknown_run: Vec<&str> = Vec::new();
    let mut at_segment_start = true;

    let mut flush =
        |run: &mut Vec<&str>, at_start: bool, next_id: &mut u32, out: &mut Extraction| {
            if run.is_empty() {
                return;
            }
            let has_brand = out
                .tokens
                .iter()
                .any(|t| t.token_type == TokenType::Brand);
            if first && at_start && !has_brand {
                // A leading unknown run opens the title; its first words are
                // the brand. Brands run one or two words, not a whole span.
                let brand_words = run.len().min(2);
                let brand = run[..brand_words].join(" ");
                push_token(out, next_id, brand, TokenType::Brand, false);
                run.drain(..brand_words);
            }
            if !run.is_empty() {
                let span = run.join(" ");
                out.warnings.push(ParseWarning {
                    span: span.clone(),
                    message: "unclassified span".to_string(),
                });
                push_token(out, next_id, span, TokenType::Other, true);
            }
            run.clear();
        };

    for word in rest.split(|c: char| c.is_whitespace() || c == '/') {
        let cleaned = word.trim_matches(|c: char| !c.is_alphanumeric());
        if cleaned.is_empty() {
            continue;
        }
        if let Some((token_type, _)) = vocab::attribute_value(cleaned) {
            flush(&mut unknown_run, at_segment_start, next_id, out);
            at_segment_start = false;
            let duplicate = out.tokens.iter().any(|t| {
                t.token_type == token_type && t.canonical_value == cleaned.to_lowercase()
            });
            if !duplicate {
                push_token(out, next_id, cleaned.to_string(), token_type, false);
            }
        } else {
            unknown_run.push(cleaned);
        }
    }
    flush(&mut unknown_run, at_segment_start, next_id, out);
}

fn classify_parenthetical(inner: &str) -> TokenType {
    if let Some((token_type, _)) = vocab::attribute_value(inner) {
        return token_type;
    }
    for word in inner.split_whitespace() {
        if let Some(token_type) = vocab::attribute_of_word(word) {
            return token_type;
        }
    }
    if patterns::FOR_PHRASE.is_match(inner) {
        return TokenType::UseCase;
    }
    TokenType::Feature
}

fn push_token(
    out: &mut Extraction,
    next_id: &mut u32,
    surface: String,
    token_type: TokenType,
    unparsed: bool,
) {
    let token = ConceptToken::new(TokenId(*next_id), surface, token_type, TokenOrigin::BaseTitle)
        .tier(default_tier(token_type))
        .value_score(default_score(token_type))
        .unparsed(unparsed);
    *next_id += 1;
    out.tokens.push(token);
}

const fn default_tier(token_type: TokenType) -> u8 {
    match token_type {
        TokenType::Brand
        | TokenType::Product
        | TokenType::Size
        | TokenType::Color
        | TokenType::Count
        | TokenType::Dimension
        | TokenType::Capacity => 1,
        TokenType::Fragrance | TokenType::Material | TokenType::Feature | TokenType::UseCase => 2,
        TokenType::QualityMarker | TokenType::Other => 3,
    }
}

const fn default_score(token_type: TokenType) -> f32 {
    match token_type {
        TokenType::Product => 1.0,
        TokenType::Brand => 0.9,
        TokenType::Count | TokenType::Dimension => 0.85,
        TokenType::Size | TokenType::Color => 0.8,
        TokenType::Capacity => 0.7,
        TokenType::Fragrance => 0.55,
        TokenType::Material => 0.5,
        TokenType::Feature | TokenType::UseCase => 0.45,
        TokenType::QualityMarker => 0.4,
        TokenType::Other => 0.2,
    }
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TITLE: &str = "Shalimar Premium (Lavender Fragrance) Scented Garbage Bags | Medium 19 X 21 Inches | 120 Bags (30 Bags X 4 Rolls) | Dustbin Bag/Trash Bag | (Black) - Perforated Box for Easy Dispensing";

    fn surfaces_of(extraction: &Extraction, token_type: TokenType) -> Vec<String> {
        extraction
            .tokens
            .iter()
            .filter(|t| t.token_type == token_type)
            .map(|t| t.surface_text.clone())
            .collect()
    }

    #[test]
    fn splits_segments_outside_parens() {
        let segments = split_segments(TITLE);
        assert_eq!(segments.len(), 6);
        assert_eq!(segments[1], "Medium 19 X 21 Inches");
        assert_eq!(segments[2], "120 Bags (30 Bags X 4 Rolls)");
        assert_eq!(segments[4], "(Black)");
    }

    #[test]
    fn extracts_typed_tokens_from_real_title() {
        let extraction = extract(TITLE);

        assert_eq!(surfaces_of(&extraction, TokenType::Brand), vec!["Shalimar"]);
        assert_eq!(
            surfaces_of(&extraction, TokenType::Count),
            vec!["120 Bags (30 Bags X 4 Rolls)"]
        );
        assert_eq!(
            surfaces_of(&extraction, TokenType::Dimension),
            vec!["19 X 21 Inches"]
        );
        assert_eq!(surfaces_of(&extraction, TokenType::Size), vec!["Medium"]);
        assert_eq!(surfaces_of(&extraction, TokenType::Color), vec!["Black"]);
        assert!(surfaces_of(&extraction, TokenType::Product)
            .contains(&"Garbage Bags".to_string()));
    }

    #[test]
    fn parenthetical_fragrance_is_one_token() {
        let extraction = extract(TITLE);
        let fragrances = surfaces_of(&extraction, TokenType::Fragrance);
        assert!(fragrances.contains(&"Lavender Fragrance".to_string()));
    }

    #[test]
    fn unknown_spans_become_other_with_warning() {
        let extraction = extract("Frobnicator Deluxe Widget Thing | Blue");
        let others = surfaces_of(&extraction, TokenType::Other);
        assert!(!others.is_empty());
        assert!(!extraction.warnings.is_empty());
        assert!(extraction
            .tokens
            .iter()
            .filter(|t| t.token_type == TokenType::Other)
            .all(|t| t.unparsed && t.tier == 3));
    }

    #[test]
    fn leading_unknown_run_is_the_brand() {
        let extraction = extract("Acme Trash Bags Large");
        assert_eq!(surfaces_of(&extraction, TokenType::Brand), vec!["Acme"]);
        assert_eq!(
            surfaces_of(&extraction, TokenType::Product),
            vec!["Trash Bags"]
        );
        assert_eq!(surfaces_of(&extraction, TokenType::Size), vec!["Large"]);
    }

    #[test]
    fn empty_title_yields_no_tokens() {
        let extraction = extract("");
        assert!(extraction.tokens.is_empty());
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn use_case_phrase_detected() {
        let extraction = extract("Acme Bin Liners for Kitchen Use");
        let use_cases = surfaces_of(&extraction, TokenType::UseCase);
        assert_eq!(use_cases, vec!["for Kitchen Use"]);
    }
}
