use curator_extractor::vocab;
use curator_protocol::{RejectReason, TruthAttributes};

/// Result of truth-sanitizing a retrieved keyword before insertion.
#[derive(Debug, Clone, PartialEq)]
pub enum Sanitized {
    /// Safe to insert, possibly with conflicting words stripped.
    Clean(String),
    /// Nothing usable remained.
    Rejected(RejectReason),
}

/// Strip attribute words that conflict with truth from a candidate phrase.
/// A candidate claiming `medium` when truth says `Large` loses the word.
/// For truth-critical types the word is stripped even when it matches: the
/// normalizer's token already carries that signal exactly once. A candidate
/// reduced to nothing is rejected outright.
#[must_use]
pub fn sanitize_candidate(text: &str, truth: &TruthAttributes) -> Sanitized {
    let mut kept: Vec<&str> = Vec::new();
    let mut stripped: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let strip = vocab::attribute_of_word(word).is_some_and(|token_type| {
            truth.get(token_type).is_some_and(|value| {
                token_type.is_truth_critical() || !value.eq_ignore_ascii_case(word)
            })
        });
        if strip {
            stripped.push(word);
        } else {
            kept.push(word);
        }
    }

    if kept.is_empty() {
        return Sanitized::Rejected(RejectReason::EmptyAfterSanitize);
    }

    if !stripped.is_empty() {
        log::debug!(
            "stripped conflicting words {:?} from candidate '{}'",
            stripped,
            text
        );
        return Sanitized::Clean(kept.join(" "));
    }

    Sanitized::Clean(text.to_string())
}
