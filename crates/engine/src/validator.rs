use curator_protocol::{LockedStatus, LockedSubstring, LockedSubstringCheck};
use once_cell::sync::Lazy;
use regex::Regex;

/// Known text-assembly artifacts and their fixes, applied in order.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    (" ,", ","),
    (" .", "."),
    ("( )", " "),
    ("()", " "),
    (",,", ","),
    (" :", ":"),
];

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[|;]+").expect("separator pattern"));

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Result of the byte-level enforcement passes.
#[derive(Debug, Clone)]
pub struct Enforcement {
    pub title: String,
    pub banned_hits: Vec<String>,
    pub locked_checks: Vec<LockedSubstringCheck>,
}

/// Apply the final guarantees in order: locked-substring exactness, banned
/// term removal, artifact substitutions, separator/whitespace normalization,
/// then a repair pass so no later step broke a locked span.
#[must_use]
pub fn enforce(draft: &str, locked: &[LockedSubstring], banned_terms: &[String]) -> Enforcement {
    let mut title = draft.to_string();
    let mut locked_checks = Vec::with_capacity(locked.len());

    for substring in locked {
        let status = enforce_locked(&mut title, &substring.text);
        locked_checks.push(LockedSubstringCheck {
            text: substring.text.clone(),
            status,
        });
    }

    let banned_hits = strip_banned(&mut title, banned_terms, locked);

    for (from, to) in SUBSTITUTIONS {
        title = title.replace(from, to);
    }

    title = SEPARATOR_RUN.replace_all(&title, " ").into_owned();
    title = WHITESPACE_RUN.replace_all(&title, " ").trim().to_string();
    title = title
        .trim_end_matches([',', '-', ':', ' '])
        .trim_start_matches([',', '-', ':', ' '])
        .to_string();

    // Normalization may only have touched spacing around a locked span, but
    // the guarantee is byte-level: repair anything that drifted.
    for check in &mut locked_checks {
        if count_occurrences(&title, &check.text) != 1 {
            check.status = enforce_locked(&mut title, &check.text);
        }
    }

    log::debug!(
        "enforcement: {} chars, {} banned hits",
        title.len(),
        banned_hits.len()
    );
    Enforcement {
        title,
        banned_hits,
        locked_checks,
    }
}

/// Guarantee exactly one byte-identical occurrence: insert when missing,
/// delete duplicates keeping the first.
fn enforce_locked(title: &mut String, text: &str) -> LockedStatus {
    match count_occurrences(title, text) {
        0 => {
            if !title.is_empty() && !title.ends_with(' ') {
                title.push(' ');
            }
            title.push_str(text);
            LockedStatus::Inserted
        }
        1 => LockedStatus::Intact,
        _ => {
            let first_end = title.find(text).expect("occurrence counted") + text.len();
            let tail = title[first_end..].replace(text, " ");
            title.truncate(first_end);
            title.push_str(&tail);
            LockedStatus::Deduplicated
        }
    }
}

/// Case-insensitive whole-word removal of deny-listed terms. Spans inside a
/// locked substring are left alone; the locked guarantee outranks the
/// deny list.
fn strip_banned(title: &mut String, banned_terms: &[String], locked: &[LockedSubstring]) -> Vec<String> {
    let mut hits = Vec::new();

    for term in banned_terms {
        let Ok(pattern) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))) else {
            continue;
        };

        let mut result = String::with_capacity(title.len());
        let mut cursor = 0;
        let mut hit = false;
        for found in pattern.find_iter(title) {
            if inside_locked(title, found.start(), found.end(), locked) {
                continue;
            }
            result.push_str(&title[cursor..found.start()]);
            result.push(' ');
            cursor = found.end();
            hit = true;
        }
        if hit {
            result.push_str(&title[cursor..]);
            *title = result;
            hits.push(term.clone());
        }
    }

    hits
}

fn inside_locked(title: &str, start: usize, end: usize, locked: &[LockedSubstring]) -> bool {
    locked.iter().any(|substring| {
        let mut offset = 0;
        while let Some(found) = title[offset..].find(&substring.text) {
            let span_start = offset + found;
            let span_end = span_start + substring.text.len();
            if start >= span_start && end <= span_end {
                return true;
            }
            offset = span_end;
        }
        false
    })
}

fn count_occurrences(title: &str, text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut offset = 0;
    while let Some(found) = title[offset..].find(text) {
        count += 1;
        offset += found + text.len();
    }
    count
}
