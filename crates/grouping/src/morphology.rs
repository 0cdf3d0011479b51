//! Morphological folding applied before semantic clustering, so exact
//! synonyms embeddings might miss (plural forms, regional spellings) land in
//! the same group.

/// Regional spelling folds, applied per word.
const REGIONAL: &[(&str, &str)] = &[
    ("colour", "color"),
    ("colours", "colors"),
    ("odour", "odor"),
    ("odours", "odors"),
    ("grey", "gray"),
    ("fibre", "fiber"),
    ("fibres", "fibers"),
    ("litre", "liter"),
    ("litres", "liters"),
    ("metre", "meter"),
    ("metres", "meters"),
    ("flavour", "flavor"),
    ("flavours", "flavors"),
];

/// Fold a phrase to its comparison form: lowercase, regional spelling
/// normalized, plurals stripped.
#[must_use]
pub fn normalize_morphology(text: &str) -> String {
    text.split_whitespace()
        .map(normalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_word(word: &str) -> String {
    let folded = word.to_lowercase();
    let folded = REGIONAL
        .iter()
        .find(|(from, _)| *from == folded)
        .map_or(folded.clone(), |(_, to)| (*to).to_string());
    singularize(&folded)
}

/// Light singularization: enough to merge `bags`/`bag` and `boxes`/`box`
/// without a stemming dependency.
fn singularize(word: &str) -> String {
    if word.len() <= 3 {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{}{}", stem, &suffix[..suffix.len() - 2]);
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
