//! Skill matching: vocabulary containment, coverage and gap sets.
//!
//! All comparisons are case-insensitive. Results are `BTreeSet`s so their
//! order (and JSON output) is stable regardless of input order.

use std::collections::BTreeSet;

/// Parses a user-editable comma-separated skill list: trims and lower-cases
/// each entry, drops empty ones, keeps the first occurrence of duplicates.
pub fn parse_skill_list(raw: &str) -> Vec<String> {
    normalize_vocabulary(raw.split(','))
}

/// Same cleanup as `parse_skill_list` for a list that is already split.
pub fn normalize_vocabulary<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for term in terms {
        let term = term.as_ref().trim().to_lowercase();
        if term.is_empty() || !seen.insert(term.clone()) {
            continue;
        }
        out.push(term);
    }
    out
}

/// Returns the vocabulary terms contained (as substrings) in `text`,
/// lower-cased and deduplicated. Empty terms never match.
pub fn match_skills(text: &str, vocabulary: &[String]) -> BTreeSet<String> {
    let text_lower = text.to_lowercase();
    vocabulary
        .iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty() && text_lower.contains(term.as_str()))
        .collect()
}

/// Fraction of `required` present in `found`. An empty `required` list is
/// vacuously fully covered.
pub fn coverage<S: AsRef<str>>(required: &[S], found: &BTreeSet<String>) -> f64 {
    let required = lowered(required.iter().map(AsRef::as_ref));
    if required.is_empty() {
        return 1.0;
    }
    let found = lowered(found.iter().map(String::as_str));
    let overlap = required.intersection(&found).count();
    overlap as f64 / required.len() as f64
}

/// `required − found`, lower-cased.
pub fn missing<S: AsRef<str>>(required: &[S], found: &BTreeSet<String>) -> BTreeSet<String> {
    let found = lowered(found.iter().map(String::as_str));
    lowered(required.iter().map(AsRef::as_ref))
        .into_iter()
        .filter(|term| !found.contains(term))
        .collect()
}

fn lowered<'a>(terms: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    terms.map(str::to_lowercase).collect()
}
