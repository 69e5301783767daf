//! Sentence chunker: packs whole sentences into bounded chunks for embedding.
//!
//! Sentence boundaries come from Unicode segmentation (UAX #29), refined with
//! an English period rule. The refinement is needed because normalized text is
//! lower-cased, and UAX #29 never breaks `. ` when the next word is lower-case.

use unicode_segmentation::UnicodeSegmentation;

/// Tokens ending in `.` that do not close a sentence.
const ABBREVIATIONS: &[&str] = &[
    "approx", "dept", "dr", "etc", "inc", "jr", "ltd", "mr", "mrs", "ms", "no", "prof", "sr",
    "st", "vs", "co", "corp", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept",
    "oct", "nov", "dec",
];

/// Splits text into sentences. Each sentence is trimmed and internally
/// single-spaced.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for segment in text.unicode_sentences() {
        split_segment(segment, &mut sentences);
    }
    sentences
}

fn split_segment(segment: &str, out: &mut Vec<String>) {
    let mut current = String::new();
    for word in segment.split_whitespace() {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        if closes_sentence(word) {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}

fn closes_sentence(word: &str) -> bool {
    let word = word.trim_end_matches(|c: char| matches!(c, '"' | '\'' | ')' | ']'));
    if word.ends_with('!') || word.ends_with('?') {
        return true;
    }
    let Some(stem) = word.strip_suffix('.') else {
        return false;
    };
    if stem.is_empty() || stem.ends_with('.') {
        // bare "." or an ellipsis
        return false;
    }
    let lower = stem.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return false;
    }
    // initials and dotted initialisms: "j.", "u.s.", "e.g."
    if lower.split('.').all(|part| part.chars().count() <= 1) {
        return false;
    }
    // list numbering: "1."
    if lower.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    true
}

/// Greedily packs consecutive sentences into chunks of at most `max_len`
/// characters (joining spaces included). A sentence is never split; one longer
/// than `max_len` becomes its own chunk.
pub fn chunk(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();
        if current.is_empty() {
            current = sentence;
            current_len = len;
        } else if current_len + 1 + len <= max_len {
            current.push(' ');
            current.push_str(&sentence);
            current_len += 1 + len;
        } else {
            chunks.push(std::mem::replace(&mut current, sentence));
            current_len = len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences_on_lowercase_text() {
        let sentences =
            split_sentences("we build data pipelines. you will own etl. python is required.");
        assert_eq!(
            sentences,
            vec![
                "we build data pipelines.",
                "you will own etl.",
                "python is required."
            ]
        );
    }

    #[test]
    fn test_split_sentences_respects_abbreviations_and_initials() {
        let sentences = split_sentences(
            "tools e.g. spark etc. are used at acme inc. daily. j. smith leads the u.s. team.",
        );
        assert_eq!(
            sentences,
            vec![
                "tools e.g. spark etc. are used at acme inc. daily.",
                "j. smith leads the u.s. team."
            ]
        );
    }

    #[test]
    fn test_split_sentences_keeps_versions_and_list_numbers() {
        let sentences = split_sentences("1. python 3.11 and node.js experience. 2. docker.");
        assert_eq!(
            sentences,
            vec!["1. python 3.11 and node.js experience.", "2. docker."]
        );
    }

    #[test]
    fn test_split_sentences_on_mixed_case_punctuation() {
        let sentences = split_sentences("Great team! Want to join? Apply now.");
        assert_eq!(sentences, vec!["Great team!", "Want to join?", "Apply now."]);
    }

    #[test]
    fn test_chunk_empty_input_yields_no_chunks() {
        assert!(chunk("", 300).is_empty());
        assert!(chunk("   ", 300).is_empty());
    }

    #[test]
    fn test_chunk_packs_sentences_up_to_max_len() {
        // each sentence is 10 chars: "aaaa bbbb."
        let text = "aaaa bbbb. cccc dddd. eeee ffff. gggg hhhh.";
        let chunks = chunk(text, 21);
        assert_eq!(
            chunks,
            vec!["aaaa bbbb. cccc dddd.", "eeee ffff. gggg hhhh."]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 21));
    }

    #[test]
    fn test_chunk_never_splits_long_sentence() {
        let long = "this sentence is far longer than the tiny limit we set.";
        let text = format!("short one. {long} tail.");
        let chunks = chunk(&text, 12);
        assert_eq!(chunks, vec!["short one.", long, "tail."]);
    }

    #[test]
    fn test_chunk_without_terminal_punctuation_is_one_sentence() {
        let chunks = chunk("python sql aws machine learning", 300);
        assert_eq!(chunks, vec!["python sql aws machine learning"]);
    }

    #[test]
    fn test_chunk_is_deterministic() {
        let text = "one. two. three. four. five. six. seven.";
        assert_eq!(chunk(text, 12), chunk(text, 12));
    }
}
