//! Keyword Extractor: KeyBERT-style keyphrase ranking.
//!
//! Candidates are the distinct unigrams and bigrams of the stopword-filtered
//! token stream. Each candidate is scored by cosine similarity between its
//! embedding and the embedding of the whole document.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::similarity::similarity;
use crate::embedding::{EmbedError, Embedder};
use crate::text::tokenize_and_remove_stopwords;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyphrase {
    pub phrase: String,
    pub score: f64,
}

/// Distinct unigrams and bigrams in first-occurrence order.
pub fn candidate_phrases(text: &str) -> Vec<String> {
    let tokens = tokenize_and_remove_stopwords(text);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let unigrams = tokens.iter().cloned();
    let bigrams = tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1]));
    for phrase in unigrams.chain(bigrams) {
        if seen.insert(phrase.clone()) {
            out.push(phrase);
        }
    }
    out
}

/// Top `top_n` keyphrases of `text`, best first. `doc_vector` is the pooled
/// embedding of the same text. Ties are broken by phrase so the same text and
/// encoder always give the same list.
pub async fn extract_keyphrases(
    embedder: &Embedder,
    text: &str,
    doc_vector: &[f32],
    top_n: usize,
) -> Result<Vec<Keyphrase>, EmbedError> {
    let candidates = candidate_phrases(text);
    if candidates.is_empty() || top_n == 0 {
        return Ok(Vec::new());
    }

    let candidate_vectors = embedder.embed_batch(&candidates).await?;

    let mut scored: Vec<Keyphrase> = candidates
        .into_iter()
        .zip(candidate_vectors.iter())
        .map(|(phrase, vector)| Keyphrase {
            score: similarity(doc_vector, vector),
            phrase,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.phrase.cmp(&b.phrase))
    });
    let total = scored.len();
    scored.truncate(top_n);

    debug!(candidates = total, kept = scored.len(), "Extracted keyphrases");
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::embedding::{HashingEncoder, Pooling, TextEncoder};

    const JOB: &str = "we are hiring a data scientist with python and sql experience. \
                       machine learning with pytorch is required. aws experience is a plus.";

    struct CountingEncoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextEncoder for CountingEncoder {
        fn name(&self) -> &str {
            "counting"
        }

        fn dimension(&self) -> usize {
            8
        }

        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0; 8]).collect())
        }
    }

    fn embedder() -> Embedder {
        Embedder::new(Arc::new(HashingEncoder::new(256)))
    }

    async fn keyphrases_of(
        embedder: &Embedder,
        text: &str,
        top_n: usize,
        max_chunk_len: usize,
        pooling: Pooling,
    ) -> Vec<Keyphrase> {
        let doc_vector = embedder
            .embed_document(text, max_chunk_len, pooling)
            .await
            .unwrap();
        extract_keyphrases(embedder, text, &doc_vector, top_n)
            .await
            .unwrap()
    }

    #[test]
    fn test_candidate_phrases_are_distinct_unigrams_and_bigrams() {
        let phrases = candidate_phrases("python and sql python developer");
        assert_eq!(
            phrases,
            vec![
                "python",
                "sql",
                "developer",
                "python sql",
                "sql python",
                "python developer",
            ]
        );
    }

    #[test]
    fn test_candidate_phrases_of_empty_text() {
        assert!(candidate_phrases("").is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_skips_encoder() {
        let encoder = Arc::new(CountingEncoder {
            calls: AtomicUsize::new(0),
        });
        let embedder = Embedder::new(encoder.clone());
        let zero = embedder.zero_vector();
        let phrases = extract_keyphrases(&embedder, "", &zero, 20).await.unwrap();
        assert!(phrases.is_empty());
        let stopwords_only = extract_keyphrases(&embedder, "the and of", &zero, 20)
            .await
            .unwrap();
        assert!(stopwords_only.is_empty());
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_candidates_are_encoded_in_one_call() {
        let encoder = Arc::new(CountingEncoder {
            calls: AtomicUsize::new(0),
        });
        let embedder = Embedder::new(encoder.clone());
        let doc_vector = vec![1.0; 8];
        let phrases = extract_keyphrases(&embedder, "python sql developer", &doc_vector, 20)
            .await
            .unwrap();
        assert_eq!(phrases.len(), 5);
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_keyphrases_are_deterministic() {
        let embedder = embedder();
        let a = keyphrases_of(&embedder, JOB, 10, 300, Pooling::Mean).await;
        let b = keyphrases_of(&embedder, JOB, 10, 300, Pooling::Mean).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_keyphrases_respect_top_n_and_are_unique() {
        let embedder = embedder();
        let phrases = keyphrases_of(&embedder, JOB, 5, 300, Pooling::Mean).await;
        assert_eq!(phrases.len(), 5);
        let unique: HashSet<&str> = phrases.iter().map(|k| k.phrase.as_str()).collect();
        assert_eq!(unique.len(), phrases.len());
    }

    #[tokio::test]
    async fn test_keyphrases_are_sorted_by_score_descending() {
        let embedder = embedder();
        let phrases = keyphrases_of(&embedder, JOB, 50, 80, Pooling::Max).await;
        assert!(!phrases.is_empty());
        for pair in phrases.windows(2) {
            assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                assert!(pair[0].phrase < pair[1].phrase);
            }
        }
        assert!(phrases.iter().all(|k| (0.0..=1.0).contains(&k.score)));
    }

    #[tokio::test]
    async fn test_top_n_larger_than_candidates_returns_all() {
        let embedder = embedder();
        let phrases = keyphrases_of(&embedder, "python sql", 20, 300, Pooling::Mean).await;
        let mut names: Vec<&str> = phrases.iter().map(|k| k.phrase.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["python", "python sql", "sql"]);
    }
}
