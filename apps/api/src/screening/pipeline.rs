use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::keywords::{extract_keyphrases, Keyphrase};
use super::ranking::rank;
use super::report::{build_report, CandidateFlag, Report};
use super::similarity::similarity;
use super::skills::{coverage, match_skills, missing};
use crate::config::{AnalysisSettings, Config};
use crate::embedding::{EmbedError, Embedder, TextEncoder};
use crate::errors::AnalysisError;
use crate::text::normalize;

/// One submitted text. Immutable once normalized.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    #[allow(dead_code)]
    pub raw_text: String,
    pub normalized_text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let normalized_text = normalize(&raw_text);
        Self {
            id: id.into(),
            raw_text,
            normalized_text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized_text.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Ranked best first.
    pub reports: Vec<Report>,
    pub job_keyphrases: Vec<Keyphrase>,
}

/// Per-candidate scoring inputs gathered before ranking.
struct CandidateScores {
    id: String,
    semantic: f64,
    found: BTreeSet<String>,
    flags: Vec<CandidateFlag>,
}

/// Runs one job description against a batch of resumes.
#[derive(Clone)]
pub struct Screener {
    embedder: Embedder,
    concurrency: usize,
    candidate_timeout: Duration,
}

impl Screener {
    pub fn new(embedder: Embedder, concurrency: usize, candidate_timeout: Duration) -> Self {
        Self {
            embedder,
            concurrency: concurrency.max(1),
            candidate_timeout,
        }
    }

    pub fn from_config(encoder: Arc<dyn TextEncoder>, config: &Config) -> Self {
        Self::new(
            Embedder::new(encoder),
            config.candidate_concurrency,
            config.candidate_timeout,
        )
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Full pipeline: normalize, embed the job, extract its keyphrases, score
    /// every resume, rank, and build reports.
    ///
    /// Input and settings errors are returned before any encoder call. A
    /// failure to embed the job (or its keyphrase candidates) fails the whole
    /// run; a failure on one resume only flags that resume.
    pub async fn run_full_analysis(
        &self,
        job_text: &str,
        resumes: Vec<(String, String)>,
        skill_vocabulary: &[String],
        settings: &AnalysisSettings,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        settings.validate()?;

        let job = Document::new("job_description", job_text);
        if job.is_empty() {
            return Err(AnalysisError::MissingJobDescription);
        }
        if resumes.is_empty() {
            return Err(AnalysisError::EmptyResumeBatch);
        }
        let documents = dedupe_by_name(resumes);

        let started = Instant::now();
        info!(
            resumes = documents.len(),
            skills = skill_vocabulary.len(),
            alpha = settings.alpha,
            pooling = %settings.pooling,
            "Starting analysis"
        );

        let job_vector = self
            .with_timeout(self.embedder.embed_document(
                &job.normalized_text,
                settings.max_chunk_len,
                settings.pooling,
            ))
            .await?;

        let job_keyphrases = self
            .with_timeout(extract_keyphrases(
                &self.embedder,
                &job.normalized_text,
                &job_vector,
                settings.top_n,
            ))
            .await?;
        let required: Vec<&str> = job_keyphrases.iter().map(|k| k.phrase.as_str()).collect();
        debug!(keyphrases = required.len(), "Job description prepared");

        let job_vector = &job_vector;
        let candidates: Vec<CandidateScores> = stream::iter(documents)
            .map(|doc| self.score_candidate(doc, job_vector, skill_vocabulary, settings))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut semantic = HashMap::with_capacity(candidates.len());
        let mut coverage_scores = HashMap::with_capacity(candidates.len());
        let mut details = HashMap::with_capacity(candidates.len());
        for candidate in candidates {
            semantic.insert(candidate.id.clone(), candidate.semantic);
            coverage_scores.insert(candidate.id.clone(), coverage(&required, &candidate.found));
            details.insert(candidate.id, (candidate.found, candidate.flags));
        }

        let reports: Vec<Report> = rank(&semantic, &coverage_scores, settings.alpha)
            .into_iter()
            .map(|record| {
                let (found, flags) = details.remove(&record.candidate_id).unwrap_or_default();
                let gaps = missing(&required, &found);
                let mut report = build_report(
                    &record.candidate_id,
                    record.final_score,
                    record.semantic_score,
                    record.coverage_score,
                    found,
                    gaps,
                );
                for flag in flags {
                    report.flag(flag);
                }
                report
            })
            .collect();

        info!(
            resumes = reports.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisOutcome {
            reports,
            job_keyphrases,
        })
    }

    async fn score_candidate(
        &self,
        doc: Document,
        job_vector: &[f32],
        skill_vocabulary: &[String],
        settings: &AnalysisSettings,
    ) -> CandidateScores {
        let mut flags = Vec::new();
        if doc.is_empty() {
            warn!(candidate = %doc.id, "Resume has no usable text");
            flags.push(CandidateFlag::EmptyText);
        }

        let embedded = self
            .with_timeout(self.embedder.embed_document(
                &doc.normalized_text,
                settings.max_chunk_len,
                settings.pooling,
            ))
            .await;
        let semantic = match embedded {
            Ok(vector) => similarity(job_vector, &vector),
            Err(e) => {
                warn!(candidate = %doc.id, "Resume embedding failed: {e}");
                flags.push(CandidateFlag::EmbeddingFailed);
                0.0
            }
        };

        let found = match_skills(&doc.normalized_text, skill_vocabulary);
        debug!(candidate = %doc.id, semantic, found = found.len(), "Scored resume");

        CandidateScores {
            id: doc.id,
            semantic,
            found,
            flags,
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, EmbedError>>,
    ) -> Result<T, EmbedError> {
        match tokio::time::timeout(self.candidate_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(EmbedError::Timeout(self.candidate_timeout)),
        }
    }
}

/// Builds documents keyed by name. A repeated name replaces the earlier
/// entry in place.
fn dedupe_by_name(resumes: Vec<(String, String)>) -> Vec<Document> {
    let mut documents: Vec<Document> = Vec::with_capacity(resumes.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (name, text) in resumes {
        let doc = Document::new(name, text);
        match positions.get(&doc.id) {
            Some(&index) => {
                warn!(candidate = %doc.id, "Duplicate resume name, keeping the last one");
                documents[index] = doc;
            }
            None => {
                positions.insert(doc.id.clone(), documents.len());
                documents.push(doc);
            }
        }
    }
    documents
}
