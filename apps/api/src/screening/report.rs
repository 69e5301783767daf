//! Report Builder: per-candidate result records and the CSV export table.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Degradations that affected a candidate's scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateFlag {
    /// Nothing was left after extraction and normalization.
    EmptyText,
    /// The encoder failed or timed out for this candidate.
    EmbeddingFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub final_score: f64,
    pub semantic_similarity: f64,
    pub keyword_coverage: f64,
    pub found_keywords: BTreeSet<String>,
    pub missing_keywords: BTreeSet<String>,
    #[serde(default)]
    pub flags: Vec<CandidateFlag>,
}

impl Report {
    pub fn flag(&mut self, flag: CandidateFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

pub fn build_report(
    candidate_id: &str,
    final_score: f64,
    semantic: f64,
    coverage: f64,
    found: BTreeSet<String>,
    missing: BTreeSet<String>,
) -> Report {
    Report {
        name: candidate_id.to_string(),
        final_score: round3(final_score),
        semantic_similarity: round3(semantic),
        keyword_coverage: round3(coverage),
        found_keywords: found,
        missing_keywords: missing,
        flags: Vec::new(),
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

const CSV_HEADER: &str = "Resume,Final Score,Semantic Similarity,Keyword Coverage";

/// Renders the ranked export table, one row per report, in the given order.
pub fn reports_to_csv(reports: &[Report]) -> String {
    let mut out = String::with_capacity(64 * (reports.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");
    for report in reports {
        // writing to a String cannot fail
        let _ = write!(
            out,
            "{},{},{},{}\r\n",
            csv_field(&report.name),
            report.final_score,
            report.semantic_similarity,
            report.keyword_coverage
        );
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
