use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::config::{AnalysisOptions, AnalysisSettings};
use crate::errors::AppError;
use crate::extraction::{candidate_name, extract_document_text};
use crate::screening::keywords::Keyphrase;
use crate::screening::report::{reports_to_csv, Report};
use crate::screening::skills::{normalize_vocabulary, parse_skill_list};
use crate::state::AppState;

/// Skill vocabulary as either `"python, sql"` or `["python", "sql"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillsInput {
    CommaSeparated(String),
    List(Vec<String>),
}

impl SkillsInput {
    pub fn into_vocabulary(self) -> Vec<String> {
        match self {
            SkillsInput::CommaSeparated(raw) => parse_skill_list(&raw),
            SkillsInput::List(items) => normalize_vocabulary(items),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResumeInput {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub job_text: String,
    pub resumes: Vec<ResumeInput>,
    #[serde(default)]
    pub skills: Option<SkillsInput>,
    #[serde(flatten)]
    pub options: AnalysisOptions,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub settings: AnalysisSettings,
    pub job_keyphrases: Vec<String>,
    pub keyphrase_scores: Vec<Keyphrase>,
    pub reports: Vec<Report>,
}

async fn analyze(
    state: &AppState,
    job_text: &str,
    resumes: Vec<(String, String)>,
    skills: Option<Vec<String>>,
    options: &AnalysisOptions,
) -> Result<AnalysisResponse, AppError> {
    let settings = options.resolve(&state.config.analysis)?;
    let vocabulary = skills.unwrap_or_else(|| state.config.default_skills.clone());

    let analysis_id = Uuid::new_v4();
    let outcome = state
        .screener
        .run_full_analysis(job_text, resumes, &vocabulary, &settings)
        .instrument(info_span!("analysis", %analysis_id))
        .await?;

    Ok(AnalysisResponse {
        analysis_id,
        generated_at: Utc::now(),
        settings,
        job_keyphrases: outcome
            .job_keyphrases
            .iter()
            .map(|k| k.phrase.clone())
            .collect(),
        keyphrase_scores: outcome.job_keyphrases,
        reports: outcome.reports,
    })
}

async fn analyze_json(state: &AppState, req: AnalyzeRequest) -> Result<AnalysisResponse, AppError> {
    let resumes = req
        .resumes
        .into_iter()
        .map(|r| (r.name, r.text))
        .collect();
    let skills = req.skills.map(SkillsInput::into_vocabulary);
    analyze(state, &req.job_text, resumes, skills, &req.options).await
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    Ok(Json(analyze_json(&state, req).await?))
}

/// POST /api/v1/analyze/export
pub async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = analyze_json(&state, req).await?;
    let csv = reports_to_csv(&response.reports);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"analysis_results.csv\"",
            ),
        ],
        csv,
    ))
}

/// POST /api/v1/analyze/upload
///
/// Fields: `job_description` and one or more `resumes`, each a file or text,
/// and optional `skills`, `alpha`, `top_n`, `max_chunk_len`, `pooling`.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut job_text = String::new();
    let mut resumes: Vec<(String, String)> = Vec::new();
    let mut skills: Option<Vec<String>> = None;
    let mut options = AnalysisOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))?;

        match name.as_str() {
            "job_description" => {
                job_text = match &file_name {
                    Some(file) => {
                        extract_document_text(file, content_type.as_deref(), bytes.to_vec()).await
                    }
                    None => String::from_utf8_lossy(&bytes).into_owned(),
                };
            }
            "resumes" => {
                let resume = match &file_name {
                    Some(file) => (
                        candidate_name(file),
                        extract_document_text(file, content_type.as_deref(), bytes.to_vec())
                            .await,
                    ),
                    None => (
                        candidate_name(""),
                        String::from_utf8_lossy(&bytes).into_owned(),
                    ),
                };
                resumes.push(resume);
            }
            "skills" => skills = Some(parse_skill_list(&String::from_utf8_lossy(&bytes))),
            "alpha" => options.alpha = Some(parse_field(&name, &bytes)?),
            "top_n" => options.top_n = Some(parse_field(&name, &bytes)?),
            "max_chunk_len" => options.max_chunk_len = Some(parse_field(&name, &bytes)?),
            "pooling" => options.pooling = Some(String::from_utf8_lossy(&bytes).trim().to_string()),
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(Json(
        analyze(&state, &job_text, resumes, skills, &options).await?,
    ))
}

fn parse_field<T: std::str::FromStr>(name: &str, bytes: &[u8]) -> Result<T, AppError> {
    let raw = String::from_utf8_lossy(bytes);
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::Validation(format!("Field '{name}' has invalid value '{raw}'")))
}

/// GET /api/v1/skills/default
pub async fn handle_default_skills(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "skills": state.config.default_skills }))
}
