//! REST handlers. Input is validated here before it reaches the engines.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};
use tracing::{debug, info};

use hackhelper_core::ingest::parse_document;
use hackhelper_core::{ProjectSubmission, Questionnaire};

use crate::error::ApiError;
use crate::server::AppState;

/// Minimum description length accepted by `/api/evaluate`
pub const MIN_DESCRIPTION_WORDS: usize = 100;

/// Fields `/api/generate-ideas` refuses to run without
pub const REQUIRED_QUESTIONNAIRE_FIELDS: [&str; 5] = [
    "skill_level",
    "primary_skill",
    "languages",
    "time_available",
    "primary_goal",
];

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "AI Hackathon Helper API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn evaluate(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(data) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let project = validate_submission(data)?;

    info!("Evaluating project '{}'", project.name);
    let report = state.evaluator.evaluate(&project).await?;
    Ok(Json(report))
}

pub async fn generate_ideas(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(data) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let questionnaire = validate_questionnaire(data)?;

    let batch = state.ideas.generate(&questionnaire).await?;
    Ok(Json(batch))
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let max_bytes = state.max_upload_bytes;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::BadRequest("No file selected".to_string()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;
        if bytes.len() > max_bytes {
            return Err(too_large(max_bytes));
        }

        let text = parse_document(&filename, &bytes)?;
        debug!("Parsed upload {}: {} chars", filename, text.len());
        return Ok(Json(json!({ "text": text })));
    }

    Err(ApiError::BadRequest("No file provided".to_string()))
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "File too large. Max size: {}MB",
        max_bytes / (1024 * 1024)
    ))
}

/// Body-limit failures surface while streaming the multipart body; keep them 413
fn multipart_error(e: MultipartError, max_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

pub async fn github_fetch(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(data) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let url = data
        .get("url")
        .and_then(Value::as_str)
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("GitHub URL is required".to_string()))?;

    let summary = state.github.fetch_repo(url).await?;
    Ok(Json(summary))
}

/// Require a name and a description of at least [`MIN_DESCRIPTION_WORDS`] words
pub fn validate_submission(data: Value) -> Result<ProjectSubmission, ApiError> {
    let non_empty = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };
    if !non_empty("name") || !non_empty("description") {
        return Err(ApiError::BadRequest(
            "Project name and description are required".to_string(),
        ));
    }

    let project: ProjectSubmission =
        serde_json::from_value(data).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if project.description.split_whitespace().count() < MIN_DESCRIPTION_WORDS {
        return Err(ApiError::BadRequest(format!(
            "Description must be at least {} words",
            MIN_DESCRIPTION_WORDS
        )));
    }
    Ok(project)
}

/// Require every field in [`REQUIRED_QUESTIONNAIRE_FIELDS`]
pub fn validate_questionnaire(data: Value) -> Result<Questionnaire, ApiError> {
    if let Some(missing) = REQUIRED_QUESTIONNAIRE_FIELDS
        .iter()
        .find(|field| data.get(**field).is_none())
    {
        return Err(ApiError::BadRequest(format!(
            "Missing required field: {}",
            missing
        )));
    }
    serde_json::from_value(data).map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_validate_submission_requires_fields() {
        let err = validate_submission(json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m.contains("required")));

        let err = validate_submission(json!({"name": "  ", "description": words(200)})).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_validate_submission_word_count() {
        let err = validate_submission(json!({"name": "x", "description": words(99)})).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m.contains("100 words")));

        let project = validate_submission(json!({
            "name": "x",
            "description": words(100),
            "team_size": 4
        }))
        .unwrap();
        assert_eq!(project.team_size, Some(4));
    }

    #[test]
    fn test_validate_questionnaire_names_missing_field() {
        let err = validate_questionnaire(json!({
            "skill_level": "beginner",
            "primary_skill": "frontend",
            "languages": ["JavaScript"],
            "time_available": 24
        }))
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m == "Missing required field: primary_goal"));
    }

    #[test]
    fn test_validate_questionnaire_ok() {
        let q = validate_questionnaire(json!({
            "skill_level": "beginner",
            "primary_skill": "frontend",
            "languages": ["JavaScript"],
            "time_available": 24,
            "primary_goal": "learn",
            "domain_interests": ["EdTech"]
        }))
        .unwrap();
        assert_eq!(q.domain_interests, vec!["EdTech"]);
        assert!(q.frameworks.is_empty());
    }
}
