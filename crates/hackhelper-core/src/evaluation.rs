//! Project evaluation: harsh-critic prompt, weighted scoring, readiness ladder

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AiError;
use crate::normalize::extract_json;
use crate::providers::FallbackClient;

/// Value used for any sub-score the model left out
pub const NEUTRAL_SUB_SCORE: f64 = 5.0;
/// Maximum bonus contributed by the wow factor
pub const MAX_WOW_BONUS: f64 = 5.0;

const TECHNICAL_KEYS: [&str; 4] = [
    "code_quality",
    "technical_complexity",
    "tech_stack_modernity",
    "implementation_quality",
];
const INNOVATION_KEYS: [&str; 3] = [
    "originality",
    "creative_problem_solving",
    "feature_innovation",
];
const IMPACT_KEYS: [&str; 4] = [
    "real_world_applicability",
    "market_potential",
    "social_impact",
    "scalability",
];
const EXECUTION_KEYS: [&str; 4] = [
    "completeness",
    "user_experience",
    "presentation_quality",
    "documentation",
];
const WOW_FACTOR_KEY: &str = "wow_factor";

/// A project submitted for evaluation. Name and description are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSubmission {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tech_stack: Option<String>,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub time_available: Option<Value>,
    #[serde(default)]
    pub theme: Option<String>,
}

/// Category averages (0-10) and the overall score (0-100)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub technical: f64,
    pub innovation: f64,
    pub impact: f64,
    pub execution: f64,
    pub overall: f64,
    /// Sub-scores exactly as the model returned them
    pub detailed: Map<String, Value>,
}

/// How close a project is to winning, derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Exceptional,
    WinnerPotential,
    CompetitionReady,
    DemoReady,
    EarlyPrototype,
}

impl Readiness {
    /// Threshold ladder, evaluated from the highest bucket down
    pub fn classify(overall: f64) -> Self {
        if overall >= 90.0 {
            Self::Exceptional
        } else if overall >= 76.0 {
            Self::WinnerPotential
        } else if overall >= 61.0 {
            Self::CompetitionReady
        } else if overall >= 41.0 {
            Self::DemoReady
        } else {
            Self::EarlyPrototype
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exceptional => "exceptional",
            Self::WinnerPotential => "winner_potential",
            Self::CompetitionReady => "competition_ready",
            Self::DemoReady => "demo_ready",
            Self::EarlyPrototype => "early_prototype",
        }
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actionable feedback lifted from the model's analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub quick_wins: Value,
    pub improvements: Value,
    pub strengths: Value,
    pub pitch: Value,
}

impl Recommendations {
    fn from_analysis(analysis: &Value) -> Self {
        let field = |key: &str, default: Value| analysis.get(key).cloned().unwrap_or(default);
        Self {
            quick_wins: field("quick_wins", Value::Array(vec![])),
            improvements: field("improvements", Value::Array(vec![])),
            strengths: field("strengths", Value::Array(vec![])),
            pitch: field("pitch_suggestions", Value::Object(Map::new())),
        }
    }
}

/// Everything returned to the caller for one evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub overall_score: f64,
    pub scores: ScoreBreakdown,
    pub analysis: Value,
    pub recommendations: Recommendations,
    pub readiness_level: Readiness,
    /// Provider that produced the analysis
    pub provider: String,
}

/// Scores projects through the fallback client
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    client: Arc<FallbackClient>,
}

impl EvaluationEngine {
    pub fn new(client: Arc<FallbackClient>) -> Self {
        Self { client }
    }

    /// Evaluate a pre-validated submission
    pub async fn evaluate(&self, project: &ProjectSubmission) -> Result<EvaluationReport, AiError> {
        let prompt = build_evaluation_prompt(project);
        let generation = self.client.generate(&prompt).await?;
        debug!(
            "AI response: {}",
            crate::providers::types::truncate_chars(&generation.text, 500)
        );

        let analysis = extract_json(&generation.text)?;
        let sub_scores = analysis
            .get("scores")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let scores = calculate_scores(&sub_scores);
        let readiness_level = Readiness::classify(scores.overall);
        let recommendations = Recommendations::from_analysis(&analysis);

        info!(
            "Evaluated '{}' via {}: overall={} ({})",
            project.name, generation.provider, scores.overall, readiness_level
        );

        Ok(EvaluationReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            overall_score: scores.overall,
            scores,
            analysis,
            recommendations,
            readiness_level,
            provider: generation.provider,
        })
    }
}

/// Weighted overall score from the model's sixteen sub-scores.
///
/// Each category is the mean of its sub-scores (missing ones count as 5).
/// Overall is the equal-weight mean of the categories scaled to 0-100, plus
/// half the wow factor (at most 5), capped at 100 and rounded half away from
/// zero. Categories are rounded to one decimal.
pub fn calculate_scores(sub_scores: &Map<String, Value>) -> ScoreBreakdown {
    let technical = category_mean(sub_scores, &TECHNICAL_KEYS);
    let innovation = category_mean(sub_scores, &INNOVATION_KEYS);
    let impact = category_mean(sub_scores, &IMPACT_KEYS);
    let execution = category_mean(sub_scores, &EXECUTION_KEYS);

    let base = (technical * 0.25 + innovation * 0.25 + impact * 0.25 + execution * 0.25) * 10.0;
    let wow_bonus = (sub_score(sub_scores, WOW_FACTOR_KEY) * 0.5).min(MAX_WOW_BONUS);
    let overall = (base + wow_bonus).min(100.0);

    ScoreBreakdown {
        technical: round_to(technical, 1),
        innovation: round_to(innovation, 1),
        impact: round_to(impact, 1),
        execution: round_to(execution, 1),
        overall: overall.round(),
        detailed: sub_scores.clone(),
    }
}

fn category_mean(sub_scores: &Map<String, Value>, keys: &[&str]) -> f64 {
    let total: f64 = keys.iter().map(|k| sub_score(sub_scores, k)).sum();
    total / keys.len() as f64
}

/// A sub-score clamped to 0-10; missing or non-numeric values are neutral
fn sub_score(sub_scores: &Map<String, Value>, key: &str) -> f64 {
    sub_scores
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 10.0))
        .unwrap_or(NEUTRAL_SUB_SCORE)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Construct the evaluation prompt
pub fn build_evaluation_prompt(project: &ProjectSubmission) -> String {
    let time = match &project.time_available {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "Not specified".to_string(),
    };

    format!(
        r#"
Evaluate this hackathon project AS AN EXTREMELY HARSH CRITIC:

PROJECT NAME: {name}
DESCRIPTION: {description}
TECH STACK: {tech_stack}
TEAM SIZE: {team_size}
TIME: {time} hours
THEME: {theme}

CRITICAL SCORING GUIDELINES - BE BRUTALLY HARSH:
- Novelty/joke projects (smart dustbins, meme generators): 10-25 MAX
- Simple CRUD apps or basic prototypes: 20-40 MAX
- Decent working projects with some innovation: 40-60
- Only truly exceptional, production-ready projects: 60-75
- Scores 75+ are EXTREMELY rare (top 5% globally)
- Scores 85+ are nearly impossible (unicorn startups)

ASK YOURSELF (be brutally honest):
- Is this a joke/novelty project? → 10-25 MAX
- Just combining existing tools? → 30 MAX
- Could be used in production? If NO → 40 MAX
- Would investors fund this? If NO → 35 MAX
- Is there real innovation? If NO → 30 MAX

SCORING SCALE (BE BRUTAL):
- 9-10: Impossible to achieve, unicorn potential
- 7-8: Could raise funding (extremely rare)
- 5-6: Solid product, real innovation (rare)
- 3-4: Working prototype (most good projects)
- 1-2: Toy/novelty/joke (most projects)

Provide evaluation in this EXACT JSON structure:
{{
  "classification": {{
    "primary_domain": "string (e.g., HealthTech, EdTech, FinTech)",
    "secondary_domains": ["string"],
    "tech_categories": ["string"]
  }},
  "executive_summary": "string (100-150 words overview)",
  "scores": {{
{score_fields}
  }},
  "strengths": [
    {{"title": "string", "description": "string", "impact": "high/medium/low"}}
  ],
  "improvements": [
    {{"title": "string", "description": "string", "priority": "high/medium/low"}}
  ],
  "quick_wins": [
    {{"action": "string", "why": "string", "how": "string", "time_estimate": "1-2 hours"}}
  ],
  "pitch_suggestions": {{
    "elevator_pitch": "string",
    "key_points": ["string"],
    "demo_flow": ["string"],
    "anticipated_questions": [{{"question": "string", "answer": "string"}}]
  }},
  "wow_factor_enhancements": ["string"],
  "resources": {{
    "apis": ["string"],
    "libraries": ["string"],
    "tutorials": ["string"]
  }}
}}

Be specific, actionable, and constructive. Focus on improvement paths.
"#,
        name = project.name,
        description = project.description,
        tech_stack = project.tech_stack.as_deref().unwrap_or("Not specified"),
        team_size = project.team_size.unwrap_or(1),
        time = time,
        theme = project.theme.as_deref().unwrap_or("Open-ended"),
        score_fields = score_field_lines(),
    )
}

fn score_field_lines() -> String {
    TECHNICAL_KEYS
        .iter()
        .chain(INNOVATION_KEYS.iter())
        .chain(IMPACT_KEYS.iter())
        .chain(EXECUTION_KEYS.iter())
        .chain(std::iter::once(&WOW_FACTOR_KEY))
        .map(|k| format!("    \"{}\": 0-10", k))
        .collect::<Vec<_>>()
        .join(",\n")
}
