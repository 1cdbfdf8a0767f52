//! Personalized idea generation and profile match scoring

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AiError;
use crate::normalize::extract_json;
use crate::providers::FallbackClient;

const SKILL_POINTS_PER_MATCH: u32 = 5;
const SKILL_POINTS_MAX: u32 = 30;
const INTEREST_MATCH_POINTS: u32 = 25;
const INTEREST_PARTIAL_POINTS: u32 = 10;
const MAX_MATCH_SCORE: u32 = 100;

/// Raw questionnaire as submitted by the user.
///
/// The required fields are `skill_level`, `primary_skill`, `languages`,
/// `time_available` and `primary_goal`; the front door rejects requests
/// missing any of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Questionnaire {
    pub skill_level: String,
    pub primary_skill: String,
    pub languages: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub team_size: Option<u32>,
    pub time_available: Value,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub required_tech: String,
    pub primary_goal: String,
    #[serde(default)]
    pub domain_interests: Vec<String>,
    #[serde(default)]
    pub personal_frustrations: String,
    #[serde(default)]
    pub emerging_tech: Vec<String>,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub platform: Vec<String>,
    #[serde(default)]
    pub ui_importance: Option<String>,
    #[serde(default)]
    pub ai_preference: Option<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    #[serde(default)]
    pub desired_change: Vec<String>,
}

/// The attributes of a questionnaire that drive prompting and scoring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub skill_level: String,
    pub primary_skill: String,
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub team_size: u32,
    pub time_available: String,
    pub theme: String,
    pub required_tech: String,
    pub goal: String,
    pub interests: Vec<String>,
    pub frustrations: String,
    pub tech_interests: Vec<String>,
    pub project_type: String,
    pub platform: Vec<String>,
    pub ui_importance: String,
    pub ai_preference: String,
    pub target_audience: Vec<String>,
    pub desired_change: Vec<String>,
}

impl From<&Questionnaire> for UserProfile {
    fn from(q: &Questionnaire) -> Self {
        Self {
            skill_level: q.skill_level.clone(),
            primary_skill: q.primary_skill.clone(),
            languages: q.languages.clone(),
            frameworks: q.frameworks.clone(),
            team_size: q.team_size.unwrap_or(1),
            time_available: value_to_text(&q.time_available),
            theme: q.theme.clone(),
            required_tech: q.required_tech.clone(),
            goal: q.primary_goal.clone(),
            interests: q.domain_interests.clone(),
            frustrations: q.personal_frustrations.clone(),
            tech_interests: q.emerging_tech.clone(),
            project_type: q.project_type.clone(),
            platform: q.platform.clone(),
            ui_importance: q.ui_importance.clone().unwrap_or_else(|| "medium".to_string()),
            ai_preference: q.ai_preference.clone().unwrap_or_else(|| "optional".to_string()),
            target_audience: q.target_audience.clone(),
            desired_change: q.desired_change.clone(),
        }
    }
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Ideas produced for one questionnaire, best match first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaBatch {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Each idea is the model's JSON object plus a `match_score` field
    pub ideas: Vec<Value>,
    pub provider: String,
}

/// Generates and ranks project ideas through the fallback client
#[derive(Debug, Clone)]
pub struct IdeaEngine {
    client: Arc<FallbackClient>,
}

impl IdeaEngine {
    pub fn new(client: Arc<FallbackClient>) -> Self {
        Self { client }
    }

    pub async fn generate(&self, questionnaire: &Questionnaire) -> Result<IdeaBatch, AiError> {
        let profile = UserProfile::from(questionnaire);
        let prompt = build_generation_prompt(&profile);
        let generation = self.client.generate(&prompt).await?;

        let result = extract_json(&generation.text)?;
        let ideas = match result.get("ideas") {
            Some(Value::Array(ideas)) => ideas.clone(),
            _ => {
                warn!("AI response from {} had no ideas array", generation.provider);
                Vec::new()
            }
        };

        let ideas = rank_ideas(&profile, ideas);
        info!(
            "Generated {} ideas via {} for a {} profile",
            ideas.len(),
            generation.provider,
            profile.skill_level
        );

        Ok(IdeaBatch {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            ideas,
            provider: generation.provider,
        })
    }
}

/// Attach `match_score` to each idea and sort best-first.
///
/// The sort is stable, so equal scores keep the model's order.
pub fn rank_ideas(profile: &UserProfile, ideas: Vec<Value>) -> Vec<Value> {
    let mut scored: Vec<(u32, Value)> = ideas
        .into_iter()
        .map(|mut idea| {
            let score = calculate_match_score(profile, &idea);
            if let Value::Object(map) = &mut idea {
                map.insert("match_score".to_string(), Value::from(score));
            }
            (score, idea)
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, idea)| idea).collect()
}

/// Heuristic 0-100 fit between a profile and an idea
pub fn calculate_match_score(profile: &UserProfile, idea: &Value) -> u32 {
    let score = skill_points(profile, idea)
        + complexity_points(&profile.skill_level, str_at(idea, &["feasibility", "complexity"]).unwrap_or("medium"))
        + interest_points(profile, idea)
        + time_fit_points(str_at(idea, &["feasibility", "time_fit"]).unwrap_or(""))
        + goal_points(&profile.goal, idea);
    score.min(MAX_MATCH_SCORE)
}

/// 5 points per tech-stack entry naming a known language, plus 5 per entry
/// naming a known framework, up to 30
fn skill_points(profile: &UserProfile, idea: &Value) -> u32 {
    let tech_stack: Vec<String> = idea
        .pointer("/technical/tech_stack")
        .and_then(Value::as_array)
        .map(|stack| {
            stack
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default();

    let count_matches = |known: &[String]| -> u32 {
        tech_stack
            .iter()
            .filter(|tech| known.iter().any(|k| tech.contains(&k.to_lowercase())))
            .count() as u32
    };

    let matches = count_matches(&profile.languages) + count_matches(&profile.frameworks);
    (matches * SKILL_POINTS_PER_MATCH).min(SKILL_POINTS_MAX)
}

/// Lookup of how well idea complexity suits the user's level
fn complexity_points(skill_level: &str, complexity: &str) -> u32 {
    match (skill_level, complexity) {
        ("beginner", "low") | ("intermediate", "medium") | ("advanced", "high") => 20,
        ("intermediate", "low") | ("advanced", "medium") => 15,
        ("beginner", "medium") => 10,
        _ => 5,
    }
}

fn interest_points(profile: &UserProfile, idea: &Value) -> u32 {
    let domain = idea
        .get("domain")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();
    let matched = profile
        .interests
        .iter()
        .any(|interest| domain.contains(&interest.to_lowercase()));
    if matched {
        INTEREST_MATCH_POINTS
    } else {
        INTEREST_PARTIAL_POINTS
    }
}

fn time_fit_points(time_fit: &str) -> u32 {
    let time_fit = time_fit.to_lowercase();
    if time_fit.contains("fits") || time_fit.contains("perfect") {
        15
    } else if time_fit.contains("tight") {
        10
    } else if time_fit.contains("ambitious") {
        5
    } else {
        0
    }
}

fn goal_points(goal: &str, idea: &Value) -> u32 {
    let present = |path: &[&str]| str_at(idea, path).is_some_and(|s| !s.is_empty());
    match goal {
        "win" if present(&["differentiation", "judge_appeal"]) => 10,
        "learn" if present(&["feasibility", "learning_curve"]) => 10,
        _ => 5,
    }
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
}

/// Construct the idea generation prompt
pub fn build_generation_prompt(profile: &UserProfile) -> String {
    let or = |s: &str, fallback: &str| {
        if s.trim().is_empty() {
            fallback.to_string()
        } else {
            s.to_string()
        }
    };
    let frameworks = if profile.frameworks.is_empty() {
        "None specified".to_string()
    } else {
        profile.frameworks.join(", ")
    };

    format!(
        r#"
Generate 4 personalized hackathon project ideas based on this profile:

TECHNICAL PROFILE:
- Skill Level: {skill_level}
- Primary Skill: {primary_skill}
- Languages: {languages}
- Frameworks: {frameworks}
- Team Size: {team_size}

CONSTRAINTS:
- Time Available: {time} hours
- Theme: {theme}
- Required Tech: {required_tech}
- Primary Goal: {goal}

INTERESTS:
- Domains: {interests}
- Personal Frustrations: {frustrations}
- Tech Interests: {tech_interests}

PREFERENCES:
- Project Type: {project_type}
- Platform: {platform}
- UI Importance: {ui_importance}
- AI Preference: {ai_preference}

TARGET:
- Audience: {audience}
- Desired Change: {desired_change}

Generate 4 diverse ideas in this JSON structure:
{{
  "ideas": [
    {{
      "name": "Creative Project Name",
      "tagline": "One-sentence description",
      "domain": "Primary domain (HealthTech, EdTech, etc.)",
      "problem": {{"statement": "...", "why_matters": "...", "current_gaps": "..."}},
      "solution": {{"description": "...", "key_features": ["..."], "value_proposition": "..."}},
      "technical": {{"tech_stack": ["React", "Node.js"], "architecture": "...", "components": ["..."], "apis": ["..."]}},
      "roadmap": {{
        "phase1": {{"hours": "0-8", "tasks": ["..."]}},
        "phase2": {{"hours": "8-16", "tasks": ["..."]}},
        "phase3": {{"hours": "16-24", "tasks": ["..."]}}
      }},
      "feasibility": {{"complexity": "low/medium/high", "learning_curve": "...", "time_fit": "...", "risks": ["..."]}},
      "differentiation": {{"unique_factors": ["..."], "judge_appeal": "...", "competition": "..."}},
      "impact": {{"beneficiaries": "...", "scale": "...", "real_world": "..."}},
      "wow_factors": ["..."],
      "getting_started": {{"steps": ["..."], "resources": ["..."], "boilerplate": "..."}},
      "challenges": [{{"obstacle": "...", "solution": "..."}}],
      "extensions": {{"post_hackathon": ["..."], "monetization": "...", "startup_potential": "high/medium/low and why"}}
    }}
  ]
}}

CRITICAL JSON REQUIREMENTS:
- Return ONLY valid JSON - no markdown, no code blocks, no explanations
- NO trailing commas in arrays or objects
- NO comments in the JSON
- Use double quotes for all strings
- Ensure all brackets and braces are properly closed

OTHER REQUIREMENTS:
- Make ideas SPECIFIC, not generic
- Ensure feasibility within time constraints
- Match complexity to skill level
- Include at least one "safe" idea and one "ambitious" idea
- Reference real APIs, frameworks, and tools
- Be creative and avoid clichés
- Tailor to their interests and frustrations
"#,
        skill_level = profile.skill_level,
        primary_skill = profile.primary_skill,
        languages = profile.languages.join(", "),
        frameworks = frameworks,
        team_size = profile.team_size,
        time = profile.time_available,
        theme = or(&profile.theme, "Open-ended"),
        required_tech = or(&profile.required_tech, "None"),
        goal = profile.goal,
        interests = profile.interests.join(", "),
        frustrations = or(&profile.frustrations, "None mentioned"),
        tech_interests = profile.tech_interests.join(", "),
        project_type = profile.project_type,
        platform = profile.platform.join(", "),
        ui_importance = profile.ui_importance,
        ai_preference = profile.ai_preference,
        audience = profile.target_audience.join(", "),
        desired_change = profile.desired_change.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{LlmProvider, ProviderError};
    use async_trait::async_trait;
    use serde_json::json;

    fn profile() -> UserProfile {
        UserProfile::from(&Questionnaire {
            skill_level: "intermediate".into(),
            primary_skill: "backend".into(),
            languages: vec!["Python".into(), "Rust".into()],
            frameworks: vec!["React".into()],
            time_available: json!(24),
            primary_goal: "win".into(),
            domain_interests: vec!["health".into()],
            ..Questionnaire::default()
        })
    }

    fn idea(domain: &str, stack: &[&str], complexity: &str, time_fit: &str) -> Value {
        json!({
            "name": format!("{domain} idea"),
            "domain": domain,
            "technical": {"tech_stack": stack},
            "feasibility": {"complexity": complexity, "time_fit": time_fit, "learning_curve": "moderate"},
            "differentiation": {"judge_appeal": "Judges love impact"}
        })
    }

    #[test]
    fn test_profile_defaults() {
        let p = profile();
        assert_eq!(p.team_size, 1);
        assert_eq!(p.time_available, "24");
        assert_eq!(p.ui_importance, "medium");
        assert_eq!(p.ai_preference, "optional");
        assert_eq!(p.goal, "win");
    }

    #[test]
    fn test_full_match_score() {
        let i = idea("HealthTech", &["Python", "FastAPI", "React Native", "Rust"], "medium", "Fits well in 24h");
        // skill 15 + complexity 20 + interest 25 + time 15 + goal 10
        assert_eq!(calculate_match_score(&profile(), &i), 85);
    }

    #[test]
    fn test_partial_credit() {
        let i = idea("FinTech", &["Go"], "high", "Tight but doable");
        // skill 0 + complexity 5 + interest 10 + time 10 + goal 10
        assert_eq!(calculate_match_score(&profile(), &i), 35);
    }

    #[test]
    fn test_skill_points_capped() {
        let stack = ["Python", "Python ML", "Rust", "Rust WASM", "React", "React Rust", "Python React"];
        assert_eq!(skill_points(&profile(), &idea("x", &stack, "low", "")), 30);
    }

    #[test]
    fn test_complexity_table() {
        assert_eq!(complexity_points("beginner", "low"), 20);
        assert_eq!(complexity_points("advanced", "high"), 20);
        assert_eq!(complexity_points("advanced", "medium"), 15);
        assert_eq!(complexity_points("beginner", "medium"), 10);
        assert_eq!(complexity_points("beginner", "high"), 5);
        assert_eq!(complexity_points("expert", "low"), 5);
    }

    #[test]
    fn test_time_fit_keywords() {
        assert_eq!(time_fit_points("Perfect for a weekend"), 15);
        assert_eq!(time_fit_points("tight"), 10);
        assert_eq!(time_fit_points("Very AMBITIOUS"), 5);
        assert_eq!(time_fit_points("unknown"), 0);
    }

    #[test]
    fn test_goal_alignment() {
        let with_curve = json!({"feasibility": {"learning_curve": "steep"}});
        assert_eq!(goal_points("learn", &with_curve), 10);
        assert_eq!(goal_points("win", &with_curve), 5);
        assert_eq!(goal_points("network", &with_curve), 5);
        assert_eq!(goal_points("win", &json!({"differentiation": {"judge_appeal": ""}})), 5);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        // medium complexity default with an intermediate user
        assert_eq!(calculate_match_score(&profile(), &json!({})), 20 + 10 + 5);
    }

    #[test]
    fn test_score_always_bounded() {
        let ideas = [
            json!({}),
            json!(null),
            json!("not an object"),
            idea("health", &["Python"; 50], "medium", "fits perfect tight"),
        ];
        for i in &ideas {
            assert!(calculate_match_score(&profile(), i) <= 100);
        }
    }

    #[test]
    fn test_rank_is_stable_and_descending() {
        let ideas = vec![
            json!({"name": "first"}),
            idea("HealthTech", &["Rust"], "medium", "fits"),
            json!({"name": "third"}),
        ];
        let ranked = rank_ideas(&profile(), ideas);
        assert_eq!(ranked[0]["domain"], "HealthTech");
        assert_eq!(ranked[1]["name"], "first");
        assert_eq!(ranked[2]["name"], "third");
        assert_eq!(ranked[1]["match_score"], 35);
    }

    #[test]
    fn test_prompt_fallbacks() {
        let prompt = build_generation_prompt(&profile());
        assert!(prompt.contains("- Languages: Python, Rust"));
        assert!(prompt.contains("- Theme: Open-ended"));
        assert!(prompt.contains("- Required Tech: None"));
        assert!(prompt.contains("- Personal Frustrations: None mentioned"));
        assert!(prompt.contains("- Time Available: 24 hours"));
    }

    struct CannedProvider(String);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn provider_name(&self) -> &str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned-model"
        }
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn engine(response: String) -> IdeaEngine {
        let client = FallbackClient::new(vec![Box::new(CannedProvider(response))]).unwrap();
        IdeaEngine::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_generate_ranks_ideas() {
        let body = json!({"ideas": [
            json!({"name": "low"}),
            idea("HealthTech", &["Python"], "medium", "fits"),
        ]});
        let q = Questionnaire {
            skill_level: "intermediate".into(),
            languages: vec!["Python".into()],
            time_available: json!("24"),
            primary_goal: "win".into(),
            domain_interests: vec!["health".into()],
            ..Questionnaire::default()
        };

        let batch = engine(format!("Here you go:\n{}", body)).generate(&q).await.unwrap();

        assert_eq!(batch.ideas.len(), 2);
        assert_eq!(batch.ideas[0]["domain"], "HealthTech");
        assert_eq!(batch.provider, "canned");
        assert!(batch.ideas.iter().all(|i| i.get("match_score").is_some()));
    }

    #[tokio::test]
    async fn test_generate_without_ideas_key_is_empty() {
        let batch = engine("{\"other\": 1}".into())
            .generate(&Questionnaire::default())
            .await
            .unwrap();
        assert!(batch.ideas.is_empty());
    }

    #[tokio::test]
    async fn test_generate_malformed() {
        let err = engine("{\"ideas\": [".into())
            .generate(&Questionnaire::default())
            .await
            .unwrap_err();
        assert!(err.is_parse_failure());
    }
}
