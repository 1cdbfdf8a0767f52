//! hackhelper-core - AI scoring and idea generation for hackathon projects
//!
//! This crate provides:
//! - Gemini, Claude and OpenAI adapters behind a single [`LlmProvider`] trait
//! - [`FallbackClient`] that tries providers in order with per-provider backoff
//! - JSON extraction from free-form model output
//! - Evaluation scoring and idea match ranking engines
//! - Document and GitHub ingest for building project descriptions

pub mod config;
pub mod error;
pub mod evaluation;
pub mod ideas;
pub mod ingest;
pub mod normalize;
pub mod providers;

// Re-export main types for convenience
pub use config::{AiConfig, ProviderSettings};
pub use error::AiError;
pub use evaluation::{EvaluationEngine, EvaluationReport, ProjectSubmission, Readiness};
pub use ideas::{IdeaBatch, IdeaEngine, Questionnaire};
pub use ingest::{GithubClient, IngestError, RepoSummary};
pub use normalize::extract_json;
pub use providers::{FallbackClient, Generation, LlmProvider, ProviderError};
