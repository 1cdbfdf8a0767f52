//! Multi-provider LLM client
//!
//! Supports Google Gemini, Anthropic Claude and OpenAI. Providers implement the
//! [`LlmProvider`] trait and are composed via [`FallbackClient`] for ordered
//! failover.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod router;
pub mod types;

pub use router::{FallbackClient, Generation, ProbeResult};
pub use types::{LlmProvider, ProviderError};
