//! Terminal errors surfaced by the AI client and the engines

use thiserror::Error;

use crate::providers::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    /// No provider credential was present when the client was built
    #[error(
        "No AI provider API keys configured. Set at least one of: GOOGLE_API_KEY, ANTHROPIC_API_KEY, OPENAI_API_KEY"
    )]
    NoProvidersConfigured,

    /// A provider could not be constructed (e.g. the HTTP client failed to build)
    #[error("failed to initialise provider {provider}: {source}")]
    ProviderSetup {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// Every configured provider failed; carries the last one tried
    #[error("All AI providers failed. Last error from {provider}: {source}")]
    AllProvidersFailed {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// Model output did not contain a parseable JSON object
    #[error("Failed to parse AI response as JSON: {snippet}")]
    MalformedResponse { snippet: String },
}

impl AiError {
    /// Whether the failure came from parsing model output rather than reaching a provider
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}
