//! Fallback client: ordered providers, per-provider retry with backoff

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AiConfig, ProviderSettings};
use crate::error::AiError;

use super::anthropic::AnthropicProvider;
use super::gemini::GeminiProvider;
use super::openai::OpenAiProvider;
use super::types::{LlmProvider, ProviderError};

/// Prompt used by [`FallbackClient::probe`]
const PROBE_PROMPT: &str = "Hello";

/// Text produced by a provider, and which provider produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub provider: String,
}

/// Outcome of probing a single provider
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub provider: String,
    pub model: String,
    pub outcome: Result<String, ProviderError>,
}

/// Tries providers strictly in order until one answers
pub struct FallbackClient {
    /// Providers in failover order (index 0 = primary)
    providers: Vec<Box<dyn LlmProvider>>,
    /// Attempts per provider before moving to the next
    retry_budget: u32,
    /// Base delay for exponential backoff
    base_retry_delay: Duration,
}

impl std::fmt::Debug for FallbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackClient")
            .field("providers", &self.provider_names())
            .field("retry_budget", &self.retry_budget)
            .field("base_retry_delay", &self.base_retry_delay)
            .finish()
    }
}

impl FallbackClient {
    /// Create a client over providers in failover order
    pub fn new(providers: Vec<Box<dyn LlmProvider>>) -> Result<Self, AiError> {
        if providers.is_empty() {
            return Err(AiError::NoProvidersConfigured);
        }
        Ok(Self {
            providers,
            retry_budget: 1,
            base_retry_delay: Duration::from_secs(2),
        })
    }

    /// Build adapters for every configured credential (Gemini, Claude, OpenAI)
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut providers: Vec<Box<dyn LlmProvider>> = Vec::new();

        if let Some(settings) = active(&config.google) {
            providers.push(Box::new(
                GeminiProvider::new(settings, timeout).map_err(|e| setup_error("gemini", e))?,
            ));
        }
        if let Some(settings) = active(&config.anthropic) {
            providers.push(Box::new(
                AnthropicProvider::new(settings, timeout).map_err(|e| setup_error("claude", e))?,
            ));
        }
        if let Some(settings) = active(&config.openai) {
            providers.push(Box::new(
                OpenAiProvider::new(settings, timeout).map_err(|e| setup_error("openai", e))?,
            ));
        }

        let client = Self::new(providers)?
            .with_retry_budget(config.retry_budget)
            .with_base_retry_delay(Duration::from_secs(config.base_retry_delay_secs));

        info!("AI client ready with providers: {}", client.provider_names().join(", "));
        Ok(client)
    }

    /// Set the default attempts per provider (values below 1 are treated as 1)
    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget.max(1);
        self
    }

    /// Set the base retry delay for exponential backoff
    pub fn with_base_retry_delay(mut self, delay: Duration) -> Self {
        self.base_retry_delay = delay;
        self
    }

    /// Generate with the client's default retry budget
    pub async fn generate(&self, prompt: &str) -> Result<Generation, AiError> {
        self.generate_with_budget(prompt, self.retry_budget).await
    }

    /// Send the prompt to each provider in turn, returning the first success
    pub async fn generate_with_budget(
        &self,
        prompt: &str,
        retry_budget: u32,
    ) -> Result<Generation, AiError> {
        let retry_budget = retry_budget.max(1);
        let mut last_error = None;

        for (idx, provider) in self.providers.iter().enumerate() {
            info!(
                "Attempting provider {} ({}/{})",
                provider.provider_name(),
                idx + 1,
                self.providers.len()
            );

            match generate_with_retry(provider.as_ref(), prompt, retry_budget, self.base_retry_delay)
                .await
            {
                Ok(text) => {
                    if idx > 0 {
                        info!(
                            "Request succeeded on failover provider {} ({})",
                            provider.provider_name(),
                            provider.model()
                        );
                    }
                    return Ok(Generation {
                        text,
                        provider: provider.provider_name().to_string(),
                    });
                }
                Err(e) => {
                    match &e {
                        ProviderError::RateLimited => {
                            warn!("Rate limit hit on {}", provider.provider_name())
                        }
                        ProviderError::Unauthorized { status } => warn!(
                            "Authentication failed for {} (status {})",
                            provider.provider_name(),
                            status
                        ),
                        other => warn!("Provider {} failed: {}", provider.provider_name(), other),
                    }
                    if let Some(next) = self.providers.get(idx + 1) {
                        info!(
                            "Failing over from {} to {}",
                            provider.provider_name(),
                            next.provider_name()
                        );
                    }
                    last_error = Some((provider.provider_name().to_string(), e));
                }
            }
        }

        // `new` guarantees at least one provider, so the loop always records an error
        let (provider, source) = last_error.ok_or(AiError::NoProvidersConfigured)?;
        Err(AiError::AllProvidersFailed { provider, source })
    }

    /// Send a tiny prompt to every provider independently (no failover, no retries)
    pub async fn probe(&self) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let outcome = provider.generate(PROBE_PROMPT).await;
            debug!(
                "Probe {}: {}",
                provider.provider_name(),
                if outcome.is_ok() { "ok" } else { "failed" }
            );
            results.push(ProbeResult {
                provider: provider.provider_name().to_string(),
                model: provider.model().to_string(),
                outcome,
            });
        }
        results
    }

    /// Provider names in failover order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    /// Number of configured providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Default attempts per provider
    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }
}

/// Call one provider up to `retry_budget` times.
///
/// Only rate limits and transport failures are retried; the wait before
/// retry `n` (0-based) is `base_delay * 2^n`.
pub(crate) async fn generate_with_retry(
    provider: &dyn LlmProvider,
    prompt: &str,
    retry_budget: u32,
    base_delay: Duration,
) -> Result<String, ProviderError> {
    let mut attempt = 0;
    loop {
        debug!(
            "Calling {} ({}) attempt {}/{}",
            provider.provider_name(),
            provider.model(),
            attempt + 1,
            retry_budget
        );

        match provider.generate(prompt).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && attempt + 1 < retry_budget => {
                let delay = backoff_delay(base_delay, attempt);
                warn!(
                    "{} error: {}. Retrying in {:?} (attempt {}/{})",
                    provider.provider_name(),
                    e,
                    delay,
                    attempt + 1,
                    retry_budget
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `base * 2^attempt`, saturating instead of overflowing on huge configured bases
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(Duration::MAX)
}

fn active(settings: &Option<ProviderSettings>) -> Option<&ProviderSettings> {
    settings.as_ref().filter(|s| s.is_configured())
}

fn setup_error(provider: &str, source: ProviderError) -> AiError {
    AiError::ProviderSetup {
        provider: provider.to_string(),
        source,
    }
}
