//! Immutable AI client configuration
//!
//! [`AiConfig`] is built once (from the config file or the environment) and
//! handed to [`crate::providers::FallbackClient::from_config`]. Nothing else in
//! the crate reads credentials from the environment.

use serde::{Deserialize, Serialize};

pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Settings for one provider endpoint
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSettings {
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Keys pasted into a file or expanded from `${VAR}` often carry a trailing newline
fn deserialize_trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

fn default_max_tokens() -> u32 {
    4096
}

impl ProviderSettings {
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-flash-lite-latest".to_string(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Override the endpoint root (proxies, regional endpoints, mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// A provider is active only when it has a non-blank credential
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Provider credentials plus retry/timeout knobs.
///
/// Providers are always tried in the fixed order Gemini, Claude, OpenAI;
/// a provider whose entry is `None` or whose key is blank is skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    #[serde(default)]
    pub google: Option<ProviderSettings>,
    #[serde(default)]
    pub anthropic: Option<ProviderSettings>,
    #[serde(default)]
    pub openai: Option<ProviderSettings>,
    /// Attempts per provider before moving on
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// Base of the exponential backoff between attempts
    #[serde(default = "default_base_retry_delay_secs")]
    pub base_retry_delay_secs: u64,
    /// Per-request ceiling
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_retry_budget() -> u32 {
    1
}
fn default_base_retry_delay_secs() -> u64 {
    2
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            google: None,
            anthropic: None,
            openai: None,
            retry_budget: default_retry_budget(),
            base_retry_delay_secs: default_base_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    /// Build a config from `GOOGLE_API_KEY`, `ANTHROPIC_API_KEY` and
    /// `OPENAI_API_KEY`, using default endpoints and models.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AiConfig::from_env`] with an injectable variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            google: key(GOOGLE_API_KEY_VAR).map(ProviderSettings::gemini),
            anthropic: key(ANTHROPIC_API_KEY_VAR).map(ProviderSettings::anthropic),
            openai: key(OPENAI_API_KEY_VAR).map(ProviderSettings::openai),
            ..Self::default()
        }
    }

    /// Names of the providers that will be activated, in failover order
    pub fn active_providers(&self) -> Vec<&'static str> {
        [
            ("gemini", &self.google),
            ("claude", &self.anthropic),
            ("openai", &self.openai),
        ]
        .into_iter()
        .filter(|(_, s)| s.as_ref().is_some_and(ProviderSettings::is_configured))
        .map(|(name, _)| name)
        .collect()
    }
}

/// Mask a secret for Debug output: first 3 and last 4 chars, or "***"
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_all_keys() {
        let cfg = AiConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("ANTHROPIC_API_KEY", "a-key"),
            ("OPENAI_API_KEY", "o-key"),
        ]));
        assert_eq!(cfg.active_providers(), vec!["gemini", "claude", "openai"]);
        assert_eq!(cfg.retry_budget, 1);
        assert_eq!(cfg.timeout_secs, 120);
    }

    #[test]
    fn test_from_lookup_subset_keeps_order() {
        let cfg = AiConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "o-key"),
            ("GOOGLE_API_KEY", "g-key"),
        ]));
        assert_eq!(cfg.active_providers(), vec!["gemini", "openai"]);
    }

    #[test]
    fn test_file_keys_are_trimmed() {
        let settings: ProviderSettings = serde_json::from_value(serde_json::json!({
            "api_key": "  sk-from-file\n",
            "base_url": "https://api.openai.com",
            "model": "gpt-4o-mini"
        }))
        .unwrap();
        assert_eq!(settings.api_key, "sk-from-file");

        let blank: ProviderSettings = serde_json::from_value(serde_json::json!({
            "api_key": "\n",
            "base_url": "https://api.openai.com",
            "model": "gpt-4o-mini"
        }))
        .unwrap();
        assert!(!blank.is_configured());
        assert_eq!(ProviderSettings::gemini(" g-key\n").api_key, "g-key");
    }

    #[test]
    fn test_from_lookup_blank_keys_ignored() {
        let cfg = AiConfig::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "   ")]));
        assert!(cfg.anthropic.is_none());
        assert!(cfg.active_providers().is_empty());
    }

    #[test]
    fn test_key_is_trimmed() {
        let cfg = AiConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", " AIza-123 \n")]));
        assert_eq!(cfg.google.unwrap().api_key, "AIza-123");
    }

    #[test]
    fn test_debug_masks_key() {
        let settings = ProviderSettings::openai("sk-proj-abcdefgh1234");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("sk-proj-abcdefgh1234"));
        assert!(debug.contains("sk-...1234"));
    }

    #[test]
    fn test_mask_secret_short_and_empty() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("abc"), "***");
    }

    #[test]
    fn test_deserialize_defaults() {
        let cfg: AiConfig = serde_json::from_str(
            r#"{"openai": {"api_key": "k", "base_url": "http://x", "model": "m"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.retry_budget, 1);
        assert_eq!(cfg.base_retry_delay_secs, 2);
        assert_eq!(cfg.openai.unwrap().max_tokens, 4096);
    }
}
