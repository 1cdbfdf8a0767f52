use anyhow::{Context, Result};
use hackhelper_core::AiConfig;
use hackhelper_core::config::mask_secret;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HackHelperConfig {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("auth_token", &mask_secret(&self.auth_token))
            .field("max_upload_mb", &self.max_upload_mb)
            .finish()
    }
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_max_upload_mb() -> usize {
    25
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            auth_token: String::new(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl GatewayConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("Invalid gateway address {}:{}", self.bind, self.port))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hackhelper")
}

impl HackHelperConfig {
    /// Load from `custom_path` or `~/.hackhelper/config.toml`.
    ///
    /// With no explicit path and no file on disk, provider keys come from the
    /// environment and everything else keeps its default.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => path.clone(),
            None => {
                let default_path = config_dir().join("config.toml");
                if !default_path.exists() {
                    info!(
                        "No config at {}, reading provider keys from the environment",
                        default_path.display()
                    );
                    return Ok(Self {
                        ai: AiConfig::from_env(),
                        gateway: GatewayConfig::default(),
                    });
                }
                default_path
            }
        };

        check_permissions(&path)?;

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `hackhelper init` first.",
                path.display()
            )
        })?;

        Self::parse(&content).with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Parse config text, expanding allowlisted `${VAR}` references
    pub fn parse(content: &str) -> Result<Self> {
        for name in hardcoded_secrets(content) {
            warn!(
                "{} is hardcoded in config file. For security, use an environment variable reference like \"${{{}}}\"",
                name.0, name.1
            );
        }

        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;
        Ok(config)
    }
}

/// Refuse config files readable by group or other (Unix only)
fn check_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(anyhow::anyhow!(
                    "Config file {:?} has overly permissive permissions ({:o}). \
                     It may contain secrets. Fix with: chmod 600 {:?}",
                    path,
                    mode & 0o777,
                    path
                ));
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Secrets written literally instead of as `${VAR}` references.
///
/// Returns (field label, suggested variable) pairs.
fn hardcoded_secrets(raw: &str) -> Vec<(&'static str, &'static str)> {
    let Ok(raw_config) = toml::from_str::<HackHelperConfig>(raw) else {
        return Vec::new();
    };
    let literal = |s: &str| !s.is_empty() && !s.contains("${");
    let key_of = |p: &Option<hackhelper_core::ProviderSettings>| {
        p.as_ref().is_some_and(|s| literal(&s.api_key))
    };

    let mut found = Vec::new();
    if key_of(&raw_config.ai.google) {
        found.push(("Google API key", "GOOGLE_API_KEY"));
    }
    if key_of(&raw_config.ai.anthropic) {
        found.push(("Anthropic API key", "ANTHROPIC_API_KEY"));
    }
    if key_of(&raw_config.ai.openai) {
        found.push(("OpenAI API key", "OPENAI_API_KEY"));
    }
    if literal(&raw_config.gateway.auth_token) {
        found.push(("Gateway auth token", "HACKHELPER_GATEWAY_TOKEN"));
    }
    found
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &[
    "GOOGLE_API_KEY",
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "HACKHELPER_GATEWAY_TOKEN",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str) -> String {
    expand_with(s, |name| std::env::var(name).ok())
}

fn expand_with<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            // Leave the ${VAR} unexpanded so it's obvious
            pos = abs_start + end + 1;
            continue;
        }

        let value = lookup(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}
