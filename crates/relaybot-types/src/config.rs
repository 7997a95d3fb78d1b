//! Relay configuration consumed once at process start.
//!
//! The core never re-reads configuration; the loader in the infra crate
//! deserializes a YAML file into [`RelayConfig`] and the composition root
//! hands the pieces to exactly one backend and one orchestrator.

use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::schedule::TokenSchedule;

/// Errors from configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("invalid token schedule: {0}")]
    InvalidSchedule(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which backend variant to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Perplexity,
    HttpAgent,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "open_ai"),
            ProviderKind::Perplexity => write!(f, "perplexity"),
            ProviderKind::HttpAgent => write!(f, "http_agent"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "open_ai" | "openai" => Ok(ProviderKind::OpenAi),
            "perplexity" => Ok(ProviderKind::Perplexity),
            "http_agent" => Ok(ProviderKind::HttpAgent),
            other => Err(format!("invalid provider kind: '{other}'")),
        }
    }
}

/// Request/response template spoken by a self-hosted HTTP agent endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentShape {
    #[default]
    OpenAiCompatible,
    AnthropicCompatible,
    Custom,
}

/// Settings specific to the generic HTTP agent backend.
///
/// Truncation detection is configuration, not a hard-coded constant:
/// vendors disagree on which finish-marker string means "ran out of
/// budget", and the mapping is not stable across API versions.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub shape: AgentShape,

    /// Response field carrying the finish marker.
    #[serde(default = "default_finish_field")]
    pub finish_field: String,

    /// Marker value that means the reply was cut off at the ceiling.
    #[serde(default = "default_truncated_value")]
    pub truncated_value: String,
}

fn default_finish_field() -> String {
    "finish_reason".to_string()
}

fn default_truncated_value() -> String {
    "length".to_string()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            shape: AgentShape::default(),
            finish_field: default_finish_field(),
            truncated_value: default_truncated_value(),
        }
    }
}

/// Bot identity and shared system prompt material.
#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    /// Nickname the bot goes by on the platform.
    pub name: String,

    /// Extra system-prompt text appended to the fixed preamble.
    #[serde(default)]
    pub system_role: String,
}

/// Per-backend connection data. Immutable after construction.
#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: String,

    /// Credential for the provider. Not required for the HTTP agent.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Override the backend's default endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Progressive token-budget triple.
    pub tokens: TokenSchedule,

    /// Fixed sampling temperature; not tunable per call.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Layer the tool-augmented agent on top of the chosen backend.
    #[serde(default)]
    pub tools_enabled: bool,

    /// HTTP agent template settings (only read when `kind = http_agent`).
    #[serde(default)]
    pub agent: AgentSettings,
}

fn default_temperature() -> f64 {
    0.5
}

/// Messaging platform limits and endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSettings {
    /// Outbound webhook accepting `{destination, content}` chunks.
    pub webhook_url: String,

    /// Channel identifier replies are delivered to.
    pub destination: String,

    /// Hard per-message size limit, in characters.
    #[serde(default = "default_chunk_limit")]
    pub chunk_limit: usize,

    /// Bind address for the inbound event endpoint.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_chunk_limit() -> usize {
    2000
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Root configuration object.
#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    pub bot: BotSettings,
    pub provider: ProviderSettings,
    pub platform: PlatformSettings,
}

impl RelayConfig {
    /// Validate cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.provider.tokens;
        TokenSchedule::new(t.min, t.max, t.step)?;

        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.model is empty".into()));
        }
        if self.provider.api_key.is_none() && self.provider.kind != ProviderKind::HttpAgent {
            return Err(ConfigError::Invalid(format!(
                "provider.api_key is required for kind '{}'",
                self.provider.kind
            )));
        }
        if self.platform.chunk_limit == 0 {
            return Err(ConfigError::Invalid("platform.chunk_limit is zero".into()));
        }
        if self.platform.webhook_url.trim().is_empty() {
            return Err(ConfigError::Invalid("platform.webhook_url is empty".into()));
        }
        if self.bot.name.trim().is_empty() {
            return Err(ConfigError::Invalid("bot.name is empty".into()));
        }
        Ok(())
    }

    /// Compose the shared system prompt from the bot settings.
    ///
    /// Fixed preamble plus the configured `system_role`, mirroring how the
    /// nickname and answer-style instructions are baked in at startup.
    pub fn system_prompt(&self) -> String {
        format!(
            "Goes by the nickname {}; answers in summarized paragraphs with \
             short and understandable messages. {}",
            self.bot.name, self.bot.system_role
        )
        .trim_end()
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
bot:
  name: amigo
  system_role: "Knows about infrastructure."
provider:
  kind: open_ai
  model: gpt-4o
  api_key: sk-test
  tokens:
    min: 256
    max: 1024
    step: 256
platform:
  webhook_url: "http://localhost:9000/outbound"
  destination: general
"#;

    fn sample_config() -> RelayConfig {
        serde_yaml_ng::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_sample_parses_and_validates() {
        let config = sample_config();
        config.validate().unwrap();
        assert_eq!(config.bot.name, "amigo");
        assert_eq!(config.provider.kind, ProviderKind::OpenAi);
        assert_eq!(config.provider.tokens.min, 256);
        // defaults
        assert_eq!(config.platform.chunk_limit, 2000);
        assert_eq!(config.platform.bind_addr, "127.0.0.1:8080");
        assert!((config.provider.temperature - 0.5).abs() < f64::EPSILON);
        assert!(!config.provider.tools_enabled);
    }

    #[test]
    fn test_provider_kind_roundtrip() {
        for kind in [
            ProviderKind::Anthropic,
            ProviderKind::OpenAi,
            ProviderKind::Perplexity,
            ProviderKind::HttpAgent,
        ] {
            let parsed: ProviderKind = kind.to_string().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let mut config = sample_config();
        config.provider.api_key = None;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_http_agent_allows_missing_api_key() {
        let mut config = sample_config();
        config.provider.kind = ProviderKind::HttpAgent;
        config.provider.base_url = Some("http://localhost:5000".into());
        config.provider.api_key = None;
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_schedule_rejected() {
        let mut config = sample_config();
        config.provider.tokens.step = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_zero_chunk_limit_rejected() {
        let mut config = sample_config();
        config.platform.chunk_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_system_prompt_contains_name_and_role() {
        let config = sample_config();
        let prompt = config.system_prompt();
        assert!(prompt.contains("amigo"));
        assert!(prompt.contains("Knows about infrastructure."));
    }

    #[test]
    fn test_agent_settings_defaults() {
        let settings = AgentSettings::default();
        assert_eq!(settings.shape, AgentShape::OpenAiCompatible);
        assert_eq!(settings.finish_field, "finish_reason");
        assert_eq!(settings.truncated_value, "length");
    }
}
