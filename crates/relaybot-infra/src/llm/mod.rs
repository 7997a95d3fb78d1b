//! Chat backend implementations.
//!
//! Contains concrete implementations of the [`ChatBackend`] trait defined
//! in `relaybot-core`, plus a factory ([`build_backend`]) that constructs
//! the right backend from [`ProviderSettings`] and optionally layers the
//! tool-augmented agent on top.

pub mod anthropic;
pub mod http_agent;
pub mod openai_compat;
pub mod tool_agent;

use secrecy::ExposeSecret;

use relaybot_core::llm::BoxChatBackend;
use relaybot_types::config::{ConfigError, ProviderKind, ProviderSettings};

use self::anthropic::AnthropicBackend;
use self::http_agent::HttpAgentBackend;
use self::openai_compat::OpenAiCompatBackend;
use self::tool_agent::{Tool, ToolAugmentedBackend};

/// Create a [`BoxChatBackend`] from provider settings.
///
/// Matches on the provider kind to construct the appropriate concrete
/// backend. When `tools_enabled` is set and `tools` is non-empty, the
/// result is wrapped in a [`ToolAugmentedBackend`].
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the kind requires an API key or
/// base URL that the settings do not carry. [`RelayConfig::validate`]
/// catches the key case earlier; the check here keeps the factory safe to
/// call on its own.
///
/// [`RelayConfig::validate`]: relaybot_types::config::RelayConfig::validate
pub fn build_backend(
    settings: &ProviderSettings,
    tools: Vec<Box<dyn Tool>>,
) -> Result<BoxChatBackend, ConfigError> {
    let backend = match settings.kind {
        ProviderKind::Anthropic => {
            let key = require_key(settings)?;
            let mut backend = AnthropicBackend::new(key.clone());
            if let Some(ref base_url) = settings.base_url {
                backend = backend.with_base_url(base_url.clone());
            }
            BoxChatBackend::new(backend)
        }
        ProviderKind::OpenAi => {
            let key = require_key(settings)?;
            let backend = match settings.base_url {
                Some(ref base_url) => {
                    OpenAiCompatBackend::new(openai_compat::config::OpenAiCompatConfig {
                        provider_name: "openai".to_string(),
                        base_url: base_url.clone(),
                        api_key: key.expose_secret().to_string(),
                    })
                }
                None => OpenAiCompatBackend::openai(key.expose_secret()),
            };
            BoxChatBackend::new(backend)
        }
        ProviderKind::Perplexity => {
            let key = require_key(settings)?;
            let backend = match settings.base_url {
                Some(ref base_url) => {
                    OpenAiCompatBackend::new(openai_compat::config::OpenAiCompatConfig {
                        provider_name: "perplexity".to_string(),
                        base_url: base_url.clone(),
                        api_key: key.expose_secret().to_string(),
                    })
                }
                None => OpenAiCompatBackend::perplexity(key.expose_secret()),
            };
            BoxChatBackend::new(backend)
        }
        ProviderKind::HttpAgent => {
            let endpoint = settings.base_url.clone().ok_or_else(|| {
                ConfigError::Invalid("provider.base_url is required for kind 'http_agent'".into())
            })?;
            let backend =
                HttpAgentBackend::new(endpoint, settings.api_key.clone(), &settings.agent);
            BoxChatBackend::new(backend)
        }
    };

    if settings.tools_enabled && !tools.is_empty() {
        return Ok(BoxChatBackend::new(ToolAugmentedBackend::new(
            backend, tools,
        )));
    }
    Ok(backend)
}

fn require_key(settings: &ProviderSettings) -> Result<&secrecy::SecretString, ConfigError> {
    settings.api_key.as_ref().ok_or_else(|| {
        ConfigError::Invalid(format!(
            "provider.api_key is required for kind '{}'",
            settings.kind
        ))
    })
}
