//! YAML configuration loader.
//!
//! Reads the file given on the command line and deserializes it into
//! [`RelayConfig`]. A missing or unparseable file is a hard startup error:
//! this config carries provider credentials and must never be silently
//! defaulted.

use std::path::Path;

use relaybot_types::config::{ConfigError, RelayConfig};

/// Load and validate the relay configuration from `path`.
pub async fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| ConfigError::Read(format!("{}: {err}", path.display())))?;

    let config: RelayConfig = serde_yaml_ng::from_str(&content)
        .map_err(|err| ConfigError::Parse(format!("{}: {err}", path.display())))?;

    config.validate()?;
    tracing::info!(
        path = %path.display(),
        provider = %config.provider.kind,
        model = %config.provider.model,
        "configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_types::config::ProviderKind;
    use tempfile::TempDir;

    const VALID: &str = r#"
bot:
  name: amigo
provider:
  kind: anthropic
  model: claude-sonnet-4-20250514
  api_key: test-key-not-real
  tokens:
    min: 256
    max: 1024
    step: 256
platform:
  webhook_url: "http://localhost:9000/outbound"
  destination: general
"#;

    #[tokio::test]
    async fn test_load_valid_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("relaybot.yaml");
        tokio::fs::write(&path, VALID).await.unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Anthropic);
        assert_eq!(config.platform.destination, "general");
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(&tmp.path().join("nope.yaml")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }

    #[tokio::test]
    async fn test_garbage_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("relaybot.yaml");
        tokio::fs::write(&path, "not: [valid").await.unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_invalid_schedule_rejected_on_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("relaybot.yaml");
        tokio::fs::write(&path, VALID.replace("step: 256", "step: 0"))
            .await
            .unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSchedule(_)));
    }
}
