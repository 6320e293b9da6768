//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a configuration file without validating it.
///
/// Validation is deferred so that CLI flags and environment variables can
/// fill in fields the file leaves out.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Fill unset fields from the process environment.
///
/// Reads `HLB_API_KEY`, `AWS_REGION` (then `AWS_DEFAULT_REGION`),
/// `HLB_PARTITION`, `HLB_ENDPOINT` and `AWS_PROFILE`. Values already present win.
pub fn apply_env_overrides(config: &mut ClientConfig) {
    apply_overrides(config, |name| std::env::var(name).ok());
}

fn apply_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if config.api_key.is_empty() {
        if let Some(key) = get("HLB_API_KEY") {
            config.api_key = key;
        }
    }
    if config.region.is_empty() {
        if let Some(region) = get("AWS_REGION").or_else(|| get("AWS_DEFAULT_REGION")) {
            config.region = region;
        }
    }
    if config.partition.is_empty() {
        if let Some(partition) = get("HLB_PARTITION") {
            config.partition = partition;
        }
    }
    if config.endpoint.is_none() {
        config.endpoint = get("HLB_ENDPOINT");
    }
    if config.identity.profile.is_none() {
        config.identity.profile = get("AWS_PROFILE");
    }
}

/// Validate a fully assembled configuration.
pub fn finalize_config(config: ClientConfig) -> Result<ClientConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            api_key = "abc"
            region = "us-east-2"

            [reconcile]
            poll_min_ms = 250
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.reconcile.poll_min_ms, 250);
        assert!(finalize_config(config).is_ok());
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_fills_only_missing_fields() {
        let env: HashMap<&str, &str> = [
            ("HLB_API_KEY", "from-env"),
            ("AWS_DEFAULT_REGION", "ap-south-1"),
            ("HLB_ENDPOINT", "http://localhost:1234/v1"),
            ("AWS_PROFILE", "dev"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig {
            api_key: "from-file".into(),
            ..Default::default()
        };
        apply_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.region, "ap-south-1");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:1234/v1"));
        assert_eq!(config.identity.profile.as_deref(), Some("dev"));

        let mut pinned = ClientConfig::default();
        pinned.identity.profile = Some("prod".into());
        apply_overrides(&mut pinned, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(pinned.identity.profile.as_deref(), Some("prod"));
    }

    #[test]
    fn test_finalize_reports_validation() {
        let err = finalize_config(ClientConfig::default()).unwrap_err();
        assert!(err.to_string().starts_with("Validation failed: "));
    }
}
