//! Configuration parsing and validation for sfbd
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Stale feature branch policy definitions
//! - Daemon settings for the kubectl platform adapter
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    let config = Config::from_raw(raw);
    tracing::debug!(policy_count = config.policies.len(), "Configuration parsed");
    Ok(config)
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use sfb_util::PolicyRef;
    use std::io::Write;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [[policies]]
            name = "stale-feature-branch-operator"
            namespace = "stale-feature-branch-operator"
            namespace_substring = "-pr-"
            after_days_without_deploy = 1
        "#;

        let config = parse_config(config).unwrap();
        assert_eq!(config.policies.len(), 1);

        let reference = PolicyRef::new("stale-feature-branch-operator", "stale-feature-branch-operator");
        let policy = &config.policies[0];
        assert_eq!(policy.reference, reference);
        assert_eq!(policy.namespace_substring, "-pr-");
        assert_eq!(policy.after_days_without_deploy, 1);
        assert_eq!(policy.check_every_minutes, 30);
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_policy() {
        let config = r#"
            config_version = 1

            [[policies]]
            name = "cleanup"
            namespace_substring = ""
            after_days_without_deploy = 0
        "#;

        match parse_config(config) {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            config_version = 1

            [daemon]
            kube_context = "staging"

            [[policies]]
            name = "cleanup"
            namespace_substring = "-pr-"
            after_days_without_deploy = 7
            check_every_minutes = 5
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.daemon.kube_context.as_deref(), Some("staging"));
        assert_eq!(config.policies[0].reference, PolicyRef::named("cleanup"));
        assert_eq!(config.policies[0].check_every_minutes, 5);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
