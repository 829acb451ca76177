//! Configuration validation

use crate::schema::{RawConfig, RawPolicy};
use sfb_util::{DEFAULT_POLICY_NAMESPACE, PolicyRef};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Policy '{policy}': {message}")]
    PolicyError { policy: String, message: String },

    #[error("Duplicate policy: {0}")]
    DuplicatePolicy(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.daemon.command_timeout_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "command_timeout_seconds must be at least 1".into(),
        ));
    }

    if let Some(context) = &config.daemon.kube_context
        && context.trim().is_empty()
    {
        errors.push(ValidationError::GlobalError(
            "kube_context cannot be empty".into(),
        ));
    }

    // Check for duplicate policy references
    let mut seen = HashSet::new();
    for policy in &config.policies {
        let reference = policy_ref(policy);
        if !seen.insert(reference.clone()) {
            errors.push(ValidationError::DuplicatePolicy(reference.to_string()));
        }
    }

    for policy in &config.policies {
        errors.extend(validate_policy(policy));
    }

    errors
}

/// Reference a raw policy will be addressed by once validated
pub(crate) fn policy_ref(policy: &RawPolicy) -> PolicyRef {
    PolicyRef::new(
        policy
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_POLICY_NAMESPACE.to_string()),
        policy.name.clone(),
    )
}

fn validate_policy(policy: &RawPolicy) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let id = policy_ref(policy).to_string();
    let mut fail = |message: String| {
        errors.push(ValidationError::PolicyError {
            policy: id.clone(),
            message,
        })
    };

    if policy.name.trim().is_empty() {
        fail("name cannot be empty".into());
    }

    if policy.namespace.as_deref().is_some_and(|ns| ns.trim().is_empty()) {
        fail("namespace cannot be empty".into());
    }

    if policy.namespace_substring.is_empty() {
        fail("namespace_substring cannot be empty".into());
    }

    if let Err(message) = check_positive("after_days_without_deploy", policy.after_days_without_deploy) {
        fail(message);
    }

    if let Err(message) = check_positive("check_every_minutes", policy.check_every_minutes) {
        fail(message);
    }

    errors
}

/// Check that a TOML integer is in `1..=u32::MAX`
fn check_positive(field: &str, value: i64) -> Result<(), String> {
    if value < 1 {
        return Err(format!("{} must be at least 1, got {}", field, value));
    }
    if value > i64::from(u32::MAX) {
        return Err(format!("{} is too large: {}", field, value));
    }
    Ok(())
}
