//! Structured policy configuration.
//!
//! Configuration is read from TOML (a file or a string) or from an in-memory
//! JSON mapping, validated, and merged over the default policies. Problems
//! here are load-time errors; nothing is validated again per request.
//!
//! ```toml
//! mode = "warn"
//! enabled_types = ["email", "credit_card"]
//! audit_log_path = "/var/log/dlp/audit.jsonl"
//!
//! [policies.email]
//! action = "mask"
//!
//! [policies.email.models]
//! allow = ["self-hosted/.*"]
//! ```

use super::{Action, Mode, ModelRules, Policy, PolicySet};
use crate::domain::ModelPattern;
use crate::error::{DlpError, DlpResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable consulted when the configuration names no mode.
pub const MODE_ENV_VAR: &str = "DLP_GUARD_MODE";

/// Raw configuration as read from a source, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub enabled_types: Option<Vec<String>>,
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
    #[serde(default)]
    pub policies: BTreeMap<String, PolicyEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyEntry {
    pub action: Action,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub models: Option<ModelRulesEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRulesEntry {
    #[serde(default)]
    pub allow: Option<Vec<String>>,
    #[serde(default)]
    pub block: Option<Vec<String>>,
}

fn default_enabled() -> bool {
    true
}

impl PolicyConfig {
    pub fn from_toml_str(text: &str) -> DlpResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> DlpResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DlpError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            DlpError::Config { reason } => {
                DlpError::config(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Reads configuration from an in-memory mapping.
    pub fn from_value(value: serde_json::Value) -> DlpResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Validates and merges over the defaults, honoring [`MODE_ENV_VAR`].
    pub fn into_policy_set(self) -> DlpResult<PolicySet> {
        let env_mode = std::env::var(MODE_ENV_VAR).ok();
        self.resolve(env_mode.as_deref())
    }

    fn resolve(self, env_mode: Option<&str>) -> DlpResult<PolicySet> {
        let mut set = PolicySet::default();

        set.mode = match (self.mode, env_mode) {
            (Some(mode), _) => mode,
            (None, Some(raw)) => raw.parse()?,
            (None, None) => Mode::default(),
        };

        // an empty list means every category, same as leaving it out
        if let Some(types) = self.enabled_types.filter(|types| !types.is_empty()) {
            for category in &types {
                validate_category(category)?;
            }
            set.enabled_types = Some(types.into_iter().collect());
        }

        set.audit_log_path = self.audit_log_path;

        for (category, entry) in self.policies {
            validate_category(&category)?;
            set.policies.insert(category, entry.into_policy());
        }

        Ok(set)
    }
}

impl PolicyEntry {
    fn into_policy(self) -> Policy {
        Policy {
            action: self.action,
            enabled: self.enabled,
            models: self.models.map(ModelRulesEntry::into_rules),
        }
    }
}

impl ModelRulesEntry {
    fn into_rules(self) -> ModelRules {
        let compile = |patterns: Vec<String>| -> Vec<ModelPattern> {
            patterns.iter().map(|p| ModelPattern::new(p)).collect()
        };
        ModelRules {
            allow: self.allow.map(compile),
            block: self.block.map(compile),
        }
    }
}

fn validate_category(category: &str) -> DlpResult<()> {
    let valid = !category.is_empty()
        && category
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DlpError::config(format!(
            "invalid category name '{}': use lowercase letters, digits and '_'",
            category
        )))
    }
}

impl PolicySet {
    /// Loads a policy set from a TOML file.
    pub fn from_file(path: &Path) -> DlpResult<Self> {
        PolicyConfig::from_file(path)?.into_policy_set()
    }

    pub fn from_toml_str(text: &str) -> DlpResult<Self> {
        PolicyConfig::from_toml_str(text)?.into_policy_set()
    }

    pub fn from_value(value: serde_json::Value) -> DlpResult<Self> {
        PolicyConfig::from_value(value)?.into_policy_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(text: &str) -> DlpResult<PolicySet> {
        PolicyConfig::from_toml_str(text)?.resolve(None)
    }

    #[test]
    fn test_empty_config_is_defaults() {
        let set = resolve("").unwrap();
        assert_eq!(set, PolicySet::default());
    }

    #[test]
    fn test_policies_merge_over_defaults() {
        let set = resolve(
            r#"
            mode = "observe"

            [policies.email]
            action = "block"

            [policies.employee_id]
            action = "mask"
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(set.mode, Mode::Observe);
        assert_eq!(set.policy("email").map(|p| p.action), Some(Action::Block));
        assert_eq!(set.policy("employee_id").map(|p| p.enabled), Some(false));
        assert_eq!(
            set.policy("credit_card").map(|p| p.action),
            Some(Action::Block)
        );
    }

    #[test]
    fn test_model_rules_are_compiled() {
        let set = resolve(
            r#"
            [policies.email]
            action = "block"
            models = { allow = ["self-hosted/.*"], block = ["openai/(bad"] }
            "#,
        )
        .unwrap();

        let policy = set.policy("email").unwrap();
        let rules = policy.models.as_ref().unwrap();
        assert_eq!(rules.allow.as_ref().map(Vec::len), Some(1));
        assert!(!rules.block.as_ref().unwrap()[0].is_valid());
        assert!(!policy.applies_to("self-hosted/llama2"));
    }

    #[test]
    fn test_enabled_types() {
        let set = resolve(r#"enabled_types = ["email"]"#).unwrap();
        assert!(set.is_type_enabled("email"));
        assert!(!set.is_type_enabled("ssn"));
    }

    #[test]
    fn test_empty_enabled_types_enables_everything() {
        let set = resolve("enabled_types = []").unwrap();
        assert_eq!(set.enabled_types, None);
        assert!(set.is_type_enabled("ssn"));
        assert!(set.is_type_enabled("credit_card"));

        let set = PolicySet::default().with_enabled_types(Vec::<String>::new());
        assert!(set.is_type_enabled("email"));
    }

    #[test]
    fn test_unknown_action_is_error() {
        let err = resolve(
            r#"
            [policies.email]
            action = "shred"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DlpError::Config { .. }));
    }

    #[test]
    fn test_unknown_mode_is_error() {
        assert!(resolve(r#"mode = "loud""#).is_err());
    }

    #[test]
    fn test_invalid_category_name() {
        let err = resolve(
            r#"
            [policies."Credit Card"]
            action = "block"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Credit Card"));
    }

    #[test]
    fn test_env_mode_only_when_unset() {
        let set = PolicyConfig::default().resolve(Some("warn")).unwrap();
        assert_eq!(set.mode, Mode::Warn);

        let config = PolicyConfig::from_toml_str(r#"mode = "observe""#).unwrap();
        assert_eq!(config.resolve(Some("warn")).unwrap().mode, Mode::Observe);

        assert!(PolicyConfig::default().resolve(Some("nope")).is_err());
    }

    #[test]
    fn test_from_value_mapping() {
        let config = PolicyConfig::from_value(json!({
            "mode": "warn",
            "policies": { "custom_type": { "action": "block", "enabled": true } }
        }))
        .unwrap();
        let set = config.resolve(None).unwrap();
        assert_eq!(set.mode, Mode::Warn);
        assert!(set.policy("custom_type").is_some());
        assert!(set.policy("email").is_some());
    }
}
