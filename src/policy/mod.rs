//! Per-category policy and model scoping.
//!
//! A [`PolicySet`] maps each category to a [`Policy`] and carries the global
//! operating [`Mode`]. It is built once per handler and shared read-only by
//! every request.

pub mod config;

pub use config::PolicyConfig;

use crate::domain::ModelPattern;
use crate::error::DlpError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What to do with a category when its policy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Refuse the whole request
    Block,
    /// Replace matched spans with a placeholder
    Mask,
}

/// Global operating posture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Log detections only
    Observe,
    /// Mask, and downgrade blocks to warnings
    Warn,
    /// Block and mask
    #[default]
    Enforce,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observe => "observe",
            Self::Warn => "warn",
            Self::Enforce => "enforce",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = DlpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observe" => Ok(Self::Observe),
            "warn" => Ok(Self::Warn),
            "enforce" => Ok(Self::Enforce),
            other => Err(DlpError::config(format!(
                "unknown mode '{}', expected observe, warn or enforce",
                other
            ))),
        }
    }
}

/// Allow/block lists of model patterns for one policy.
///
/// `None` for a list means the list was not configured, which is different
/// from an empty list: a configured block list turns the policy into a
/// deny-list even when it is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRules {
    pub allow: Option<Vec<ModelPattern>>,
    pub block: Option<Vec<ModelPattern>>,
}

impl ModelRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow<'a>(mut self, patterns: impl IntoIterator<Item = &'a str>) -> Self {
        self.allow = Some(patterns.into_iter().map(ModelPattern::new).collect());
        self
    }

    pub fn with_block<'a>(mut self, patterns: impl IntoIterator<Item = &'a str>) -> Self {
        self.block = Some(patterns.into_iter().map(ModelPattern::new).collect());
        self
    }
}

fn any_matches(patterns: Option<&[ModelPattern]>, model_id: &str) -> bool {
    patterns.is_some_and(|patterns| patterns.iter().any(|p| p.matches(model_id)))
}

/// The configured handling of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub action: Action,
    pub enabled: bool,
    pub models: Option<ModelRules>,
}

impl Policy {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            enabled: true,
            models: None,
        }
    }

    pub fn block() -> Self {
        Self::new(Action::Block)
    }

    pub fn mask() -> Self {
        Self::new(Action::Mask)
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_models(mut self, models: ModelRules) -> Self {
        self.models = Some(models);
        self
    }

    /// Whether this policy's action is enforced for `model_id`.
    pub fn applies_to(&self, model_id: &str) -> bool {
        should_apply(self, model_id)
    }
}

/// Decides whether a policy applies to a model.
///
/// In order, first match wins:
/// 1. no model rules: applies
/// 2. model matches the block list: applies, even if also allow-listed
/// 3. model matches the allow list: exempt
/// 4. otherwise applies only when no block list was configured
pub fn should_apply(policy: &Policy, model_id: &str) -> bool {
    let Some(models) = &policy.models else {
        return true;
    };

    if any_matches(models.block.as_deref(), model_id) {
        return true;
    }

    if any_matches(models.allow.as_deref(), model_id) {
        return false;
    }

    models.block.is_none()
}

/// Categories blocked by default.
pub const DEFAULT_BLOCKED: &[&str] = &[
    "credit_card",
    "ssn",
    "api_key",
    "pem_key",
    "jwt_token",
    "database_url",
    "cloud_credential",
];

/// Categories masked by default.
pub const DEFAULT_MASKED: &[&str] = &["email", "phone"];

/// Every category policy plus the global mode.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySet {
    pub mode: Mode,
    /// `None` enables every category
    pub enabled_types: Option<BTreeSet<String>>,
    pub policies: BTreeMap<String, Policy>,
    pub audit_log_path: Option<PathBuf>,
}

impl Default for PolicySet {
    fn default() -> Self {
        let policies = DEFAULT_BLOCKED
            .iter()
            .map(|c| (c.to_string(), Policy::block()))
            .chain(DEFAULT_MASKED.iter().map(|c| (c.to_string(), Policy::mask())))
            .collect();

        Self {
            mode: Mode::default(),
            enabled_types: None,
            policies,
            audit_log_path: None,
        }
    }
}

impl PolicySet {
    /// A set with no policies at all.
    pub fn empty(mode: Mode) -> Self {
        Self {
            mode,
            enabled_types: None,
            policies: BTreeMap::new(),
            audit_log_path: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_policy(mut self, category: impl Into<String>, policy: Policy) -> Self {
        self.policies.insert(category.into(), policy);
        self
    }

    /// Restricts inspection to the named categories. An empty list enables all.
    pub fn with_enabled_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: BTreeSet<String> = types.into_iter().map(Into::into).collect();
        self.enabled_types = (!types.is_empty()).then_some(types);
        self
    }

    pub fn policy(&self, category: &str) -> Option<&Policy> {
        self.policies.get(category)
    }

    pub fn is_type_enabled(&self, category: &str) -> bool {
        self.enabled_types
            .as_ref()
            .map_or(true, |types| types.contains(category))
    }

    /// The policy to enforce for `category` on `model_id`, if any.
    ///
    /// Returns `None` for unknown categories, disabled policies, and
    /// models the policy is scoped away from.
    pub fn applicable(&self, category: &str, model_id: &str) -> Option<&Policy> {
        self.policy(category)
            .filter(|policy| policy.enabled && should_apply(policy, model_id))
    }
}
