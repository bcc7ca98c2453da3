use std::collections::BTreeSet;
use std::env;

use tracing::info;

use crate::error::AuditError;
use crate::rules::{Artifact, RuleId};
use crate::types::{AuditResult, Violation};

pub const DEFAULT_MAX_SCENARIO_ACTORS: usize = 5;
pub const DEFAULT_CONDITION_SEVERITIES: &[&str] = &["must", "should", "may"];

/// Tunables shared by the three auditors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// LSC2 threshold on distinct actor instances per scenario.
    pub max_scenario_actors: usize,
    /// Allowed `severity` values on condition items (LOM6).
    pub condition_severities: Vec<String>,
    /// Rules whose violations are dropped and reported as not applicable.
    pub disabled_rules: BTreeSet<RuleId>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_scenario_actors: DEFAULT_MAX_SCENARIO_ACTORS,
            condition_severities: DEFAULT_CONDITION_SEVERITIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            disabled_rules: BTreeSet::new(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, AuditError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AuditConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuditError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("LUCIM_MAX_SCENARIO_ACTORS") {
            config.max_scenario_actors = raw.trim().parse().map_err(|_| {
                AuditError::Config(format!(
                    "LUCIM_MAX_SCENARIO_ACTORS must be a non-negative integer, got {raw:?}"
                ))
            })?;
        }

        if let Some(raw) = lookup("LUCIM_CONDITION_SEVERITIES") {
            let severities = split_list(&raw);
            if severities.is_empty() {
                return Err(AuditError::Config(
                    "LUCIM_CONDITION_SEVERITIES must list at least one severity".to_string(),
                ));
            }
            config.condition_severities = severities.into_iter().map(|s| s.to_lowercase()).collect();
        }

        if let Some(raw) = lookup("LUCIM_DISABLED_RULES") {
            for id in split_list(&raw) {
                config.disabled_rules.insert(id.parse()?);
            }
        }

        Ok(config)
    }

    pub fn with_disabled(mut self, rule: RuleId) -> Self {
        self.disabled_rules.insert(rule);
        self
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        !self.disabled_rules.contains(&rule)
    }

    pub fn allows_severity(&self, severity: &str) -> bool {
        let wanted = severity.trim().to_lowercase();
        self.condition_severities.iter().any(|s| *s == wanted)
    }

    /// Build the final result for one audit of `artifact`: drop violations of
    /// disabled rules and list those rules as not applicable alongside the
    /// auditor's own skipped rules.
    pub fn finish(
        &self,
        artifact: Artifact,
        violations: Vec<Violation>,
        mut not_applicable: Vec<RuleId>,
    ) -> AuditResult {
        let violations: Vec<Violation> = violations
            .into_iter()
            .filter(|v| self.is_enabled(v.id))
            .collect();
        for rule in &self.disabled_rules {
            if rule.applies_to() == artifact && !not_applicable.contains(rule) {
                not_applicable.push(*rule);
            }
        }
        AuditResult::new(violations, not_applicable)
    }

    pub fn log_summary(&self) {
        let disabled: Vec<&str> = self.disabled_rules.iter().map(|r| r.as_str()).collect();
        info!(
            max_scenario_actors = self.max_scenario_actors,
            condition_severities = %self.condition_severities.join(","),
            disabled_rules = %disabled.join(","),
            "Audit configuration"
        );
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
