use lucim_audit::{fix_suggestion, FixSuggestion};
use lucim_common::{Artifact, AuditResult, RuleDefinition, RuleId, RULE_CATALOGUE_VERSION};
use serde::Serialize;

/// JSON document printed for one audit.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub artifact: Artifact,
    pub rule_catalogue_version: u32,
    #[serde(flatten)]
    pub result: &'a AuditResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_suggestions: Option<Vec<FixSuggestion>>,
}

impl<'a> Report<'a> {
    pub fn new(artifact: Artifact, result: &'a AuditResult, suggest: bool) -> Self {
        let fix_suggestions = suggest.then(|| result.violations().iter().map(fix_suggestion).collect());
        Self {
            artifact,
            rule_catalogue_version: RULE_CATALOGUE_VERSION,
            result,
            fix_suggestions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Catalogue {
    pub version: u32,
    pub rules: Vec<RuleDefinition>,
}

impl Catalogue {
    pub fn current() -> Self {
        Self {
            version: RULE_CATALOGUE_VERSION,
            rules: RuleId::ALL.iter().map(|r| r.definition()).collect(),
        }
    }
}

pub fn to_json<T: Serialize>(value: &T, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}
