use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rules::RuleId;

// --- Events ---

/// Direction tag of an event: IE flows System→Actor, OE flows Actor→System.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InputEvent,
    OutputEvent,
}

impl EventKind {
    /// Parse an explicit kind tag (`input_event`, `ie`, `output_event`, `oe`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "input_event" | "ie" | "input" => Some(EventKind::InputEvent),
            "output_event" | "oe" | "output" => Some(EventKind::OutputEvent),
            _ => None,
        }
    }

    /// Infer the kind from the `ie`/`oe` naming convention. The prefix is
    /// case-sensitive: `IeHello` carries no kind.
    pub fn from_event_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.starts_with("ie") {
            Some(EventKind::InputEvent)
        } else if name.starts_with("oe") {
            Some(EventKind::OutputEvent)
        } else {
            None
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            EventKind::InputEvent => "IE",
            EventKind::OutputEvent => "OE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::InputEvent => write!(f, "input_event"),
            EventKind::OutputEvent => write!(f, "output_event"),
        }
    }
}

// --- Violations ---

/// Where a violation was found: a 1-based text line or a dotted JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Location {
    Line(usize),
    Path(String),
}

impl Location {
    pub fn path(path: impl Into<String>) -> Self {
        Location::Path(path.into())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(n) => write!(f, "line {n}"),
            Location::Path(p) => write!(f, "{p}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub id: RuleId,
    pub message: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extracted_values: BTreeMap<String, Value>,
}

impl Violation {
    /// A violation carrying the catalogue's default message for `id`.
    pub fn new(id: RuleId, location: Location) -> Self {
        Self {
            id,
            message: id.message().to_string(),
            location,
            extracted_values: BTreeMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extracted_values.insert(key.to_string(), value.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.id, self.message, self.location)
    }
}

// --- Results ---

/// Outcome of one audit. `verdict` is `true` exactly when `violations` is
/// empty; the fields are private and deserialization recomputes `verdict`,
/// so that cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(from = "AuditResultDocument")]
pub struct AuditResult {
    verdict: bool,
    violations: Vec<Violation>,
    #[serde(default)]
    not_applicable: Vec<RuleId>,
}

/// Wire shape of an [`AuditResult`]. A stored `verdict` is ignored.
#[derive(Deserialize)]
struct AuditResultDocument {
    violations: Vec<Violation>,
    #[serde(default)]
    not_applicable: Vec<RuleId>,
}

impl From<AuditResultDocument> for AuditResult {
    fn from(doc: AuditResultDocument) -> Self {
        AuditResult::new(doc.violations, doc.not_applicable)
    }
}

impl AuditResult {
    pub fn new(violations: Vec<Violation>, not_applicable: Vec<RuleId>) -> Self {
        Self {
            verdict: violations.is_empty(),
            violations,
            not_applicable,
        }
    }

    pub fn verdict(&self) -> bool {
        self.verdict
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn not_applicable(&self) -> &[RuleId] {
        &self.not_applicable
    }

    pub fn has(&self, id: RuleId) -> bool {
        self.violations.iter().any(|v| v.id == id)
    }

    pub fn count(&self, id: RuleId) -> usize {
        self.violations.iter().filter(|v| v.id == id).count()
    }

    /// Distinct violated rule ids, in first-detection order.
    pub fn rule_ids(&self) -> Vec<RuleId> {
        let mut ids = Vec::new();
        for v in &self.violations {
            if !ids.contains(&v.id) {
                ids.push(v.id);
            }
        }
        ids
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}
