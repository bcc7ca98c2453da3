//! Deterministic fix hints attached to violations on request.

use std::fmt;

use lucim_common::{capitalize_first, Location, RuleId, Violation};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Retype,
    ReverseDirection,
    Add,
    Delete,
    Other,
}

impl ChangeType {
    /// Classify by the family keyword carried in the rule id.
    pub fn for_rule(rule: RuleId) -> Self {
        let id = rule.as_str();
        if id.contains("FORMAT") {
            ChangeType::Retype
        } else if id.contains("DIRECTION") {
            ChangeType::ReverseDirection
        } else if id.contains("LIMITATION") || id.contains("CONDITIONS") {
            ChangeType::Add
        } else if id.contains("BLOCK-ONLY") {
            ChangeType::Delete
        } else {
            ChangeType::Other
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Retype => "retype",
            ChangeType::ReverseDirection => "reverse_direction",
            ChangeType::Add => "add",
            ChangeType::Delete => "delete",
            ChangeType::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct FixSuggestion {
    pub rule: RuleId,
    pub location: Location,
    pub change_type: ChangeType,
    pub proposed_change: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_after: Option<String>,
    pub rationale: String,
}

fn value<'a>(violation: &'a Violation, key: &str) -> &'a str {
    violation
        .extracted_values
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_lowercase()
            .chain(chars.filter(|c| c.is_alphanumeric()))
            .collect(),
        None => String::new(),
    }
}

/// Derive a fix hint from a violation. Pure: the same violation always
/// yields the same suggestion.
pub fn fix_suggestion(violation: &Violation) -> FixSuggestion {
    let rule = violation.id;
    let (proposed_change, before, after): (String, Option<String>, Option<String>) = match rule {
        RuleId::Lom0JsonBlockOnly | RuleId::Lsc0JsonBlockOnly => (
            "Remove Markdown code fences and any text outside the JSON object.".into(),
            Some("```json\n{...}\n```".into()),
            Some("{...}".into()),
        ),
        RuleId::Ldr0PlantumlBlockOnly => (
            "Remove Markdown code fences and any text outside @startuml ... @enduml.".into(),
            Some("```plantuml\n@startuml\n...\n@enduml\n```".into()),
            Some("@startuml\n...\n@enduml".into()),
        ),
        RuleId::Lom1ActTypeFormat => {
            let name = value(violation, "type_name");
            let fixed = format!("Act{}", capitalize_first(name.trim_start_matches("Act")));
            (
                format!("Rename the actor type to \"{fixed}\"."),
                Some(name.to_string()),
                Some(fixed),
            )
        }
        RuleId::Lom2IeEventNameFormat | RuleId::Lom3OeEventNameFormat => {
            let name = value(violation, "event_name");
            (
                "Rename the event to camelCase.".into(),
                Some(name.to_string()),
                Some(camel(name)),
            )
        }
        RuleId::Lom4IeEventDirection | RuleId::Lsc9InputEventAllowedEvents => (
            "Make the input event flow from the System to the actor.".into(),
            Some(format!("{} -> {}", value(violation, "source"), value(violation, "target"))),
            Some(format!("System -> {}", value(violation, "source"))),
        ),
        RuleId::Lom5OeEventDirection | RuleId::Lsc10OutputEventDirection => (
            "Make the output event flow from the actor to the System.".into(),
            Some(format!("{} -> {}", value(violation, "source"), value(violation, "target"))),
            Some(format!("{} -> System", value(violation, "target"))),
        ),
        RuleId::Lom7ConditionsValidation | RuleId::Lsc5EventSequence => (
            "Add a non-empty postF array describing the event's effect.".into(),
            None,
            Some("\"postF\": [{\"text\": \"...\"}]".into()),
        ),
        RuleId::Lom10SysUnique | RuleId::Ldr1SysUnique => (
            "Declare exactly one System participant.".into(),
            None,
            Some("participant System as system".into()),
        ),
        RuleId::Lsc2ActorsLimitation => (
            "Reduce the number of distinct actor instances in the scenario.".into(),
            None,
            None,
        ),
        RuleId::Lsc3InputEventsLimitation => (
            format!("Add an input event from the System to \"{}\".", value(violation, "actor_instance")),
            None,
            Some(format!("system --> {} : ieEvent()", value(violation, "actor_instance"))),
        ),
        RuleId::Lsc4OutputEventsLimitation => (
            format!("Add an output event from \"{}\" to the System.", value(violation, "actor_instance")),
            None,
            Some(format!("{} -> system : oeEvent()", value(violation, "actor_instance"))),
        ),
        RuleId::Lsc11ActorInstanceFormat | RuleId::Ldr27ActorInstanceFormat => {
            let name = match value(violation, "actor_instance") {
                "" => value(violation, "alias"),
                name => name,
            };
            (
                "Rename the actor instance to camelCase.".into(),
                Some(name.to_string()),
                Some(camel(name)),
            )
        }
        RuleId::Ldr10ActivationBarOnSystemForbidden => (
            "Delete the activation on the System lifeline.".into(),
            Some("activate system".into()),
            None,
        ),
        RuleId::Ldr3SystemDeclaredFirst | RuleId::Ldr2ActorDeclaredAfterSystem => (
            "Move the System declaration above every actor declaration.".into(),
            None,
            Some("participant System as system".into()),
        ),
        RuleId::Ldr7ActivationBarSequence | RuleId::Ldr20ActivationBarSequence => {
            let p = value(violation, "participant");
            (
                format!("Follow each event on \"{p}\" immediately with activate/deactivate {p}."),
                None,
                Some(format!("activate {p}\ndeactivate {p}")),
            )
        }
        RuleId::Ldr17ActorDeclarationSyntax => {
            let alias = value(violation, "alias");
            (
                "Declare the actor as participant \"instance:ActType\" as instance.".into(),
                Some(format!("participant {} as {alias}", value(violation, "label"))),
                Some(format!("participant \"{alias}:ActType\" as {alias}")),
            )
        }
        RuleId::Ldr23EventParameterCommaSeparated => (
            "Separate parameters with commas only.".into(),
            Some(value(violation, "parameters").to_string()),
            None,
        ),
        _ => (
            format!("Revise the artifact at {} to satisfy {}.", violation.location, rule),
            None,
            None,
        ),
    };

    FixSuggestion {
        rule,
        location: violation.location.clone(),
        change_type: ChangeType::for_rule(rule),
        proposed_change,
        example_before: before.filter(|s| !s.is_empty()),
        example_after: after.filter(|s| !s.is_empty()),
        rationale: violation.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_types_follow_rule_families() {
        assert_eq!(ChangeType::for_rule(RuleId::Lom1ActTypeFormat), ChangeType::Retype);
        assert_eq!(ChangeType::for_rule(RuleId::LdrFormatError), ChangeType::Retype);
        assert_eq!(ChangeType::for_rule(RuleId::Lom4IeEventDirection), ChangeType::ReverseDirection);
        assert_eq!(ChangeType::for_rule(RuleId::Lsc2ActorsLimitation), ChangeType::Add);
        assert_eq!(ChangeType::for_rule(RuleId::Lom7ConditionsValidation), ChangeType::Add);
        assert_eq!(ChangeType::for_rule(RuleId::Ldr0PlantumlBlockOnly), ChangeType::Delete);
        assert_eq!(ChangeType::for_rule(RuleId::Ldr9ActivationBarOverlappingForbidden), ChangeType::Other);
    }

    #[test]
    fn actor_type_rename() {
        let v = Violation::new(RuleId::Lom1ActTypeFormat, Location::path("actors.operator"))
            .with_value("type_name", "operator");
        let s = fix_suggestion(&v);
        assert_eq!(s.example_after.as_deref(), Some("ActOperator"));
        assert_eq!(s.location, Location::path("actors.operator"));
        assert_eq!(s.rationale, RuleId::Lom1ActTypeFormat.message());
    }

    #[test]
    fn fallback_mentions_location() {
        let v = Violation::new(RuleId::Ldr9ActivationBarOverlappingForbidden, Location::Line(7));
        let s = fix_suggestion(&v);
        assert!(s.proposed_change.contains('7'));
        assert!(s.example_before.is_none());
    }

    #[test]
    fn serializes_change_type_in_snake_case() {
        let v = Violation::new(RuleId::Lsc10OutputEventDirection, Location::Line(2))
            .with_value("source", "system")
            .with_value("target", "bill");
        let json = serde_json::to_value(fix_suggestion(&v)).unwrap();
        assert_eq!(json["change_type"], "reverse_direction");
        assert_eq!(json["rule"], "LSC10-OUTPUT-EVENT-DIRECTION");
        assert_eq!(json["example_after"], "bill -> System");
    }
}
