use lucim_audit::{ScenarioAuditor, ScenarioInput};
use lucim_common::{AuditResult, Location, RuleId};
use serde_json::{json, Value};

fn model() -> Value {
    json!({
        "data": {
            "system": {"name": "System"},
            "actors": [
                {
                    "type": "ActOperator",
                    "name": "mainOperator",
                    "input_events": {
                        "ieStart": {"parameters": ["speed:int"], "postF": [{"text": "started"}]}
                    },
                    "output_events": {
                        "oeAck": {"parameters": [], "postF": [{"text": "acknowledged"}]},
                        "oeDraft": {"parameters": []}
                    }
                },
                {
                    "type": "ActViewer",
                    "name": "viewer",
                    "input_events": {
                        "ieShow": {"parameters": ["page"], "postF": [{"text": "shown"}]}
                    },
                    "output_events": {
                        "oeSeen": {"parameters": [], "postF": [{"text": "seen"}]}
                    }
                }
            ]
        }
    })
}

fn text(scenario: &str) -> AuditResult {
    ScenarioAuditor::default().audit_text(scenario, None)
}

fn text_with_model(scenario: &str) -> AuditResult {
    ScenarioAuditor::default().audit_text(scenario, Some(&model()))
}

#[test]
fn system_talking_to_itself_is_rejected() {
    let result = text("system -> system : oeLoop()");

    assert!(!result.verdict());
    assert!(result.has(RuleId::Lsc7SystemNoSelfLoop));
}

#[test]
fn one_input_and_one_output_event_is_compliant() {
    let result = text("system --> bill : ieHello()\nbill -> system : oeAck()");

    assert!(result.verdict());
}

fn exchange_with(actors: usize) -> String {
    (1..=actors)
        .map(|i| format!("system --> user{i} : ieHello()\nuser{i} -> system : oeAck()"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn five_actor_instances_are_allowed_by_default() {
    let result = text(&exchange_with(5));

    assert!(result.verdict(), "{:?}", result.violations());
}

#[test]
fn sixth_actor_instance_exceeds_the_default_limit() {
    let result = text(&exchange_with(6));

    assert_eq!(result.rule_ids(), vec![RuleId::Lsc2ActorsLimitation]);
    assert_eq!(result.count(RuleId::Lsc2ActorsLimitation), 1);
    assert_eq!(result.violations()[0].location, Location::Line(11));
    assert_eq!(result.violations()[0].extracted_values["actor_count"], 6);
    assert_eq!(result.violations()[0].extracted_values["max_actors"], 5);
}

#[test]
fn scenario_consistent_with_its_model_is_compliant() {
    let result = text_with_model("system --> mainOperator : ieStart(10)\nmainOperator -> system : oeAck()");

    assert!(result.verdict(), "{:?}", result.violations());
    assert!(result.not_applicable().is_empty());
}

#[test]
fn actor_type_is_reconstructed_from_the_instance_name() {
    let result = text_with_model("system --> operator : ieStart(1)\noperator -> system : oeAck()");

    assert!(result.verdict(), "{:?}", result.violations());
}

#[test]
fn unknown_actor_is_reported_once() {
    let result = text_with_model(
        "system --> ghost : ieStart(1)\nghost -> system : oeAck()\nsystem --> ghost : ieStart(2)",
    );

    assert_eq!(result.count(RuleId::Lsc16ActorsPersistence), 1);
    assert!(!result.has(RuleId::Lsc13ActorInstanceConsistency));
}

#[test]
fn parameter_count_must_match_the_model() {
    let result = text_with_model("system --> mainOperator : ieStart()\nmainOperator -> system : oeAck()");

    assert_eq!(result.rule_ids(), vec![RuleId::Lsc6ParametersValue]);
    let v = &result.violations()[0];
    assert_eq!(v.location, Location::Line(1));
    assert_eq!(v.extracted_values["expected"], json!(1));
    assert_eq!(v.extracted_values["actual"], json!(0));
}

#[test]
fn typed_parameters_count_like_plain_ones() {
    let result = text_with_model("system --> mainOperator : ieStart(speed:int)\nmainOperator -> system : oeAck()");

    assert!(result.verdict(), "{:?}", result.violations());
}

#[test]
fn event_without_post_f_breaks_the_sequence() {
    let result = text_with_model("system --> mainOperator : ieStart(1)\nmainOperator -> system : oeDraft()");

    assert_eq!(result.rule_ids(), vec![RuleId::Lsc5EventSequence]);
    assert_eq!(result.violations()[0].location, Location::Line(2));
}

#[test]
fn unknown_event_is_missing_from_the_catalogue() {
    let result = text_with_model("system --> mainOperator : ieMissing()\nmainOperator -> system : oeAck()");

    assert_eq!(
        result.rule_ids(),
        vec![RuleId::Lsc17EventsPersistence, RuleId::Lsc14InputEventNameConsistency]
    );
}

#[test]
fn event_owned_by_another_actor_type() {
    let result = text_with_model("system --> viewer : ieStart(1)\nviewer -> system : oeSeen()");

    assert_eq!(result.rule_ids(), vec![RuleId::Lsc13ActorInstanceConsistency]);
    assert_eq!(result.violations()[0].extracted_values["event_owner"], json!("ActOperator"));
}

#[test]
fn explicit_type_annotation_must_agree_with_the_model() {
    let result = text_with_model(
        "system --> mainOperator:ActViewer : ieStart(1)\nmainOperator -> system : oeAck()",
    );

    assert_eq!(result.rule_ids(), vec![RuleId::Lsc12ActorTypeNameConsistency]);
}

#[test]
fn event_declared_only_with_the_other_kind() {
    let scenario = json!({"scenario": {"messages": [
        {"source": "system", "target": "mainOperator", "event_type": "input_event", "event_name": "oeAck"},
        {"source": "mainOperator", "target": "system", "event_type": "output_event", "event_name": "oeAck"}
    ]}});

    let result = ScenarioAuditor::default().audit(ScenarioInput::Json(&scenario), Some(&model()));

    assert_eq!(result.rule_ids(), vec![RuleId::Lsc14InputEventNameConsistency]);
    assert_eq!(result.violations()[0].location, Location::path("scenario.messages[0]"));
}

#[test]
fn model_rules_are_skipped_not_failed_without_a_model() {
    let result = text("system --> ghost : ieNowhere(1, 2)\nghost -> system : oeNowhere()");

    assert!(result.verdict());
    for rule in RuleId::SCENARIO_MODEL_RULES {
        assert!(result.not_applicable().contains(rule), "{rule} should be not applicable");
    }
}

#[test]
fn raw_json_scenario_is_auto_detected() {
    let raw = json!({"data": {"scenario": {"messages": [
        {"source": "system", "target": "bill", "event_type": "ie", "event_name": "ieHello", "parameters": []},
        {"source": "bill", "target": "system", "event_type": "oe", "event_name": "oeAck", "parameters": []}
    ]}}})
    .to_string();

    let result = ScenarioAuditor::default().audit_text_or_json(&raw, None);

    assert!(result.verdict(), "{:?}", result.violations());
    assert!(result.not_applicable().contains(&RuleId::Lsc18EventArrowSyntax));
}

#[test]
fn fenced_json_scenario_is_flagged_and_still_audited() {
    let raw = "```json\n{\"scenario\": {\"messages\": [{\"source\": \"bill\", \"target\": \"bill\", \"event_name\": \"oeAck\"}]}}\n```";

    let result = ScenarioAuditor::default().audit_text_or_json(raw, None);

    assert!(result.has(RuleId::Lsc0JsonBlockOnly));
    assert!(result.has(RuleId::Lsc8ActorNoSelfLoop));
}

#[test]
fn raw_text_scenario_is_auto_detected() {
    let result =
        ScenarioAuditor::default().audit_text_or_json("system --> bill : ieHello({})\nbill -> system : oeAck()", None);

    assert!(result.verdict(), "{:?}", result.violations());
    assert!(!result.not_applicable().contains(&RuleId::Lsc18EventArrowSyntax));
}

#[test]
fn broken_json_is_one_format_error() {
    let result = ScenarioAuditor::default().audit_text_or_json("{\"scenario\": {\"messages\": [", None);

    assert_eq!(result.violations().len(), 1);
    assert_eq!(result.violations()[0].id, RuleId::LscFormatError);
}

#[test]
fn message_entries_missing_fields_are_skipped_with_a_format_error() {
    let scenario = json!({"scenario": {"messages": [
        {"source": "system", "target": "bill", "event_name": "ieHello"},
        {"source": "bill"},
        {"source": "bill", "target": "system", "event_name": "oeAck"}
    ]}});

    let result = ScenarioAuditor::default().audit_value(&scenario, None);

    assert_eq!(result.rule_ids(), vec![RuleId::LscFormatError]);
    assert_eq!(result.violations()[0].location, Location::path("scenario.messages[1]"));
}
