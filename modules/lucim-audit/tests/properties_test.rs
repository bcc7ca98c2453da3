use lucim_audit::{DiagramAuditor, OperationModelAuditor, ScenarioAuditor};
use lucim_common::{AuditConfig, AuditResult, RuleId};
use proptest::prelude::*;
use serde_json::Value;

fn endpoint() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("system".to_string()),
        Just("System".to_string()),
        "[a-z][a-zA-Z0-9]{0,6}",
        "[A-Z_][a-z_0-9]{0,4}",
        "[a-z]{1,5}:Act[A-Z][a-z]{0,4}",
    ]
}

/// Lines drawn from the shapes the lexer knows, plus noise.
fn diagram_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("participant System as system".to_string()),
        "participant \"[a-z]{1,4}:Act[A-Z][a-z]{0,3}\" as [a-z]{1,4}",
        "participant [A-Za-z]{1,5} as [a-zA-Z_]{1,5}",
        (endpoint(), prop_oneof![Just("->"), Just("-->")], endpoint(), "(ie|oe|xx)[A-Z][a-z]{0,5}", "[a-z ,;|\"]{0,10}")
            .prop_map(|(l, a, r, n, p)| format!("{l} {a} {r} : {n}({p})")),
        "(activate|deactivate) (system|[a-z]{1,4})",
        Just(String::new()),
        Just("' comment".to_string()),
        ".{0,20}",
    ]
}

fn diagram_text() -> impl Strategy<Value = String> {
    prop::collection::vec(diagram_line(), 0..16).prop_map(|lines| {
        let mut text = vec!["@startuml".to_string()];
        text.extend(lines);
        text.push("@enduml".to_string());
        text.join("\n")
    })
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "(System|system|Act[A-Z][a-z]{0,4}|ie[A-Z]x|oe[A-Z]x|[a-z]{0,6})".prop_map(Value::from),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::from),
            prop::collection::btree_map(
                "(system|actors|name|type|input_events|output_events|events|source|target|parameters|postF|preF|preP|text|severity|scenario|messages|event_name|event_type|data)",
                inner,
                0..6,
            )
            .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn assert_consistent(result: &AuditResult) {
    assert_eq!(result.verdict(), result.violations().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn raw_auditors_never_panic_on_arbitrary_text(raw in ".*") {
        assert_consistent(&OperationModelAuditor::default().audit_raw(&raw));
        assert_consistent(&ScenarioAuditor::default().audit_text_or_json(&raw, None));
        assert_consistent(&DiagramAuditor::default().audit_raw(&raw));
        assert_consistent(&DiagramAuditor::default().audit(&raw));
    }

    #[test]
    fn structured_auditors_never_panic_on_arbitrary_json(value in json_value(), model in json_value()) {
        assert_consistent(&OperationModelAuditor::default().audit(&value));
        assert_consistent(&ScenarioAuditor::default().audit_value(&value, Some(&model)));
        assert_consistent(&DiagramAuditor::default().audit_with_model("@startuml\n@enduml", &model));
    }

    #[test]
    fn diagram_audit_is_deterministic(text in diagram_text()) {
        let auditor = DiagramAuditor::default();

        let first = auditor.audit(&text);
        let second = auditor.audit(&text);

        prop_assert_eq!(first, second);
    }

    #[test]
    fn scenario_audit_is_deterministic(text in diagram_text(), model in json_value()) {
        let auditor = ScenarioAuditor::default();

        let first = auditor.audit_text_or_json(&text, Some(&model));
        let second = auditor.audit_text_or_json(&text, Some(&model));

        prop_assert_eq!(first, second);
    }

    #[test]
    fn disabling_a_rule_never_adds_violations(
        text in diagram_text(),
        model in json_value(),
        rule_index in 0..RuleId::ALL.len(),
    ) {
        let rule = RuleId::ALL[rule_index];
        let config = AuditConfig::default().with_disabled(rule);

        let pairs = [
            (DiagramAuditor::default().audit(&text), DiagramAuditor::new(config.clone()).audit(&text)),
            (
                ScenarioAuditor::default().audit_text(&text, Some(&model)),
                ScenarioAuditor::new(config.clone()).audit_text(&text, Some(&model)),
            ),
            (
                OperationModelAuditor::default().audit(&model),
                OperationModelAuditor::new(config.clone()).audit(&model),
            ),
        ];

        for (full, reduced) in pairs {
            prop_assert!(reduced.violations().len() <= full.violations().len());
            prop_assert!(!reduced.has(rule));
            assert_consistent(&reduced);
        }
    }
}
