//! Scenario auditor (LSC rules).
//!
//! Both input forms are normalized into one ordered [`ScenarioMessage`] list.
//! A single forward pass applies the per-message direction rules and tallies
//! input/output events per actor; the sequence-level limits are checked after
//! it. When an operation model is supplied, a second pass cross-references
//! every message against a [`ModelIndex`].

use lucim_common::{
    is_camel_case, is_system_token, Artifact, AuditConfig, AuditResult, EventKind, Location,
    RuleId, Violation,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::block::{check_json_block_only, json_object_span, strip_fences};
use crate::model::{str_field, strip_annotation, ModelIndex};
use crate::plantuml::{lex, split_params, Arrow, Line};

/// A scenario as handed to the auditor.
#[derive(Debug, Clone, Copy)]
pub enum ScenarioInput<'a> {
    Json(&'a Value),
    Text(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    instance: String,
    /// Explicit `instance:ActType` annotation, if any.
    declared_type: Option<String>,
}

impl Endpoint {
    fn parse(token: &str) -> Self {
        match token.trim().split_once(':') {
            Some((instance, ty)) if !ty.trim().is_empty() => Endpoint {
                instance: instance.trim().to_string(),
                declared_type: Some(ty.trim().to_string()),
            },
            _ => Endpoint {
                instance: token.trim().trim_end_matches(':').to_string(),
                declared_type: None,
            },
        }
    }

    fn is_system(&self) -> bool {
        is_system_token(&self.instance)
    }
}

/// One message in normalized form.
#[derive(Debug, Clone)]
struct ScenarioMessage {
    location: Location,
    source: Endpoint,
    target: Endpoint,
    name: String,
    kind: Option<EventKind>,
    /// Only the text form draws arrows.
    arrow: Option<Arrow>,
    param_count: usize,
}

impl ScenarioMessage {
    /// The single actor endpoint of a well-formed message: the target of an
    /// input event, the source of an output event.
    fn actor(&self) -> Option<&Endpoint> {
        match (self.source.is_system(), self.target.is_system()) {
            (true, false) => Some(&self.target),
            (false, true) => Some(&self.source),
            _ => None,
        }
    }
}

/// Per-actor bookkeeping across the message sequence.
#[derive(Debug, Clone)]
struct ActorTally {
    instance: String,
    first_seen: Location,
    declared_type: Option<String>,
    input_events: usize,
    output_events: usize,
}

struct Tallies(Vec<ActorTally>);

impl Tallies {
    fn touch(&mut self, endpoint: &Endpoint, location: &Location) -> (&mut ActorTally, bool) {
        let pos = self.0.iter().position(|t| t.instance == endpoint.instance);
        let is_new = pos.is_none();
        let pos = pos.unwrap_or_else(|| {
            self.0.push(ActorTally {
                instance: endpoint.instance.clone(),
                first_seen: location.clone(),
                declared_type: None,
                input_events: 0,
                output_events: 0,
            });
            self.0.len() - 1
        });
        let tally = &mut self.0[pos];
        if tally.declared_type.is_none() {
            tally.declared_type = endpoint.declared_type.clone();
        }
        (tally, is_new)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioAuditor {
    config: AuditConfig,
}

impl ScenarioAuditor {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn audit(&self, scenario: ScenarioInput<'_>, model: Option<&Value>) -> AuditResult {
        match scenario {
            ScenarioInput::Json(value) => self.audit_value(value, model),
            ScenarioInput::Text(text) => self.audit_text(text, model),
        }
    }

    /// Audit a pre-parsed JSON scenario.
    pub fn audit_value(&self, value: &Value, model: Option<&Value>) -> AuditResult {
        let mut violations = Vec::new();
        let messages = parse_json(value, &mut violations);
        self.run(messages, violations, model, false)
    }

    /// Audit the line-oriented text form.
    pub fn audit_text(&self, text: &str, model: Option<&Value>) -> AuditResult {
        let mut violations = Vec::new();
        let messages = parse_text(text, &mut violations);
        self.run(messages, violations, model, true)
    }

    /// Auto-detect the form of raw generator output: JSON first, falling back
    /// to the text form. Markdown fences and prose around a JSON scenario are
    /// flagged (LSC0) and stripped before parsing.
    pub fn audit_text_or_json(&self, raw: &str, model: Option<&Value>) -> AuditResult {
        let body = strip_fences(raw);
        let trimmed = body.trim();
        let starts_json = trimmed.starts_with('{') || trimmed.starts_with('[');
        let has_message_lines = lex(&body).iter().any(|l| matches!(l.kind, Line::Message(_)));

        if starts_json || !has_message_lines {
            let candidate = if trimmed.starts_with('[') {
                trimmed
            } else {
                json_object_span(&body)
            };
            match serde_json::from_str::<Value>(candidate) {
                Ok(value) => {
                    let mut violations = check_json_block_only(raw, RuleId::Lsc0JsonBlockOnly);
                    let messages = parse_json(&value, &mut violations);
                    return self.run(messages, violations, model, false);
                }
                Err(e) if starts_json => {
                    warn!(error = %e, "Scenario looks like JSON but does not parse");
                    let violation = Violation::new(RuleId::LscFormatError, Location::path("raw_content"))
                        .with_message(format!("The Scenario is not valid JSON: {e}"))
                        .with_value("json_error", e.to_string());
                    return self.run(Vec::new(), vec![violation], model, false);
                }
                Err(_) => {}
            }
        }

        let mut violations = Vec::new();
        if raw.contains("```") {
            violations.extend(check_json_block_only(raw, RuleId::Lsc0JsonBlockOnly));
        }
        let messages = parse_text(&body, &mut violations);
        self.run(messages, violations, model, true)
    }

    fn run(
        &self,
        messages: Vec<ScenarioMessage>,
        mut violations: Vec<Violation>,
        model: Option<&Value>,
        text_form: bool,
    ) -> AuditResult {
        let tallies = self.forward_pass(&messages, &mut violations);
        self.check_limits(&tallies, &mut violations);

        let mut not_applicable = Vec::new();
        if !text_form {
            not_applicable.push(RuleId::Lsc18EventArrowSyntax);
        }
        match model {
            Some(model) => cross_reference(&messages, &tallies, &ModelIndex::build(model), &mut violations),
            None => not_applicable.extend_from_slice(RuleId::SCENARIO_MODEL_RULES),
        }

        let result = self.config.finish(Artifact::Scenario, violations, not_applicable);
        debug!(
            messages = messages.len(),
            actors = tallies.0.len(),
            verdict = result.verdict(),
            violations = result.violations().len(),
            "Scenario audited"
        );
        result
    }

    /// Per-message direction rules, with IE/OE tallies per actor.
    fn forward_pass(&self, messages: &[ScenarioMessage], v: &mut Vec<Violation>) -> Tallies {
        let mut tallies = Tallies(Vec::new());

        for msg in messages {
            let source_sys = msg.source.is_system();
            let target_sys = msg.target.is_system();
            let describe = |violation: Violation| {
                violation
                    .with_value("source", msg.source.instance.as_str())
                    .with_value("target", msg.target.instance.as_str())
                    .with_value("event_name", msg.name.as_str())
            };

            if source_sys && target_sys {
                v.push(describe(Violation::new(RuleId::Lsc7SystemNoSelfLoop, msg.location.clone())));
            }
            if !source_sys && !target_sys {
                v.push(describe(Violation::new(RuleId::Lsc8ActorNoSelfLoop, msg.location.clone())));
            }
            if source_sys == target_sys {
                v.push(describe(Violation::new(RuleId::Lsc1MessageDirectionality, msg.location.clone())));
            }

            match msg.kind {
                Some(EventKind::InputEvent) => {
                    if !(source_sys && !target_sys) {
                        v.push(describe(Violation::new(RuleId::Lsc9InputEventAllowedEvents, msg.location.clone())));
                    }
                    if msg.arrow.is_some_and(|a| a != Arrow::Dashed) {
                        v.push(
                            describe(Violation::new(RuleId::Lsc18EventArrowSyntax, msg.location.clone()))
                                .with_message("Input events must be drawn with a dashed arrow (-->).")
                                .with_value("arrow", msg.arrow.map(Arrow::as_str).unwrap_or_default()),
                        );
                    }
                }
                Some(EventKind::OutputEvent) => {
                    if !(!source_sys && target_sys) {
                        v.push(describe(Violation::new(RuleId::Lsc10OutputEventDirection, msg.location.clone())));
                    }
                    if msg.arrow.is_some_and(|a| a != Arrow::Solid) {
                        v.push(
                            describe(Violation::new(RuleId::Lsc18EventArrowSyntax, msg.location.clone()))
                                .with_message("Output events must be drawn with a continuous arrow (->).")
                                .with_value("arrow", msg.arrow.map(Arrow::as_str).unwrap_or_default()),
                        );
                    }
                }
                None => {}
            }

            for endpoint in [&msg.source, &msg.target] {
                if endpoint.is_system() {
                    continue;
                }
                let (_, is_new) = tallies.touch(endpoint, &msg.location);
                if is_new && !is_camel_case(&endpoint.instance) {
                    v.push(
                        Violation::new(RuleId::Lsc11ActorInstanceFormat, msg.location.clone())
                            .with_value("actor_instance", endpoint.instance.as_str()),
                    );
                }
            }

            match (msg.kind, source_sys, target_sys) {
                (Some(EventKind::InputEvent), true, false) => {
                    tallies.touch(&msg.target, &msg.location).0.input_events += 1;
                }
                (Some(EventKind::OutputEvent), false, true) => {
                    tallies.touch(&msg.source, &msg.location).0.output_events += 1;
                }
                _ => {}
            }
        }

        tallies
    }

    /// LSC2, LSC3, LSC4 over the whole sequence.
    fn check_limits(&self, tallies: &Tallies, v: &mut Vec<Violation>) {
        let max = self.config.max_scenario_actors;
        if tallies.0.len() > max {
            let first_excess = &tallies.0[max];
            let instances: Vec<&str> = tallies.0.iter().map(|t| t.instance.as_str()).collect();
            v.push(
                Violation::new(RuleId::Lsc2ActorsLimitation, first_excess.first_seen.clone())
                    .with_message(format!(
                        "A scenario must involve at most {max} actor instances; found {}.",
                        tallies.0.len()
                    ))
                    .with_value("actor_count", tallies.0.len())
                    .with_value("max_actors", max)
                    .with_value("actors", instances),
            );
        }
        for tally in &tallies.0 {
            if tally.input_events == 0 {
                v.push(
                    Violation::new(RuleId::Lsc3InputEventsLimitation, tally.first_seen.clone())
                        .with_value("actor_instance", tally.instance.as_str()),
                );
            }
            if tally.output_events == 0 {
                v.push(
                    Violation::new(RuleId::Lsc4OutputEventsLimitation, tally.first_seen.clone())
                        .with_value("actor_instance", tally.instance.as_str()),
                );
            }
        }
    }
}

// --- Cross-reference ---

fn cross_reference(messages: &[ScenarioMessage], tallies: &Tallies, index: &ModelIndex, v: &mut Vec<Violation>) {
    // Actor types, resolved once per instance.
    let mut resolved: Vec<(String, Option<String>)> = Vec::new();
    for tally in &tallies.0 {
        let inferred = index.infer_type(&tally.instance).map(str::to_string);
        let effective = inferred.clone().or_else(|| {
            tally
                .declared_type
                .clone()
                .filter(|t| index.has_type(t))
        });

        if let Some(declared) = &tally.declared_type {
            let consistent = index.has_type(declared) && inferred.as_deref().is_none_or(|i| i == declared.as_str());
            if !consistent {
                v.push(
                    Violation::new(RuleId::Lsc12ActorTypeNameConsistency, tally.first_seen.clone())
                        .with_value("actor_instance", tally.instance.as_str())
                        .with_value("declared_type", declared.as_str())
                        .with_value("model_type", inferred.clone().map_or(Value::Null, Value::from)),
                );
            }
        }
        if effective.is_none() {
            v.push(
                Violation::new(RuleId::Lsc16ActorsPersistence, tally.first_seen.clone())
                    .with_value("actor_instance", tally.instance.as_str()),
            );
        }
        resolved.push((tally.instance.clone(), effective));
    }
    let type_of = |instance: &str| -> Option<&str> {
        resolved
            .iter()
            .find(|(i, _)| i == instance)
            .and_then(|(_, t)| t.as_deref())
    };

    for msg in messages {
        if msg.name.is_empty() {
            continue;
        }
        let name_rule = |kind: Option<EventKind>| match kind {
            Some(EventKind::InputEvent) => Some(RuleId::Lsc14InputEventNameConsistency),
            Some(EventKind::OutputEvent) => Some(RuleId::Lsc15OutputEventNameConsistency),
            None => None,
        };

        let definitions = index.event(&msg.name);
        if definitions.is_empty() {
            v.push(
                Violation::new(RuleId::Lsc17EventsPersistence, msg.location.clone())
                    .with_value("event_name", msg.name.as_str()),
            );
            if let Some(rule) = name_rule(msg.kind) {
                v.push(Violation::new(rule, msg.location.clone()).with_value("event_name", msg.name.as_str()));
            }
            continue;
        }

        let actor_type = msg.actor().and_then(|a| type_of(&a.instance));
        let definition = match msg.kind {
            Some(kind) => match index.event_of_kind(&msg.name, kind, actor_type) {
                Some(def) => def,
                None => {
                    if let Some(rule) = name_rule(msg.kind) {
                        v.push(
                            Violation::new(rule, msg.location.clone())
                                .with_message(format!(
                                    "\"{}\" is declared in the Operation Model, but not as an {}.",
                                    msg.name, kind
                                ))
                                .with_value("event_name", msg.name.as_str()),
                        );
                    }
                    continue;
                }
            },
            None => &definitions[0],
        };

        if let (Some(actor), Some(actor_type), Some(owner)) = (msg.actor(), actor_type, definition.owner.as_deref()) {
            if actor_type != owner {
                v.push(
                    Violation::new(RuleId::Lsc13ActorInstanceConsistency, msg.location.clone())
                        .with_value("actor_instance", actor.instance.as_str())
                        .with_value("actor_type", actor_type)
                        .with_value("event_owner", owner)
                        .with_value("event_name", msg.name.as_str()),
                );
            }
        }

        if msg.param_count != definition.param_count {
            v.push(
                Violation::new(RuleId::Lsc6ParametersValue, msg.location.clone())
                    .with_value("event_name", msg.name.as_str())
                    .with_value("expected", definition.param_count)
                    .with_value("actual", msg.param_count),
            );
        }

        if !definition.has_post_f {
            v.push(
                Violation::new(RuleId::Lsc5EventSequence, msg.location.clone())
                    .with_value("event_name", msg.name.as_str()),
            );
        }
    }
}

// --- Parsing ---

fn parse_text(text: &str, v: &mut Vec<Violation>) -> Vec<ScenarioMessage> {
    let messages: Vec<ScenarioMessage> = lex(text)
        .into_iter()
        .filter_map(|line| match line.kind {
            Line::Message(m) => Some(ScenarioMessage {
                location: Location::Line(line.number),
                source: Endpoint::parse(&m.lhs),
                target: Endpoint::parse(&m.rhs),
                kind: EventKind::from_event_name(&m.name),
                name: m.name,
                arrow: Some(m.arrow),
                param_count: count_params(split_params(&m.params).iter().map(String::as_str)),
            }),
            _ => None,
        })
        .collect();

    if messages.is_empty() {
        warn!("Scenario text contains no message lines");
        v.push(
            Violation::new(RuleId::LscFormatError, Location::Line(1))
                .with_message("No scenario message found (expected: lhs -> rhs : eventName(params)).")
                .with_value("content_preview", text.chars().take(200).collect::<String>()),
        );
    }
    messages
}

fn parse_json(value: &Value, v: &mut Vec<Violation>) -> Vec<ScenarioMessage> {
    let (base, scenario) = match value.get("data").filter(|d| d.is_object()) {
        Some(data) => ("data.scenario", data.get("scenario")),
        None => ("scenario", value.get("scenario")),
    };
    let Some(items) = scenario.and_then(|s| s.get("messages")).and_then(Value::as_array) else {
        warn!("Scenario JSON has no scenario.messages array");
        v.push(
            Violation::new(RuleId::LscFormatError, Location::path("$"))
                .with_message("Expected {\"data\": {\"scenario\": {\"messages\": [...]}}} or {\"scenario\": {\"messages\": [...]}}."),
        );
        return Vec::new();
    };

    let mut messages = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let path = format!("{base}.messages[{i}]");
        let source = str_field(item, "source").or_else(|| str_field(item, "sender"));
        let target = str_field(item, "target").or_else(|| str_field(item, "receiver"));
        let name = str_field(item, "event_name").or_else(|| str_field(item, "name"));
        let (Some(source), Some(target), Some(name)) = (source, target, name) else {
            v.push(
                Violation::new(RuleId::LscFormatError, Location::path(&path))
                    .with_message("Each message must be an object with string \"source\", \"target\" and \"event_name\".")
                    .with_value("message", item.clone()),
            );
            continue;
        };
        let kind = str_field(item, "event_type")
            .and_then(EventKind::from_tag)
            .or_else(|| EventKind::from_event_name(name));
        messages.push(ScenarioMessage {
            location: Location::path(path),
            source: Endpoint::parse(source),
            target: Endpoint::parse(target),
            name: name.trim().to_string(),
            kind,
            arrow: None,
            param_count: json_param_count(item.get("parameters")),
        });
    }
    messages
}

fn json_param_count(params: Option<&Value>) -> usize {
    match params {
        None | Some(Value::Null) => 0,
        Some(Value::Array(items)) => items
            .iter()
            .filter(|p| match p {
                Value::String(s) => !strip_annotation(s).is_empty(),
                Value::Null => false,
                _ => true,
            })
            .count(),
        Some(Value::String(s)) => count_params(split_params(s).iter().map(String::as_str)),
        Some(_) => 1,
    }
}

fn count_params<'a>(items: impl Iterator<Item = &'a str>) -> usize {
    items.filter(|p| !strip_annotation(p).is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> AuditResult {
        ScenarioAuditor::default().audit_text(s, None)
    }

    #[test]
    fn system_self_loop() {
        let result = text("system -> system : oeLoop()");
        assert!(!result.verdict());
        assert!(result.has(RuleId::Lsc7SystemNoSelfLoop));
        assert!(result.has(RuleId::Lsc1MessageDirectionality));
    }

    #[test]
    fn minimal_exchange_passes() {
        let result = text("system --> bill : ieHello()\nbill -> system : oeAck()");
        assert!(result.verdict(), "{:?}", result.violations());
    }

    #[test]
    fn actor_to_actor() {
        let result = text("bill -> ann : oeChat()");
        assert!(result.has(RuleId::Lsc8ActorNoSelfLoop));
        assert!(result.has(RuleId::Lsc10OutputEventDirection));
    }

    #[test]
    fn wrong_direction_for_kind() {
        let result = text("bill --> system : ieHello()\nsystem -> bill : oeAck()");
        assert!(result.has(RuleId::Lsc9InputEventAllowedEvents));
        assert!(result.has(RuleId::Lsc10OutputEventDirection));
        // neither event counts towards bill's tallies
        assert!(result.has(RuleId::Lsc3InputEventsLimitation));
        assert!(result.has(RuleId::Lsc4OutputEventsLimitation));
    }

    #[test]
    fn arrow_style_is_its_own_rule() {
        let result = text("system -> bill : ieHello()\nbill --> system : oeAck()");
        assert_eq!(result.count(RuleId::Lsc18EventArrowSyntax), 2);
        assert!(!result.has(RuleId::Lsc9InputEventAllowedEvents));
        assert!(!result.has(RuleId::Lsc10OutputEventDirection));
    }

    #[test]
    fn instance_format_reported_once_per_actor() {
        let result = text(
            "system --> Bill_1 : ieHello()\nBill_1 -> system : oeAck()\nsystem --> Bill_1 : ieBye()",
        );
        assert_eq!(result.count(RuleId::Lsc11ActorInstanceFormat), 1);
    }

    #[test]
    fn coverage_per_actor() {
        let result = text("system --> bill : ieHello()\nann -> system : oeAck()");
        assert_eq!(result.count(RuleId::Lsc3InputEventsLimitation), 1);
        assert_eq!(result.count(RuleId::Lsc4OutputEventsLimitation), 1);
        assert_eq!(result.violations()[0].location, Location::Line(1));
    }

    #[test]
    fn actor_limit_is_configurable() {
        let lines: Vec<String> = ["a", "b", "c"]
            .iter()
            .flat_map(|a| [format!("system --> {a} : ieHi()"), format!("{a} -> system : oeOk()")])
            .collect();
        let scenario = lines.join("\n");
        assert!(text(&scenario).verdict());

        let config = AuditConfig {
            max_scenario_actors: 2,
            ..AuditConfig::default()
        };
        let result = ScenarioAuditor::new(config).audit_text(&scenario, None);
        assert_eq!(result.rule_ids(), vec![RuleId::Lsc2ActorsLimitation]);
        assert_eq!(result.violations()[0].location, Location::Line(5));
    }

    #[test]
    fn text_without_messages_is_a_format_error() {
        assert_eq!(text("hello there").rule_ids(), vec![RuleId::LscFormatError]);
        assert_eq!(text("").rule_ids(), vec![RuleId::LscFormatError]);
    }

    #[test]
    fn model_rules_are_not_applicable_without_model() {
        let result = text("system --> bill : ieHello()\nbill -> system : oeAck()");
        for rule in RuleId::SCENARIO_MODEL_RULES {
            assert!(result.not_applicable().contains(rule));
        }
        assert!(!result.not_applicable().contains(&RuleId::Lsc18EventArrowSyntax));
    }

    #[test]
    fn json_messages_carry_paths() {
        let scenario = json!({"data": {"scenario": {"messages": [
            {"source": "system", "target": "bill", "event_type": "input_event", "event_name": "ieHello", "parameters": []},
            {"source": "bill", "target": "bill", "event_type": "output_event", "event_name": "oeAck"}
        ]}}});
        let result = ScenarioAuditor::default().audit_value(&scenario, None);
        let self_loop = result
            .violations()
            .iter()
            .find(|v| v.id == RuleId::Lsc8ActorNoSelfLoop)
            .unwrap();
        assert_eq!(self_loop.location, Location::path("data.scenario.messages[1]"));
        assert!(result.not_applicable().contains(&RuleId::Lsc18EventArrowSyntax));
    }

    #[test]
    fn bare_scenario_shape_is_accepted() {
        let scenario = json!({"scenario": {"messages": [
            {"source": "system", "target": "bill", "event_name": "ieHello"},
            {"source": "bill", "target": "system", "event_name": "oeAck"}
        ]}});
        assert!(ScenarioAuditor::default().audit_value(&scenario, None).verdict());
    }

    #[test]
    fn malformed_shapes_yield_one_structural_violation() {
        let result = ScenarioAuditor::default().audit_value(&json!({"messages": []}), None);
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].id, RuleId::LscFormatError);

        let result = ScenarioAuditor::default().audit_value(&json!([1, 2, 3]), None);
        assert_eq!(result.violations().len(), 1);
    }

    #[test]
    fn endpoint_annotations_are_split() {
        let e = Endpoint::parse("bill:ActAdmin");
        assert_eq!(e.instance, "bill");
        assert_eq!(e.declared_type.as_deref(), Some("ActAdmin"));
        let e = Endpoint::parse("system");
        assert!(e.is_system());
        assert!(e.declared_type.is_none());
    }

    #[test]
    fn param_counts_ignore_annotations_and_blanks() {
        assert_eq!(json_param_count(Some(&json!(["a:int", "", "b"]))), 2);
        assert_eq!(json_param_count(Some(&json!("x, y:str"))), 2);
        assert_eq!(json_param_count(None), 0);
        assert_eq!(count_params(["", " "].into_iter()), 0);
    }
}
