//! Sequence diagram auditor (LDR rules).
//!
//! One sequential walk over the lexed lines handles declarations, messages
//! and activation bars; a post-pass then checks that every event on an actor
//! lifeline is followed by its activation bar.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use lucim_common::{
    is_act_type, is_system_token, Artifact, AuditConfig, AuditResult, EventKind, Location, RuleId,
    Violation,
};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::block::{check_plantuml_block_only, extract_plantuml, plantuml_from_json};
use crate::model::ModelIndex;
use crate::plantuml::{lex, split_params, Arrow, LexedLine, Line, Message, Participant};

static ACTOR_ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap());

/// Activation bar state of one lifeline.
#[derive(Debug, Clone, Default)]
enum BarState {
    #[default]
    Idle,
    /// Start lines of the open bars, innermost last.
    Active { opened: Vec<usize> },
}

#[derive(Debug, Clone, Default)]
struct Lifeline {
    state: BarState,
    last_closed: Option<usize>,
    events: Vec<usize>,
    activations: Vec<usize>,
    deactivations: Vec<usize>,
}

impl Lifeline {
    fn open(&mut self, line: usize) {
        match &mut self.state {
            BarState::Idle => self.state = BarState::Active { opened: vec![line] },
            BarState::Active { opened } => opened.push(line),
        }
        self.activations.push(line);
    }

    fn close(&mut self, line: usize) {
        if let BarState::Active { opened } = &mut self.state {
            opened.pop();
            if opened.is_empty() {
                self.state = BarState::Idle;
            }
        }
        self.last_closed = Some(line);
        self.deactivations.push(line);
    }

    /// Start line of the innermost open bar.
    fn top(&self) -> Option<usize> {
        match &self.state {
            BarState::Idle => None,
            BarState::Active { opened } => opened.last().copied(),
        }
    }
}

/// Hands out, for keys visited in descending order, the earliest unused
/// line strictly after each key. `lines` must be ascending.
struct LaterPicker<'a> {
    lines: &'a [usize],
    boundary: usize,
    free: Vec<usize>,
}

impl<'a> LaterPicker<'a> {
    fn new(lines: &'a [usize]) -> Self {
        Self {
            lines,
            boundary: lines.len(),
            free: Vec::new(),
        }
    }

    /// Index into `lines` of the pick, if any line after `key` is left.
    fn pick(&mut self, key: usize) -> Option<usize> {
        while self.boundary > 0 && self.lines[self.boundary - 1] > key {
            self.boundary -= 1;
            self.free.push(self.boundary);
        }
        self.free.pop()
    }
}

/// Mutable state of one walk over a diagram.
#[derive(Default)]
struct Walk {
    violations: Vec<Violation>,
    system_line: Option<usize>,
    /// Actors declared before any System declaration.
    early_actors: Vec<(usize, String)>,
    /// Actor participants in declaration order.
    actors: Vec<(usize, Participant)>,
    lifelines: BTreeMap<String, Lifeline>,
    /// Non-system message endpoints in first-appearance order.
    endpoints: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DiagramAuditor {
    config: AuditConfig,
}

impl DiagramAuditor {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn audit(&self, text: &str) -> AuditResult {
        self.finish(collect(text, None), false)
    }

    /// Audit and also check declared actor types against an operation model.
    pub fn audit_with_model(&self, text: &str, model: &Value) -> AuditResult {
        let index = ModelIndex::build(model);
        self.finish(collect(text, Some(&index)), true)
    }

    /// Audit raw generator output. A JSON wrapper is unwrapped first; the
    /// envelope guard then runs on the PlantUML content, and the block is
    /// recovered from any surrounding prose before the audit.
    pub fn audit_raw(&self, raw: &str) -> AuditResult {
        let unwrapped = plantuml_from_json(raw);
        let content = unwrapped.as_deref().unwrap_or(raw);
        let mut violations = check_plantuml_block_only(content);
        let text = extract_plantuml(content).unwrap_or_else(|| {
            warn!("No PlantUML block found in raw diagram content");
            content.to_string()
        });
        violations.extend(collect(&text, None));
        self.finish(violations, false)
    }

    fn finish(&self, violations: Vec<Violation>, with_model: bool) -> AuditResult {
        let mut not_applicable = RuleId::DIAGRAM_GRAPHICAL_RULES.to_vec();
        if !with_model {
            not_applicable.push(RuleId::Ldr28ActorInstanceNameConsistency);
        }
        let result = self.config.finish(Artifact::Diagram, violations, not_applicable);
        debug!(
            verdict = result.verdict(),
            violations = result.violations().len(),
            "Diagram audited"
        );
        result
    }
}

fn collect(text: &str, index: Option<&ModelIndex>) -> Vec<Violation> {
    if text.trim().is_empty() {
        return vec![Violation::new(RuleId::LdrFormatError, Location::Line(1))
            .with_message("The diagram is empty.")];
    }

    let lines = lex(text);
    let mut walk = Walk::default();

    for line in &lines {
        match &line.kind {
            Line::Participant(p) => walk.declaration(line.number, p),
            Line::Message(m) => walk.message(line.number, m),
            Line::Activate(alias) => walk.activate(line.number, alias),
            Line::Deactivate(alias) => walk.deactivate(line.number, alias),
            _ => {}
        }
    }

    if walk.system_line.is_none() {
        let first = lines
            .iter()
            .find(|l| l.kind.is_significant())
            .map_or_else(|| "(empty file)".to_string(), |l| l.raw.trim().to_string());
        walk.violations.push(
            Violation::new(RuleId::Ldr1SysUnique, Location::Line(1))
                .with_message("The System participant is never declared (expected: participant System as system).")
                .with_value("line_content", first),
        );
    }

    walk.sequencing(&lines);

    if let Some(index) = index {
        walk.model_consistency(index);
    }
    walk.violations
}

impl Walk {
    fn declaration(&mut self, number: usize, p: &Participant) {
        let at = || Location::Line(number);

        if p.canonical_system || is_system_token(&p.alias) {
            if !p.canonical_system {
                self.violations.push(
                    Violation::new(RuleId::Ldr24SystemDeclaration, at())
                        .with_value("label", p.label.as_str())
                        .with_value("alias", p.alias.as_str()),
                );
            }
            if self.system_line.is_some() {
                self.violations.push(
                    Violation::new(RuleId::Ldr1SysUnique, at())
                        .with_message("The System participant is declared more than once.")
                        .with_value("first_declaration", self.system_line),
                );
                return;
            }
            self.system_line = Some(number);
            for (line, alias) in &self.early_actors {
                self.violations.push(
                    Violation::new(RuleId::Ldr2ActorDeclaredAfterSystem, Location::Line(*line))
                        .with_value("actor_alias", alias.as_str())
                        .with_value("system_line", number),
                );
            }
            return;
        }

        if self.system_line.is_none() {
            self.violations.push(
                Violation::new(RuleId::Ldr3SystemDeclaredFirst, at()).with_value("actor_alias", p.alias.as_str()),
            );
            self.early_actors.push((number, p.alias.clone()));
        }

        let syntax = |message: String| {
            Violation::new(RuleId::Ldr17ActorDeclarationSyntax, at())
                .with_message(message)
                .with_value("label", p.label.as_str())
                .with_value("alias", p.alias.as_str())
        };
        if !p.quoted {
            self.violations.push(syntax(format!(
                "The actor label must be quoted: participant \"{}\" as {}.",
                p.label, p.alias
            )));
        }
        match p.label.split_once(':') {
            None => self.violations.push(syntax(format!(
                "The actor label must read \"instanceName:ActType\"; got \"{}\".",
                p.label
            ))),
            Some((name, ty)) => {
                if name.trim() != p.alias {
                    self.violations.push(syntax(format!(
                        "The alias \"{}\" must repeat the instance name \"{}\".",
                        p.alias,
                        name.trim()
                    )));
                }
                if !is_act_type(ty.trim()) {
                    self.violations.push(syntax(format!(
                        "\"{}\" is not an actor type (Act followed by PascalCase).",
                        ty.trim()
                    )));
                }
            }
        }

        if !ACTOR_ALIAS_RE.is_match(&p.alias) {
            self.violations.push(
                Violation::new(RuleId::Ldr27ActorInstanceFormat, at()).with_value("alias", p.alias.as_str()),
            );
        }

        self.actors.push((number, p.clone()));
    }

    fn message(&mut self, number: usize, m: &Message) {
        let at = || Location::Line(number);
        let lhs_sys = is_system_token(&m.lhs);
        let rhs_sys = is_system_token(&m.rhs);
        let describe = |violation: Violation| {
            violation
                .with_value("source", m.lhs.as_str())
                .with_value("target", m.rhs.as_str())
                .with_value("event_name", m.name.as_str())
        };

        if lhs_sys && rhs_sys {
            self.violations.push(describe(Violation::new(RuleId::Ldr5SystemNoSelfLoop, at())));
        }
        if !lhs_sys && !rhs_sys {
            self.violations.push(describe(Violation::new(RuleId::Ldr6ActorNoActorLoop, at())));
        }
        if lhs_sys == rhs_sys {
            self.violations.push(describe(Violation::new(RuleId::Ldr4EventDirectionality, at())));
        }

        let participant = if lhs_sys { &m.rhs } else { &m.lhs };
        match EventKind::from_event_name(&m.name) {
            Some(EventKind::InputEvent) => {
                if !(lhs_sys && !rhs_sys) {
                    self.violations.push(describe(
                        Violation::new(RuleId::Ldr25InputEventSyntax, at())
                            .with_message(format!("Input events must go from the System to the actor: system --> {participant}.")),
                    ));
                } else if m.arrow != Arrow::Dashed {
                    self.violations.push(describe(
                        Violation::new(RuleId::Ldr25InputEventSyntax, at())
                            .with_message("Input events must use a dashed arrow (-->).")
                            .with_value("arrow", m.arrow.as_str()),
                    ));
                }
            }
            Some(EventKind::OutputEvent) => {
                if !(!lhs_sys && rhs_sys) {
                    self.violations.push(describe(
                        Violation::new(RuleId::Ldr26OutputEventSyntax, at())
                            .with_message(format!("Output events must go from the actor to the System: {participant} -> system.")),
                    ));
                } else if m.arrow != Arrow::Solid {
                    self.violations.push(describe(
                        Violation::new(RuleId::Ldr26OutputEventSyntax, at())
                            .with_message("Output events must use a continuous arrow (->).")
                            .with_value("arrow", m.arrow.as_str()),
                    ));
                }
            }
            None => {}
        }

        if m.params.contains(';') || m.params.contains('|') {
            self.violations.push(
                Violation::new(RuleId::Ldr23EventParameterCommaSeparated, at())
                    .with_value("parameters", m.params.as_str()),
            );
        } else {
            let items = split_params(&m.params);
            if items.len() > 1 && items.iter().any(String::is_empty) {
                self.violations.push(
                    Violation::new(RuleId::Ldr23EventParameterCommaSeparated, at())
                        .with_message("Parameter lists must not contain empty items.")
                        .with_value("parameters", m.params.as_str()),
                );
            }
        }

        for endpoint in [&m.lhs, &m.rhs] {
            if is_system_token(endpoint) {
                continue;
            }
            if !self.endpoints.contains(endpoint) {
                self.endpoints.push(endpoint.clone());
            }
            self.lifelines.entry(endpoint.clone()).or_default().events.push(number);
        }
    }

    fn activate(&mut self, number: usize, alias: &str) {
        if is_system_token(alias) {
            self.violations.push(Violation::new(RuleId::Ldr10ActivationBarOnSystemForbidden, Location::Line(number)));
            return;
        }
        let lifeline = self.lifelines.entry(alias.to_string()).or_default();
        if let Some(top) = lifeline.top() {
            self.violations.push(
                Violation::new(RuleId::Ldr8ActivationBarNestingForbidden, Location::Line(number))
                    .with_value("participant", alias)
                    .with_value("open_since", top),
            );
            if lifeline.last_closed.is_none_or(|closed| closed < top) {
                self.violations.push(
                    Violation::new(RuleId::Ldr9ActivationBarOverlappingForbidden, Location::Line(number))
                        .with_value("participant", alias)
                        .with_value("open_since", top),
                );
            }
        }
        lifeline.open(number);
    }

    fn deactivate(&mut self, number: usize, alias: &str) {
        if is_system_token(alias) {
            return;
        }
        self.lifelines.entry(alias.to_string()).or_default().close(number);
    }

    /// Pair every event on an actor lifeline with the activation bar after
    /// it: event, `activate`, `deactivate` on consecutive significant lines.
    fn sequencing(&mut self, lines: &[LexedLine<'_>]) {
        let significant: Vec<usize> = lines
            .iter()
            .filter(|l| l.kind.is_significant())
            .map(|l| l.number)
            .collect();
        let next_significant = |after: usize| -> Option<usize> {
            let i = significant.partition_point(|&n| n <= after);
            significant.get(i).copied()
        };

        let mut found: Vec<(usize, Violation)> = Vec::new();
        for alias in &self.endpoints {
            let Some(lifeline) = self.lifelines.get(alias) else { continue };

            if lifeline.activations.is_empty() {
                for &event in &lifeline.events {
                    found.push((
                        event,
                        Violation::new(RuleId::Ldr7ActivationBarSequence, Location::Line(event))
                            .with_message(format!("\"{alias}\" has events but no activation bar."))
                            .with_value("participant", alias.as_str()),
                    ));
                }
                continue;
            }

            let mut activations = LaterPicker::new(&lifeline.activations);
            let mut paired = vec![false; lifeline.activations.len()];
            for &event in lifeline.events.iter().rev() {
                let Some(a) = activations.pick(event) else {
                    found.push((
                        event,
                        Violation::new(RuleId::Ldr7ActivationBarSequence, Location::Line(event))
                            .with_value("participant", alias.as_str()),
                    ));
                    continue;
                };
                paired[a] = true;
                let activation = lifeline.activations[a];

                if next_significant(event) != Some(activation) {
                    found.push((
                        event,
                        Violation::new(RuleId::Ldr20ActivationBarSequence, Location::Line(event))
                            .with_message(format!("The event must be immediately followed by activate {alias}."))
                            .with_value("participant", alias.as_str())
                            .with_value("activation_line", activation),
                    ));
                }
            }

            let mut deactivations = LaterPicker::new(&lifeline.deactivations);
            for a in (0..lifeline.activations.len()).rev().filter(|&a| paired[a]) {
                let activation = lifeline.activations[a];
                match deactivations.pick(activation) {
                    Some(d) => {
                        let deactivation = lifeline.deactivations[d];
                        if next_significant(activation) != Some(deactivation) {
                            found.push((
                                activation,
                                Violation::new(RuleId::Ldr20ActivationBarSequence, Location::Line(activation))
                                    .with_message(format!("activate {alias} must be immediately followed by deactivate {alias}."))
                                    .with_value("participant", alias.as_str())
                                    .with_value("deactivation_line", deactivation),
                            ));
                        }
                    }
                    None => found.push((
                        activation,
                        Violation::new(RuleId::Ldr20ActivationBarSequence, Location::Line(activation))
                            .with_message(format!("activate {alias} is never closed by deactivate {alias}."))
                            .with_value("participant", alias.as_str())
                            .with_value("missing_deactivation", true),
                    )),
                }
            }
        }

        found.sort_by_key(|(line, _)| *line);
        self.violations.extend(found.into_iter().map(|(_, v)| v));
    }

    fn model_consistency(&mut self, index: &ModelIndex) {
        for (line, p) in &self.actors {
            let Some((_, ty)) = p.label.split_once(':') else { continue };
            let ty = ty.trim();
            if !index.has_type(ty) {
                let known: Vec<&str> = index.actors().iter().map(|a| a.type_name.as_str()).collect();
                self.violations.push(
                    Violation::new(RuleId::Ldr28ActorInstanceNameConsistency, Location::Line(*line))
                        .with_value("actor_type", ty)
                        .with_value("known_types", known),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "@startuml
participant System as system
participant \"bill:ActAdmin\" as bill
system --> bill : ieHello()
activate bill
deactivate bill
bill -> system : oeAck()
activate bill
deactivate bill
@enduml";

    fn audit(text: &str) -> AuditResult {
        DiagramAuditor::default().audit(text)
    }

    #[test]
    fn valid_diagram_passes() {
        let result = audit(VALID);
        assert!(result.verdict(), "{:?}", result.violations());
        assert!(result.not_applicable().contains(&RuleId::Ldr11SystemShape));
        assert!(result.not_applicable().contains(&RuleId::Ldr28ActorInstanceNameConsistency));
    }

    #[test]
    fn actor_before_system() {
        let text = VALID.replace(
            "participant System as system\nparticipant \"bill:ActAdmin\" as bill",
            "participant \"bill:ActAdmin\" as bill\nparticipant System as system",
        );
        let result = audit(&text);
        assert!(!result.verdict());
        assert!(result.has(RuleId::Ldr3SystemDeclaredFirst));
        assert!(result.has(RuleId::Ldr2ActorDeclaredAfterSystem));
    }

    #[test]
    fn activation_on_system_is_one_violation() {
        let text = VALID.replace("@enduml", "activate system\n@enduml");
        let result = audit(&text);
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].id, RuleId::Ldr10ActivationBarOnSystemForbidden);
        assert_eq!(result.violations()[0].location, Location::Line(10));
    }

    #[test]
    fn missing_and_duplicate_system() {
        let result = audit("@startuml\n@enduml");
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr1SysUnique]);
        assert_eq!(
            result.violations()[0].extracted_values["line_content"],
            Value::from("@startuml")
        );

        let text = VALID.replace(
            "participant System as system",
            "participant System as system\nparticipant System as system",
        );
        assert_eq!(audit(&text).count(RuleId::Ldr1SysUnique), 1);
    }

    #[test]
    fn non_canonical_system_declaration() {
        let text = VALID.replace("participant System as system", "participant \"System\" as system #FFFFFF");
        let result = audit(&text);
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr24SystemDeclaration]);
    }

    #[test]
    fn actor_declaration_syntax() {
        let text = VALID.replace("participant \"bill:ActAdmin\" as bill", "participant bill as bill");
        let result = audit(&text);
        // unquoted and missing the type
        assert_eq!(result.count(RuleId::Ldr17ActorDeclarationSyntax), 2);

        let text = VALID.replace("\"bill:ActAdmin\" as bill", "\"ann:admin\" as bill");
        assert_eq!(audit(&text).count(RuleId::Ldr17ActorDeclarationSyntax), 2);
    }

    #[test]
    fn actor_alias_format() {
        let text = VALID
            .replace("\"bill:ActAdmin\" as bill", "\"Bill_1:ActAdmin\" as Bill_1")
            .replace("bill", "Bill_1");
        assert!(audit(&text).has(RuleId::Ldr27ActorInstanceFormat));
    }

    #[test]
    fn message_direction_and_arrows() {
        let text = VALID.replace("system --> bill : ieHello()", "system -> system : ieHello()");
        let result = audit(&text);
        assert!(result.has(RuleId::Ldr5SystemNoSelfLoop));
        assert!(result.has(RuleId::Ldr4EventDirectionality));
        assert_eq!(result.count(RuleId::Ldr25InputEventSyntax), 1);

        let text = VALID.replace("system --> bill : ieHello()", "bill -> system : ieHello()");
        let result = audit(&text);
        let ldr25: Vec<_> = result.violations().iter().filter(|v| v.id == RuleId::Ldr25InputEventSyntax).collect();
        assert_eq!(ldr25.len(), 1);
        assert!(ldr25[0].message.contains("from the System"));

        let text = VALID.replace("bill -> system : oeAck()", "bill --> system : oeAck()");
        let result = audit(&text);
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr26OutputEventSyntax]);
    }

    #[test]
    fn capitalised_prefix_is_not_an_event_kind() {
        let text = VALID.replace("system --> bill : ieHello()", "bill -> system : IeHello()");
        let result = audit(&text);
        assert!(!result.has(RuleId::Ldr25InputEventSyntax));
        assert!(!result.has(RuleId::Ldr26OutputEventSyntax));
    }

    #[test]
    fn parameter_separators() {
        let text = VALID.replace("ieHello()", "ieHello(a; b)");
        assert_eq!(audit(&text).rule_ids(), vec![RuleId::Ldr23EventParameterCommaSeparated]);
        let text = VALID.replace("ieHello()", "ieHello(a,,b)");
        assert_eq!(audit(&text).rule_ids(), vec![RuleId::Ldr23EventParameterCommaSeparated]);
        let text = VALID.replace("ieHello()", "ieHello(a, \"x;y\")");
        // quoted separators are still flagged: the raw list is inspected
        assert!(audit(&text).has(RuleId::Ldr23EventParameterCommaSeparated));
    }

    #[test]
    fn nesting_and_overlap() {
        let text = VALID.replace(
            "activate bill\ndeactivate bill\nbill ->",
            "activate bill\nactivate bill\ndeactivate bill\ndeactivate bill\nbill ->",
        );
        let result = audit(&text);
        assert_eq!(result.count(RuleId::Ldr8ActivationBarNestingForbidden), 1);
        assert_eq!(result.count(RuleId::Ldr9ActivationBarOverlappingForbidden), 1);
    }

    #[test]
    fn nesting_after_partial_close_is_not_overlap() {
        let lines = "@startuml
participant System as system
participant \"bill:ActAdmin\" as bill
activate bill
activate bill
deactivate bill
activate bill
@enduml";
        let result = audit(lines);
        assert_eq!(result.count(RuleId::Ldr8ActivationBarNestingForbidden), 2);
        assert_eq!(result.count(RuleId::Ldr9ActivationBarOverlappingForbidden), 1);
    }

    #[test]
    fn event_without_any_activation() {
        let text = "@startuml
participant System as system
participant \"bill:ActAdmin\" as bill
system --> bill : ieHello()
bill -> system : oeAck()
@enduml";
        let result = audit(text);
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr7ActivationBarSequence]);
        assert_eq!(result.count(RuleId::Ldr7ActivationBarSequence), 2);
    }

    #[test]
    fn activation_must_be_adjacent() {
        let text = VALID.replace("ieHello()\nactivate bill", "ieHello()\nskinparam x\nactivate bill");
        let result = audit(&text);
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr20ActivationBarSequence]);
        assert_eq!(result.violations()[0].location, Location::Line(4));

        // blank and comment lines do not break adjacency
        let text = VALID.replace("ieHello()\nactivate bill", "ieHello()\n\n' note\nactivate bill");
        assert!(audit(&text).verdict());
    }

    #[test]
    fn unclosed_activation() {
        let text = VALID.replace("oeAck()\nactivate bill\ndeactivate bill", "oeAck()\nactivate bill");
        let result = audit(&text);
        let v = &result.violations()[0];
        assert_eq!(v.id, RuleId::Ldr20ActivationBarSequence);
        assert_eq!(v.extracted_values["missing_deactivation"], Value::Bool(true));
    }

    #[test]
    fn first_event_loses_when_activations_run_short() {
        let text = "@startuml
participant System as system
participant \"bill:ActAdmin\" as bill
system --> bill : ieHello()
bill -> system : oeAck()
activate bill
deactivate bill
@enduml";
        let result = audit(text);
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr7ActivationBarSequence]);
        assert_eq!(result.violations()[0].location, Location::Line(4));
    }

    #[test]
    fn picker_hands_out_earliest_free_later_line() {
        let lines = [5, 10, 20];
        let mut picker = LaterPicker::new(&lines);

        assert_eq!(picker.pick(15), Some(2));
        assert_eq!(picker.pick(8), Some(1));
        assert_eq!(picker.pick(7), None);
        assert_eq!(picker.pick(1), Some(0));
        assert_eq!(picker.pick(0), None);
    }

    #[test]
    fn long_well_formed_exchange_is_compliant() {
        let mut text = String::from(
            "@startuml\nparticipant System as system\nparticipant \"bill:ActAdmin\" as bill\n",
        );
        for _ in 0..500 {
            text.push_str("system --> bill : ieHello()\nactivate bill\ndeactivate bill\n");
            text.push_str("bill -> system : oeAck()\nactivate bill\ndeactivate bill\n");
        }
        text.push_str("@enduml");

        let result = audit(&text);

        assert!(result.verdict(), "{:?}", result.violations());
    }

    #[test]
    fn declared_types_checked_against_model() {
        let model = serde_json::json!({"actors": {"ActOperator": {"name": "op"}}});
        let result = DiagramAuditor::default().audit_with_model(VALID, &model);
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr28ActorInstanceNameConsistency]);
        assert!(!result.not_applicable().contains(&RuleId::Ldr28ActorInstanceNameConsistency));

        let model = serde_json::json!({"actors": {"ActAdmin": {"name": "bill"}}});
        assert!(DiagramAuditor::default().audit_with_model(VALID, &model).verdict());
    }

    #[test]
    fn empty_text_is_a_format_error() {
        assert_eq!(audit("").rule_ids(), vec![RuleId::LdrFormatError]);
        assert_eq!(audit("  \n ").rule_ids(), vec![RuleId::LdrFormatError]);
    }

    #[test]
    fn raw_content_is_guarded_and_extracted() {
        let raw = format!("```\n{VALID}\n```");
        let result = DiagramAuditor::default().audit_raw(&raw);
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr0PlantumlBlockOnly]);

        let wrapped = serde_json::json!({"data": {"plantuml-diagram": VALID}}).to_string();
        assert!(DiagramAuditor::default().audit_raw(&wrapped).verdict());

        let chatty = format!("Here you go:\n{VALID}");
        let result = DiagramAuditor::default().audit_raw(&chatty);
        assert_eq!(result.rule_ids(), vec![RuleId::Ldr0PlantumlBlockOnly]);
    }
}
