//! Operation-model auditor (LOM rules).

use std::collections::HashSet;

use lucim_common::{
    is_act_type, is_camel_case, is_system_token, Artifact, AuditConfig, AuditResult, EventKind,
    Location, RuleId, Violation, SYSTEM_NAME,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::block::{check_json_block_only, json_object_span, strip_fences, unwrap_data};
use crate::model::{collect_events, str_field, ActorEntry, ActorsRepr, EventEntry, EventOrigin, NESTED_BLOCKS};

const CONDITION_FIELDS: [&str; 3] = ["preF", "preP", "postF"];

#[derive(Debug, Clone, Default)]
pub struct OperationModelAuditor {
    config: AuditConfig,
}

impl OperationModelAuditor {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Audit a parsed operation model.
    pub fn audit(&self, model: &Value) -> AuditResult {
        let violations = self.collect(model);
        self.finish(violations)
    }

    /// Audit raw generator output: block-only guard, fence stripping,
    /// `{data: …}` unwrapping, then the structural audit.
    pub fn audit_raw(&self, raw: &str) -> AuditResult {
        let mut violations = check_json_block_only(raw, RuleId::Lom0JsonBlockOnly);
        let body = strip_fences(raw);
        match serde_json::from_str::<Value>(json_object_span(&body)) {
            Ok(value) => violations.extend(self.collect(unwrap_data(&value))),
            Err(e) => {
                warn!(error = %e, "Operation model is not valid JSON");
                violations.push(
                    Violation::new(RuleId::LomFormatError, Location::path("raw_content"))
                        .with_message(format!("The Operation Model is not valid JSON: {e}"))
                        .with_value("json_error", e.to_string()),
                );
            }
        }
        self.finish(violations)
    }

    fn finish(&self, violations: Vec<Violation>) -> AuditResult {
        let result = self.config.finish(Artifact::OperationModel, violations, Vec::new());
        debug!(
            verdict = result.verdict(),
            violations = result.violations().len(),
            "Operation model audited"
        );
        result
    }

    fn collect(&self, root: &Value) -> Vec<Violation> {
        let mut v = Vec::new();

        if !root.is_object() {
            warn!("Operation model root is not an object");
            v.push(
                Violation::new(RuleId::LomFormatError, Location::path("$"))
                    .with_message("The Operation Model must be a JSON object.")
                    .with_value("found", json_type(root)),
            );
            return v;
        }

        let actors_repr = ActorsRepr::of(root);
        check_actors_shape(&actors_repr, &mut v);
        let actors = actors_repr.entries();

        check_system(root, &actors, &mut v);
        check_actor_entries(&actors, &mut v);
        check_event_containers(root, &actors, &mut v);

        for event in collect_events(root, &actors) {
            if !event.value.is_object() {
                v.push(
                    Violation::new(RuleId::LomFormatError, Location::path(&event.path))
                        .with_message("Event entries must be JSON objects.")
                        .with_value("found", json_type(event.value)),
                );
                continue;
            }
            check_event_name(&event, &mut v);
            check_event_direction(&event, &actors, &mut v);
            check_parameters(&event, &mut v);
            check_condition_arrays(&event, &mut v);
            self.check_condition_items(&event, &mut v);
        }

        v
    }

    /// LOM6: every item of every condition array is a well-formed condition.
    fn check_condition_items(&self, event: &EventEntry<'_>, v: &mut Vec<Violation>) {
        for field in CONDITION_FIELDS {
            let Some(items) = event.value.get(field).and_then(Value::as_array) else {
                continue;
            };
            let mut seen_ids = HashSet::new();
            for (i, item) in items.iter().enumerate() {
                let path = format!("{}.{field}[{i}]", event.path);
                if !item.is_object() {
                    v.push(
                        Violation::new(RuleId::Lom6ConditionsDefinition, Location::path(&path))
                            .with_message(format!("Each item in \"{field}\" must be an object."))
                            .with_value("item", item.clone()),
                    );
                    continue;
                }

                let text_ok = str_field(item, "text").is_some_and(|t| !t.trim().is_empty());
                if !text_ok {
                    v.push(
                        Violation::new(RuleId::Lom6ConditionsDefinition, Location::path(format!("{path}.text")))
                            .with_message(format!("Condition \"text\" in \"{field}\" must be a non-empty string.")),
                    );
                }

                if let Some(severity) = item.get("severity") {
                    let allowed = severity.as_str().is_some_and(|s| self.config.allows_severity(s));
                    if !allowed {
                        v.push(
                            Violation::new(
                                RuleId::Lom6ConditionsDefinition,
                                Location::path(format!("{path}.severity")),
                            )
                            .with_message(format!(
                                "Condition \"severity\" must be one of: {}.",
                                self.config.condition_severities.join(", ")
                            ))
                            .with_value("severity", severity.clone()),
                        );
                    }
                }

                if let Some(id) = str_field(item, "id").filter(|id| !id.is_empty()) {
                    if !seen_ids.insert(id) {
                        v.push(
                            Violation::new(RuleId::Lom6ConditionsDefinition, Location::path(format!("{path}.id")))
                                .with_message(format!("Condition \"id\" must be unique within \"{field}\"."))
                                .with_value("id", id),
                        );
                    }
                }

                if let Some(refs) = item.get("refs") {
                    let ok = refs
                        .as_array()
                        .is_some_and(|r| r.iter().all(Value::is_string));
                    if !ok {
                        v.push(
                            Violation::new(RuleId::Lom6ConditionsDefinition, Location::path(format!("{path}.refs")))
                                .with_message("Condition \"refs\" must be an array of strings.")
                                .with_value("refs", refs.clone()),
                        );
                    }
                }
            }
        }
    }
}

// --- Structure ---

fn check_actors_shape(repr: &ActorsRepr<'_>, v: &mut Vec<Violation>) {
    match repr {
        ActorsRepr::Absent => {
            warn!("Operation model has no actors collection");
            v.push(
                Violation::new(RuleId::LomFormatError, Location::path("actors"))
                    .with_message("The Operation Model must declare an \"actors\" list or map."),
            );
        }
        ActorsRepr::Invalid(found) => {
            warn!("Operation model actors collection has the wrong shape");
            v.push(
                Violation::new(RuleId::LomFormatError, Location::path("actors"))
                    .with_message("\"actors\" must be a list of actor records or a map keyed by actor type.")
                    .with_value("found", json_type(found)),
            );
        }
        ActorsRepr::List(_) | ActorsRepr::MapByType(_) => {}
    }
}

fn check_event_containers(root: &Value, actors: &[ActorEntry<'_>], v: &mut Vec<Violation>) {
    let mut containers: Vec<(String, &Value)> = Vec::new();
    for actor in actors {
        for (block, _) in NESTED_BLOCKS {
            if let Some(c) = actor.value.get(block) {
                containers.push((format!("{}.{block}", actor.path), c));
            }
        }
    }
    if let Some(c) = root.get("events") {
        containers.push(("events".to_string(), c));
    }
    for (path, container) in containers {
        if !(container.is_object() || container.is_array() || container.is_null()) {
            v.push(
                Violation::new(RuleId::LomFormatError, Location::path(path))
                    .with_message("Event collections must be a map keyed by event name or a list of event records.")
                    .with_value("found", json_type(container)),
            );
        }
    }
}

// --- System and actors ---

/// LOM10: exactly one System, named exactly `System`.
fn check_system(root: &Value, actors: &[ActorEntry<'_>], v: &mut Vec<Violation>) {
    match root.get("system") {
        None | Some(Value::Null) => v.push(
            Violation::new(RuleId::Lom10SysUnique, Location::path("system"))
                .with_message("The Operation Model must declare the System: \"system\": {\"name\": \"System\"}."),
        ),
        Some(Value::Array(items)) if items.len() != 1 => v.push(
            Violation::new(RuleId::Lom10SysUnique, Location::path("system"))
                .with_message("There must be exactly one System.")
                .with_value("count", items.len()),
        ),
        Some(system) => {
            let node = system.as_array().and_then(|a| a.first()).unwrap_or(system);
            let name = str_field(node, "name").unwrap_or_default();
            if name != SYSTEM_NAME {
                v.push(
                    Violation::new(RuleId::Lom10SysUnique, Location::path("system.name"))
                        .with_message("The System must be named exactly \"System\".")
                        .with_value("name", name),
                );
            }
        }
    }

    for actor in actors.iter().filter(|a| a.object().is_some()) {
        let declares_system = is_system_token(&actor.type_name()) || is_system_token(&actor.instance_name());
        if declares_system {
            v.push(
                Violation::new(RuleId::Lom10SysUnique, Location::path(&actor.path))
                    .with_message("The System must not be declared again as an actor.")
                    .with_value("actor_type", actor.type_name()),
            );
        }
    }
}

/// Non-object actor entries are structural errors; LOM1 on the rest.
fn check_actor_entries(actors: &[ActorEntry<'_>], v: &mut Vec<Violation>) {
    for actor in actors {
        if actor.object().is_none() {
            v.push(
                Violation::new(RuleId::LomFormatError, Location::path(&actor.path))
                    .with_message("Actor entries must be JSON objects.")
                    .with_value("found", json_type(actor.value)),
            );
            continue;
        }
        let type_name = actor.type_name();
        if !is_act_type(&type_name) && !is_system_token(&type_name) {
            v.push(Violation::new(RuleId::Lom1ActTypeFormat, Location::path(&actor.path)).with_value("type_name", type_name));
        }
    }
}

// --- Events ---

/// LOM2 / LOM3: event names are camelCase.
fn check_event_name(event: &EventEntry<'_>, v: &mut Vec<Violation>) {
    let rule = match event.kind {
        Some(EventKind::InputEvent) => RuleId::Lom2IeEventNameFormat,
        Some(EventKind::OutputEvent) => RuleId::Lom3OeEventNameFormat,
        None => return,
    };
    if !is_camel_case(&event.name) {
        v.push(Violation::new(rule, Location::path(&event.path)).with_value("event_name", event.name.as_str()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    System,
    Actor(usize),
    Unknown,
    Missing,
}

impl Endpoint {
    fn resolve(token: Option<&str>, actors: &[ActorEntry<'_>]) -> Self {
        let Some(token) = token else {
            return Endpoint::Missing;
        };
        if is_system_token(token) {
            return Endpoint::System;
        }
        let wanted = token.trim().to_lowercase();
        actors
            .iter()
            .position(|a| a.object().is_some() && a.tokens().contains(&wanted))
            .map(Endpoint::Actor)
            .unwrap_or(Endpoint::Unknown)
    }

    fn is_system(&self) -> bool {
        matches!(self, Endpoint::System)
    }

    fn is_actor(&self) -> bool {
        matches!(self, Endpoint::Actor(_))
    }

    fn is_non_system(&self) -> bool {
        matches!(self, Endpoint::Actor(_) | Endpoint::Unknown)
    }
}

/// LOM4, LOM5, LOM11, LOM12, LOM13. Nested events without explicit endpoints
/// take their direction from the block they are declared in.
fn check_event_direction(event: &EventEntry<'_>, actors: &[ActorEntry<'_>], v: &mut Vec<Violation>) {
    let owner = match event.origin {
        EventOrigin::Nested(position) => Some(position),
        EventOrigin::TopLevel => None,
    };

    let (source, target) = match (owner, event.kind) {
        (Some(position), Some(EventKind::InputEvent)) => (
            event.source.as_deref().map_or(Endpoint::System, |t| Endpoint::resolve(Some(t), actors)),
            event.target.as_deref().map_or(Endpoint::Actor(position), |t| Endpoint::resolve(Some(t), actors)),
        ),
        (Some(position), Some(EventKind::OutputEvent)) => (
            event.source.as_deref().map_or(Endpoint::Actor(position), |t| Endpoint::resolve(Some(t), actors)),
            event.target.as_deref().map_or(Endpoint::System, |t| Endpoint::resolve(Some(t), actors)),
        ),
        _ => (
            Endpoint::resolve(event.source.as_deref(), actors),
            Endpoint::resolve(event.target.as_deref(), actors),
        ),
    };

    let with_endpoints = |violation: Violation| {
        violation
            .with_value("event_name", event.name.as_str())
            .with_value("source", event.source.clone().map_or(Value::Null, Value::from))
            .with_value("target", event.target.clone().map_or(Value::Null, Value::from))
    };
    let location = || Location::path(&event.path);

    if source.is_system() && target.is_system() {
        v.push(with_endpoints(Violation::new(RuleId::Lom11SysNoSelfLoop, location())));
    }
    if source.is_non_system() && target.is_non_system() {
        v.push(with_endpoints(Violation::new(RuleId::Lom12ActNoActEvents, location())));
    }
    let allowed = (source.is_system() && target.is_actor()) || (source.is_actor() && target.is_system());
    if !allowed {
        v.push(with_endpoints(Violation::new(RuleId::Lom13SysActAllowedEvents, location())));
    }

    match event.kind {
        Some(EventKind::InputEvent) => {
            let target_ok = match owner {
                Some(position) => target == Endpoint::Actor(position),
                None => target.is_actor(),
            };
            if !(source.is_system() && target_ok) {
                v.push(with_endpoints(Violation::new(RuleId::Lom4IeEventDirection, location())));
            }
        }
        Some(EventKind::OutputEvent) => {
            let source_ok = match owner {
                Some(position) => source == Endpoint::Actor(position),
                None => source.is_actor(),
            };
            if !(source_ok && target.is_system()) {
                v.push(with_endpoints(Violation::new(RuleId::Lom5OeEventDirection, location())));
            }
        }
        None => {}
    }
}

/// LOM14: `parameters` is an array of strings or `{name}` descriptors.
fn check_parameters(event: &EventEntry<'_>, v: &mut Vec<Violation>) {
    let Some(params) = event.value.get("parameters") else {
        return;
    };
    let ok = params.as_array().is_some_and(|items| {
        items
            .iter()
            .all(|p| p.is_string() || str_field(p, "name").is_some())
    });
    if !ok {
        v.push(
            Violation::new(RuleId::Lom14EventParametersFormat, Location::path(format!("{}.parameters", event.path)))
                .with_value("parameters", params.clone()),
        );
    }
}

/// LOM7: `postF` present and non-empty; `preF`/`preP` arrays when present.
fn check_condition_arrays(event: &EventEntry<'_>, v: &mut Vec<Violation>) {
    let post_f = event.value.get("postF");
    let post_ok = post_f.and_then(Value::as_array).is_some_and(|a| !a.is_empty());
    if !post_ok {
        v.push(
            Violation::new(RuleId::Lom7ConditionsValidation, Location::path(format!("{}.postF", event.path)))
                .with_message("postF must be present and a non-empty array.")
                .with_value("postF", post_f.cloned().unwrap_or(Value::Null)),
        );
    }
    for field in ["preF", "preP"] {
        match event.value.get(field) {
            None | Some(Value::Array(_)) => {}
            Some(other) => v.push(
                Violation::new(RuleId::Lom7ConditionsValidation, Location::path(format!("{}.{field}", event.path)))
                    .with_message(format!("{field} must be an array when provided (may be empty)."))
                    .with_value(field, other.clone()),
            ),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
