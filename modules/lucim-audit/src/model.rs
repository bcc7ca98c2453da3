//! Normalized view of an operation model.
//!
//! Operation models arrive as loosely-typed JSON: actors as a list of records
//! or as a map keyed by type, events nested under each actor or listed flat.
//! [`ActorsRepr`] resolves the actor shape once and [`collect_events`] yields
//! one flat event list, so the rule checks never look at raw shapes again.
//! [`ModelIndex`] is the read-only lookup the scenario and diagram auditors
//! build from a model for cross-referencing.

use std::collections::BTreeMap;

use lucim_common::{capitalize_first, is_system_token, EventKind, ACTOR_TYPE_PREFIX};
use serde_json::{Map, Value};

pub const NESTED_BLOCKS: [(&str, EventKind); 2] = [
    ("input_events", EventKind::InputEvent),
    ("output_events", EventKind::OutputEvent),
];

// --- Actors ---

/// Actor collection shape, resolved at parse entry.
#[derive(Debug)]
pub enum ActorsRepr<'a> {
    List(&'a [Value]),
    MapByType(&'a Map<String, Value>),
    Absent,
    /// `actors` present but neither a list nor a map.
    Invalid(&'a Value),
}

impl<'a> ActorsRepr<'a> {
    pub fn of(root: &'a Value) -> Self {
        match root.get("actors") {
            None | Some(Value::Null) => ActorsRepr::Absent,
            Some(Value::Array(items)) => ActorsRepr::List(items),
            Some(Value::Object(map)) => ActorsRepr::MapByType(map),
            Some(other) => ActorsRepr::Invalid(other),
        }
    }

    /// Every actor entry in declaration order, objects or not.
    pub fn entries(&self) -> Vec<ActorEntry<'a>> {
        match self {
            ActorsRepr::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, value)| ActorEntry {
                    type_key: None,
                    value,
                    path: format!("actors[{i}]"),
                })
                .collect(),
            ActorsRepr::MapByType(map) => map
                .iter()
                .map(|(key, value)| ActorEntry {
                    type_key: Some(key.as_str()),
                    value,
                    path: format!("actors.{key}"),
                })
                .collect(),
            ActorsRepr::Absent | ActorsRepr::Invalid(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActorEntry<'a> {
    pub type_key: Option<&'a str>,
    pub value: &'a Value,
    pub path: String,
}

impl<'a> ActorEntry<'a> {
    pub fn object(&self) -> Option<&'a Map<String, Value>> {
        self.value.as_object()
    }

    /// Declared type: the `type` field, else the map key.
    pub fn type_name(&self) -> String {
        str_field(self.value, "type")
            .or(self.type_key)
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    /// Declared instance name (`name` field), possibly empty.
    pub fn instance_name(&self) -> String {
        str_field(self.value, "name").unwrap_or_default().trim().to_string()
    }

    /// Lowercase tokens that refer to this actor in event endpoints.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for t in [self.instance_name(), self.type_name()] {
            let t = t.to_lowercase();
            if !t.is_empty() && !tokens.contains(&t) {
                tokens.push(t);
            }
        }
        tokens
    }
}

// --- Events ---

/// Where an event was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrigin {
    /// Under an actor's `input_events`/`output_events`; the index is the
    /// owning actor's position in [`ActorsRepr::entries`].
    Nested(usize),
    /// In the top-level `events` collection.
    TopLevel,
}

#[derive(Debug, Clone)]
pub struct EventEntry<'a> {
    pub name: String,
    /// `None` when a top-level event carries no recognizable kind tag.
    pub kind: Option<EventKind>,
    pub origin: EventOrigin,
    pub value: &'a Value,
    pub path: String,
    pub source: Option<String>,
    pub target: Option<String>,
}

/// Flatten nested and top-level events into one list. Non-object event
/// containers are skipped here and reported by the operation-model auditor.
pub fn collect_events<'a>(root: &'a Value, actors: &[ActorEntry<'a>]) -> Vec<EventEntry<'a>> {
    let mut events = Vec::new();

    for (position, actor) in actors.iter().enumerate() {
        for (block, kind) in NESTED_BLOCKS {
            let Some(container) = actor.value.get(block) else {
                continue;
            };
            for (key, value, path) in container_items(container, &format!("{}.{block}", actor.path)) {
                events.push(EventEntry {
                    name: event_name(key, value),
                    kind: Some(kind),
                    origin: EventOrigin::Nested(position),
                    value,
                    path,
                    source: endpoint(value, &["source", "sender"]),
                    target: endpoint(value, &["target", "receiver"]),
                });
            }
        }
    }

    if let Some(container) = root.get("events") {
        for (key, value, path) in container_items(container, "events") {
            let kind = str_field(value, "kind")
                .or_else(|| str_field(value, "event_type"))
                .and_then(EventKind::from_tag);
            events.push(EventEntry {
                name: event_name(key, value),
                kind,
                origin: EventOrigin::TopLevel,
                value,
                path,
                source: endpoint(value, &["sender", "source"]),
                target: endpoint(value, &["receiver", "target"]),
            });
        }
    }

    events
}

/// Items of an event container: a map keyed by event name or a list of
/// records. Returns `(key, value, path)` triples.
pub fn container_items<'a>(container: &'a Value, base: &str) -> Vec<(Option<&'a str>, &'a Value, String)> {
    match container {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (Some(k.as_str()), v, format!("{base}.{k}")))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (None, v, format!("{base}[{i}]")))
            .collect(),
        _ => Vec::new(),
    }
}

fn event_name(key: Option<&str>, value: &Value) -> String {
    str_field(value, "name")
        .or(key)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn endpoint(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| str_field(value, k))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Parameter names declared by a model event: strings or `{name}` objects,
/// with any `name:type` annotation stripped and blank names dropped.
pub fn model_parameter_names(value: &Value) -> Vec<String> {
    let Some(items) = value.get("parameters").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(_) => str_field(item, "name"),
            _ => None,
        })
        .map(strip_annotation)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `count:int` → `count`.
pub fn strip_annotation(param: &str) -> &str {
    param.split(':').next().unwrap_or_default().trim()
}

// --- Cross-reference index ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedActor {
    pub type_name: String,
    pub instance: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEvent {
    pub kind: EventKind,
    /// Actor type owning the event, when it can be resolved.
    pub owner: Option<String>,
    pub param_count: usize,
    pub has_post_f: bool,
}

/// Lookup tables over one operation model: actor types in declaration order
/// and event definitions by name.
#[derive(Debug, Clone, Default)]
pub struct ModelIndex {
    actors: Vec<IndexedActor>,
    events: BTreeMap<String, Vec<IndexedEvent>>,
}

impl ModelIndex {
    pub fn build(model: &Value) -> Self {
        let root = crate::block::unwrap_data(model);
        let entries = ActorsRepr::of(root).entries();
        let actors: Vec<IndexedActor> = entries
            .iter()
            .filter(|e| e.object().is_some())
            .map(|e| IndexedActor {
                type_name: e.type_name(),
                instance: e.instance_name(),
            })
            .collect();

        let mut events: BTreeMap<String, Vec<IndexedEvent>> = BTreeMap::new();
        for event in collect_events(root, &entries) {
            let Some(kind) = event.kind else { continue };
            if event.name.is_empty() || !event.value.is_object() {
                continue;
            }
            let owner = match event.origin {
                EventOrigin::Nested(position) => Some(entries[position].type_name()),
                EventOrigin::TopLevel => {
                    let token = match kind {
                        EventKind::InputEvent => event.target.as_deref(),
                        EventKind::OutputEvent => event.source.as_deref(),
                    };
                    token.and_then(|t| resolve_token(&entries, t))
                }
            };
            let has_post_f = event
                .value
                .get("postF")
                .and_then(Value::as_array)
                .is_some_and(|a| !a.is_empty());
            events.entry(event.name.clone()).or_default().push(IndexedEvent {
                kind,
                owner,
                param_count: model_parameter_names(event.value).len(),
                has_post_f,
            });
        }

        Self { actors, events }
    }

    pub fn actors(&self) -> &[IndexedActor] {
        &self.actors
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.actors.iter().any(|a| a.type_name == type_name)
    }

    /// Definitions of `name` across all actors, in declaration order.
    pub fn event(&self, name: &str) -> &[IndexedEvent] {
        self.events.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Definition of `name` with the given kind, preferring one owned by
    /// `owner` when several actors declare it.
    pub fn event_of_kind(&self, name: &str, kind: EventKind, owner: Option<&str>) -> Option<&IndexedEvent> {
        let mut candidates = self.event(name).iter().filter(|e| e.kind == kind);
        let first = candidates.clone().next();
        owner
            .and_then(|o| candidates.find(|e| e.owner.as_deref() == Some(o)))
            .or(first)
    }

    /// Infer the declared actor type of a scenario instance name.
    ///
    /// Precedence: exact instance name, exact type name, `Act` + capitalized
    /// instance, then the same three case-insensitively. Within a step the
    /// first actor in declaration order wins.
    pub fn infer_type(&self, instance: &str) -> Option<&str> {
        let instance = instance.trim();
        if instance.is_empty() {
            return None;
        }
        let reconstructed = reconstruct_type(instance);
        let lower = instance.to_lowercase();
        let reconstructed_lower = reconstructed.to_lowercase();

        let steps: [&dyn Fn(&IndexedActor) -> bool; 6] = [
            &|a| a.instance == instance,
            &|a| a.type_name == instance,
            &|a| a.type_name == reconstructed,
            &|a| a.instance.to_lowercase() == lower,
            &|a| a.type_name.to_lowercase() == lower,
            &|a| a.type_name.to_lowercase() == reconstructed_lower,
        ];
        steps.iter().find_map(|matches| {
            self.actors
                .iter()
                .find(|a| !a.type_name.is_empty() && matches(a))
                .map(|a| a.type_name.as_str())
        })
    }
}

/// `operator` → `ActOperator`; `actOperator` → `ActOperator`.
fn reconstruct_type(instance: &str) -> String {
    match instance.strip_prefix("act") {
        Some(rest) if rest.starts_with(char::is_uppercase) => format!("{ACTOR_TYPE_PREFIX}{rest}"),
        _ => format!("{ACTOR_TYPE_PREFIX}{}", capitalize_first(instance)),
    }
}

fn resolve_token(entries: &[ActorEntry<'_>], token: &str) -> Option<String> {
    if is_system_token(token) {
        return None;
    }
    let wanted = token.trim().to_lowercase();
    entries
        .iter()
        .find(|e| e.tokens().contains(&wanted))
        .map(ActorEntry::type_name)
}
